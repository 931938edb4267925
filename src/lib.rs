//! stockdash library
//!
//! Cached, normalized access to Alpha Vantage quotes and daily series, plus
//! the staggered batch fetch used by the dashboard's quote table.

pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod rate_limit;
pub mod render;

pub use batch::{default_watchlist, fetch_batch, fetch_batch_report, WatchItem};
pub use config::Config;
pub use data::{FetchError, MarketDataClient, Quote, TimeSeriesPoint};
