//! Cache module for keeping provider responses in memory
//!
//! This module provides a per-key cache with a fixed freshness window and a
//! registry of in-flight requests, so concurrent callers asking for the same
//! stale key share one outbound call. Nothing here survives a process restart.

mod inflight;
mod manager;

pub use inflight::InFlight;
pub use manager::{CachedData, MemoryCache, DEFAULT_FRESHNESS};
