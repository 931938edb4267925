//! Cached market-data client
//!
//! Serves quotes and daily series from per-symbol caches inside a freshness
//! window and otherwise fetches, normalizes and stores a fresh value. Quotes
//! degrade gracefully: a throttled or empty response yields `Ok(None)` and
//! leaves the cache alone. Series fail hard, since a chart cannot render
//! without data. Any hard failure evicts the symbol's cache entry.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use log::{debug, error, warn};

use super::alpha_vantage::{DailySeriesResponse, Function, GlobalQuoteResponse, HttpTransport};
use super::normalize::{normalize_quote, normalize_series};
use super::{normalize_symbol, FetchError, Quote, QuoteTransport, TimeSeriesPoint};
use crate::cache::{InFlight, MemoryCache};
use crate::config::Config;

type QuoteResult = Result<Option<Quote>, FetchError>;
type SeriesResult = Result<Vec<TimeSeriesPoint>, FetchError>;

struct Inner {
    transport: Arc<dyn QuoteTransport>,
    quotes: MemoryCache<Quote>,
    series: MemoryCache<Vec<TimeSeriesPoint>>,
    quote_requests: InFlight<QuoteResult>,
    series_requests: InFlight<SeriesResult>,
}

/// Client for quotes and daily series with in-memory caching
///
/// Cloning is cheap and clones share the same caches, so one client can be
/// handed to many concurrent tasks.
#[derive(Clone)]
pub struct MarketDataClient {
    inner: Arc<Inner>,
}

impl MarketDataClient {
    /// Create a client that talks to the provider over HTTP
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::with_transport(Arc::new(transport), config.cache_ttl))
    }

    /// Create a client with a custom transport and freshness window
    pub fn with_transport(transport: Arc<dyn QuoteTransport>, freshness: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                quotes: MemoryCache::with_freshness(freshness),
                series: MemoryCache::with_freshness(freshness),
                quote_requests: InFlight::new(),
                series_requests: InFlight::new(),
            }),
        }
    }

    /// The quote cache, keyed by upper-cased symbol
    pub fn quote_cache(&self) -> &MemoryCache<Quote> {
        &self.inner.quotes
    }

    /// The daily series cache, keyed by upper-cased symbol
    pub fn series_cache(&self) -> &MemoryCache<Vec<TimeSeriesPoint>> {
        &self.inner.series
    }

    /// Fetch the latest quote for `symbol`
    ///
    /// # Returns
    /// * `Ok(Some(Quote))` - Fresh cached or newly fetched quote
    /// * `Ok(None)` - Provider reported no usable data (throttled, unknown symbol)
    /// * `Err(FetchError)` - Transport failure or malformed response
    pub async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>, FetchError> {
        let symbol = normalize_symbol(symbol)?;

        if let Some(quote) = self.inner.quotes.get_fresh(&symbol) {
            debug!("Quote cache hit for {}", symbol);
            return Ok(Some(quote));
        }

        let inner = Arc::clone(&self.inner);
        let key = symbol.clone();
        self.inner
            .quote_requests
            .run(&symbol, move || {
                async move { inner.refresh_quote(&key).await }.boxed()
            })
            .await
    }

    /// Fetch the compact daily series for `symbol`, oldest first
    ///
    /// # Returns
    /// * `Ok(Vec<TimeSeriesPoint>)` - Points in ascending date order
    /// * `Err(FetchError)` - Transport failure, throttling, missing or malformed data
    pub async fn get_daily_series(&self, symbol: &str) -> Result<Vec<TimeSeriesPoint>, FetchError> {
        let symbol = normalize_symbol(symbol)?;

        if let Some(points) = self.inner.series.get_fresh(&symbol) {
            debug!("Series cache hit for {}", symbol);
            return Ok(points);
        }

        let inner = Arc::clone(&self.inner);
        let key = symbol.clone();
        self.inner
            .series_requests
            .run(&symbol, move || {
                async move { inner.refresh_series(&key).await }.boxed()
            })
            .await
    }
}

impl std::fmt::Debug for MarketDataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataClient")
            .field("cached_quotes", &self.inner.quotes.len())
            .field("cached_series", &self.inner.series.len())
            .finish()
    }
}

impl Inner {
    async fn refresh_quote(&self, symbol: &str) -> QuoteResult {
        match self.fetch_quote(symbol).await {
            Ok(Some(quote)) => {
                self.quotes.insert(symbol, quote.clone());
                Ok(Some(quote))
            }
            Ok(None) => Ok(None),
            Err(err) => {
                error!("Failed to fetch stock quote for {}: {}", symbol, err);
                self.quotes.invalidate(symbol);
                Err(err)
            }
        }
    }

    async fn fetch_quote(&self, symbol: &str) -> QuoteResult {
        let body = self.transport.fetch_json(Function::GlobalQuote, symbol).await?;
        let response: GlobalQuoteResponse = serde_json::from_value(body)?;

        if let Some(note) = response.throttle_marker() {
            warn!("Alpha Vantage API note for {} (quote): {}", symbol, note);
            return Ok(None);
        }
        if let Some(message) = &response.error_message {
            warn!("Alpha Vantage error for {} (quote): {}", symbol, message);
            return Ok(None);
        }

        match response.global_quote {
            Some(raw) if !raw.is_empty() => normalize_quote(&raw).map(Some),
            _ => {
                warn!("No quote data for symbol {}", symbol);
                Ok(None)
            }
        }
    }

    async fn refresh_series(&self, symbol: &str) -> SeriesResult {
        match self.fetch_series(symbol).await {
            Ok(points) => {
                self.series.insert(symbol, points.clone());
                Ok(points)
            }
            Err(err) => {
                error!("Failed to fetch time series for {}: {}", symbol, err);
                self.series.invalidate(symbol);
                Err(err)
            }
        }
    }

    async fn fetch_series(&self, symbol: &str) -> SeriesResult {
        let body = self
            .transport
            .fetch_json(Function::TimeSeriesDaily, symbol)
            .await?;
        let response: DailySeriesResponse = serde_json::from_value(body)?;

        if let Some(note) = response.throttle_marker() {
            warn!("Alpha Vantage API note for {} (time series): {}", symbol, note);
            return Err(FetchError::RateLimited {
                note: note.to_string(),
            });
        }
        if let Some(message) = &response.error_message {
            warn!("Alpha Vantage error for {} (time series): {}", symbol, message);
            return Err(FetchError::NoData(symbol.to_string()));
        }

        let series = response.time_series.ok_or_else(|| {
            warn!("No time series data for symbol {}", symbol);
            FetchError::NoData(symbol.to_string())
        })?;
        normalize_series(&series)
    }
}
