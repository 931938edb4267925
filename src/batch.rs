//! Staggered batch quote fetching
//!
//! Starts one task per symbol immediately, each delayed by `index × stagger`
//! before it calls the provider, then waits for all of them to settle. The
//! fixed stagger keeps a shared demo key under the provider's rate limit.

use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinError;

use crate::data::{FetchError, MarketDataClient, Quote};

/// Default delay between successive fetch starts (1.2 seconds)
pub const DEFAULT_STAGGER: Duration = Duration::from_millis(1200);

/// A symbol to track, with an optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchItem {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl WatchItem {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: Some(name.into()),
        }
    }

    /// A watch item without a display name
    pub fn from_symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
        }
    }
}

/// The dashboard's default set of tracked stocks
pub fn default_watchlist() -> Vec<WatchItem> {
    vec![
        WatchItem::new("AAPL", "Apple Inc."),
        WatchItem::new("MSFT", "Microsoft Corp."),
        WatchItem::new("GOOGL", "Alphabet Inc."),
        WatchItem::new("AMZN", "Amazon.com, Inc."),
        WatchItem::new("TSLA", "Tesla, Inc."),
        WatchItem::new("NVDA", "NVIDIA Corp."),
    ]
}

/// Errors that abort a whole batch
#[derive(Debug, Error)]
pub enum BatchError {
    /// A fetch task panicked or was cancelled
    #[error("Fetch task for {symbol} did not complete: {source}")]
    Task {
        symbol: String,
        #[source]
        source: JoinError,
    },
}

/// What happened to one symbol of a batch
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    /// Quote fetched (or served from cache)
    Fetched(Quote),
    /// Provider had no usable data
    NoData,
    /// Hard failure, isolated to this symbol
    Failed(FetchError),
}

/// Outcome for one watch item
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub item: WatchItem,
    pub outcome: SymbolOutcome,
}

/// Per-symbol outcomes of a batch, in watchlist order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    /// Quotes that were fetched, in watchlist order
    pub fn quotes(&self) -> Vec<Quote> {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.outcome {
                SymbolOutcome::Fetched(quote) => Some(quote.clone()),
                _ => None,
            })
            .collect()
    }

    /// Entries that produced no quote
    pub fn skipped(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries
            .iter()
            .filter(|entry| !matches!(entry.outcome, SymbolOutcome::Fetched(_)))
    }
}

/// Fetch quotes for `items` with staggered starts, keeping per-symbol outcomes
///
/// # Arguments
/// * `client` - Shared client; its caches and in-flight registry apply
/// * `items` - Symbols to fetch; the i-th starts `i × stagger` after the call
/// * `stagger` - Delay between successive starts
///
/// # Returns
/// * `Ok(BatchReport)` - One entry per item, soft and hard failures included
/// * `Err(BatchError)` - A task panicked or was cancelled
pub async fn fetch_batch_report(
    client: &MarketDataClient,
    items: &[WatchItem],
    stagger: Duration,
) -> Result<BatchReport, BatchError> {
    let handles: Vec<_> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let client = client.clone();
            let symbol = item.symbol.clone();
            let delay = stagger.saturating_mul(index as u32);
            tokio::spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                client.get_quote(&symbol).await
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;

    let mut entries = Vec::with_capacity(items.len());
    for (item, joined) in items.iter().zip(results) {
        let result = joined.map_err(|source| BatchError::Task {
            symbol: item.symbol.clone(),
            source,
        })?;

        let outcome = match result {
            Ok(Some(quote)) => match &item.name {
                Some(name) => SymbolOutcome::Fetched(quote.with_name(name.clone())),
                None => SymbolOutcome::Fetched(quote),
            },
            Ok(None) => {
                warn!("Skipping {}: no quote data", item.symbol);
                SymbolOutcome::NoData
            }
            Err(err) => {
                warn!("Skipping {}: {}", item.symbol, err);
                SymbolOutcome::Failed(err)
            }
        };

        entries.push(BatchEntry {
            item: item.clone(),
            outcome,
        });
    }

    Ok(BatchReport { entries })
}

/// Fetch quotes for `items` with staggered starts, dropping symbols without data
pub async fn fetch_batch(
    client: &MarketDataClient,
    items: &[WatchItem],
    stagger: Duration,
) -> Result<Vec<Quote>, BatchError> {
    Ok(fetch_batch_report(client, items, stagger).await?.quotes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::scripted::{quote_body, ScriptedTransport};
    use crate::data::Function;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn client_with(transport: &Arc<ScriptedTransport>) -> MarketDataClient {
        MarketDataClient::with_transport(transport.clone(), Duration::from_secs(900))
    }

    #[test]
    fn test_default_watchlist() {
        let watchlist = default_watchlist();
        let symbols: Vec<&str> = watchlist.iter().map(|w| w.symbol.as_str()).collect();

        assert_eq!(symbols, vec!["AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA"]);
        assert_eq!(watchlist[0].name.as_deref(), Some("Apple Inc."));
    }

    #[test]
    fn test_default_stagger() {
        assert_eq!(DEFAULT_STAGGER, Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_are_staggered() {
        let transport = Arc::new(ScriptedTransport::new());
        let watchlist = default_watchlist();
        for item in &watchlist {
            transport.push_ok(Function::GlobalQuote, &item.symbol, quote_body(&item.symbol, "10"));
        }
        let client = client_with(&transport);

        let start = Instant::now();
        let quotes = fetch_batch(&client, &watchlist, DEFAULT_STAGGER).await.unwrap();

        assert_eq!(quotes.len(), 6);
        let calls = transport.calls();
        for (index, item) in watchlist.iter().enumerate() {
            let (_, _, at) = calls
                .iter()
                .find(|(_, symbol, _)| symbol == &item.symbol)
                .expect("Every symbol should be fetched");
            assert!(
                *at - start >= DEFAULT_STAGGER * index as u32,
                "{} started too early",
                item.symbol
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tasks_run_concurrently_not_sequentially() {
        let transport = Arc::new(ScriptedTransport::new().with_latency(Duration::from_secs(5)));
        let items: Vec<WatchItem> = ["A", "B", "C"].iter().map(|s| WatchItem::from_symbol(*s)).collect();
        for item in &items {
            transport.push_ok(Function::GlobalQuote, &item.symbol, quote_body(&item.symbol, "1"));
        }
        let client = client_with(&transport);

        let start = Instant::now();
        fetch_batch(&client, &items, Duration::from_secs(1)).await.unwrap();

        // Last start at 2s plus 5s latency; sequential would need 3 × 5s.
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_soft_and_hard_failures_are_skipped() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(Function::GlobalQuote, "AAPL", quote_body("AAPL", "150.1"));
        transport.push_ok(
            Function::GlobalQuote,
            "MSFT",
            json!({ "Information": "rate limited" }),
        );
        transport.push_err(Function::GlobalQuote, "GOOGL", FetchError::Http(500));
        transport.push_ok(Function::GlobalQuote, "AMZN", quote_body("AMZN", "180"));
        let client = client_with(&transport);
        let items = &default_watchlist()[..4];

        let report = fetch_batch_report(&client, items, DEFAULT_STAGGER).await.unwrap();

        let quotes = report.quotes();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].symbol, "AAPL");
        assert_eq!(quotes[0].name.as_deref(), Some("Apple Inc."));
        assert_eq!(quotes[1].symbol, "AMZN");

        let skipped: Vec<&str> = report.skipped().map(|e| e.item.symbol.as_str()).collect();
        assert_eq!(skipped, vec!["MSFT", "GOOGL"]);
        assert_eq!(report.entries[1].outcome, SymbolOutcome::NoData);
        assert_eq!(
            report.entries[2].outcome,
            SymbolOutcome::Failed(FetchError::Http(500))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unnamed_items_keep_provider_fields() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(Function::GlobalQuote, "IBM", quote_body("IBM", "160"));
        let client = client_with(&transport);

        let quotes = fetch_batch(&client, &[WatchItem::from_symbol("IBM")], DEFAULT_STAGGER)
            .await
            .unwrap();

        assert_eq!(quotes.len(), 1);
        assert!(quotes[0].name.is_none());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let transport = Arc::new(ScriptedTransport::new());
        let client = client_with(&transport);

        let report = fetch_batch_report(&client, &[], DEFAULT_STAGGER).await.unwrap();

        assert!(report.entries.is_empty());
        assert_eq!(transport.call_count(), 0);
    }

    struct PanickingTransport;

    #[async_trait::async_trait]
    impl crate::data::QuoteTransport for PanickingTransport {
        async fn fetch_json(
            &self,
            _function: Function,
            symbol: &str,
        ) -> Result<serde_json::Value, FetchError> {
            panic!("transport exploded for {symbol}");
        }
    }

    #[tokio::test]
    async fn test_task_panic_fails_the_batch() {
        let client =
            MarketDataClient::with_transport(Arc::new(PanickingTransport), Duration::from_secs(900));

        let result = fetch_batch(&client, &[WatchItem::from_symbol("AAPL")], Duration::ZERO).await;

        match result {
            Err(BatchError::Task { symbol, source }) => {
                assert_eq!(symbol, "AAPL");
                assert!(source.is_panic());
            }
            other => panic!("expected task failure, got {other:?}"),
        }
    }

    /// Panics on its first call and serves a quote afterwards
    #[derive(Default)]
    struct PanicOnceTransport {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl crate::data::QuoteTransport for PanicOnceTransport {
        async fn fetch_json(
            &self,
            _function: Function,
            symbol: &str,
        ) -> Result<serde_json::Value, FetchError> {
            if self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                panic!("transport exploded for {symbol}");
            }
            Ok(quote_body(symbol, "150"))
        }
    }

    #[tokio::test]
    async fn test_symbol_recovers_after_task_panic() {
        let transport = Arc::new(PanicOnceTransport::default());
        let client = MarketDataClient::with_transport(transport.clone(), Duration::from_secs(900));
        let items = [WatchItem::from_symbol("AAPL")];

        let first = fetch_batch(&client, &items, Duration::ZERO).await;
        assert!(matches!(first, Err(BatchError::Task { .. })));

        let quotes = fetch_batch(&client, &items, Duration::ZERO).await.unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].price, "150.00");
        assert_eq!(transport.calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
