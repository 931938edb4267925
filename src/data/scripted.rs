//! Scripted transport used by unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::time::Instant;

use super::{FetchError, Function, QuoteTransport};

type Reply = Result<Value, FetchError>;

/// Replays queued responses per (function, symbol) and records every call
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<HashMap<(Function, String), VecDeque<Reply>>>,
    calls: Mutex<Vec<(Function, String, Instant)>>,
    latency: Duration,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn push(&self, function: Function, symbol: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry((function, symbol.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub(crate) fn push_ok(&self, function: Function, symbol: &str, body: Value) {
        self.push(function, symbol, Ok(body));
    }

    pub(crate) fn push_err(&self, function: Function, symbol: &str, err: FetchError) {
        self.push(function, symbol, Err(err));
    }

    pub(crate) fn calls(&self) -> Vec<(Function, String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl QuoteTransport for ScriptedTransport {
    async fn fetch_json(&self, function: Function, symbol: &str) -> Result<Value, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((function, symbol.to_string(), Instant::now()));

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&(function, symbol.to_string()))
            .and_then(VecDeque::pop_front);
        reply.unwrap_or_else(|| {
            Err(FetchError::Transport(format!(
                "no scripted reply for {} {}",
                function.as_str(),
                symbol
            )))
        })
    }
}

/// A GLOBAL_QUOTE body with fixed change fields
pub(crate) fn quote_body(symbol: &str, price: &str) -> Value {
    json!({
        "Global Quote": {
            "01. symbol": symbol,
            "05. price": price,
            "06. volume": "1234567",
            "09. change": "-1.5",
            "10. change percent": "1.23%"
        }
    })
}

/// A GLOBAL_QUOTE body for an unknown symbol
pub(crate) fn empty_quote_body() -> Value {
    json!({ "Global Quote": {} })
}

/// A TIME_SERIES_DAILY body with the given (date, close) pairs
pub(crate) fn series_body(days: &[(&str, &str)]) -> Value {
    let mut series = Map::new();
    for (date, close) in days {
        series.insert(date.to_string(), json!({ "4. close": close }));
    }
    json!({
        "Meta Data": { "1. Information": "Daily Prices" },
        "Time Series (Daily)": Value::Object(series)
    })
}
