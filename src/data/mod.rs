//! Core data models for the stock dashboard
//!
//! This module contains the normalized quote and time-series types handed to
//! callers, the error taxonomy shared by every fetch path, and the clients
//! that produce them from the market-data provider.

pub mod alpha_vantage;
pub mod market;
pub mod normalize;
#[cfg(test)]
pub(crate) mod scripted;

pub use alpha_vantage::{Function, HttpTransport, QuoteTransport, DEFAULT_BASE_URL};
pub use market::MarketDataClient;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A normalized quote snapshot for a single ticker
///
/// Every numeric field is kept as display-ready text: `price` and `change`
/// carry exactly two fractional digits, `change_percent` has its percent sign
/// stripped and `volume` uses thousands grouping. A quote is never mutated
/// after construction; a refresh produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Ticker symbol as reported by the provider
    pub symbol: String,
    /// Human-readable company name, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Last price, e.g. "150.10"
    pub price: String,
    /// Signed change since previous close, e.g. "-1.50"
    pub change: String,
    /// Change percent without the trailing '%', e.g. "1.23"
    pub change_percent: String,
    /// Traded volume with grouping separators, e.g. "1,234,567"
    pub volume: String,
}

impl Quote {
    /// Returns a copy of this quote carrying the given display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A single daily close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Trading day
    pub date: NaiveDate,
    /// Closing price for the day
    pub close: f64,
}

/// Errors that can occur when fetching market data
///
/// The type is `Clone` so one in-flight request can hand the same outcome to
/// every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Provider answered with a non-success HTTP status
    #[error("HTTP error! status: {0}")]
    Http(u16),

    /// Network-level failure (connect, timeout, body read)
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Response body was not valid JSON for the expected shape
    #[error("Failed to parse JSON response: {0}")]
    Parse(String),

    /// JSON parsed but a required field was missing or unparsable
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Provider signalled throttling
    #[error("API rate limit reached. Please wait a minute and try again.")]
    RateLimited {
        /// The provider's informational message
        note: String,
    },

    /// Provider returned no usable data for the symbol
    #[error("No data returned from API for '{0}'. This could be due to API rate limits or an invalid symbol.")]
    NoData(String),

    /// Symbol was empty after trimming
    #[error("Invalid symbol: '{0}'")]
    InvalidSymbol(String),
}

impl FetchError {
    /// Whether this error came from the provider's throttling marker
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return FetchError::Http(status.as_u16());
        }
        if err.is_timeout() {
            return FetchError::Transport(format!("request timed out: {}", err));
        }
        FetchError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// Trims and upper-cases a ticker so it can be used as a cache key
pub fn normalize_symbol(symbol: &str) -> Result<String, FetchError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidSymbol(symbol.to_string()));
    }
    Ok(trimmed.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_quote() -> Quote {
        Quote {
            symbol: "AAPL".to_string(),
            name: None,
            price: "150.10".to_string(),
            change: "-1.50".to_string(),
            change_percent: "1.23".to_string(),
            volume: "1,234,567".to_string(),
        }
    }

    #[test]
    fn test_quote_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(sample_quote()).expect("Failed to serialize Quote");

        assert_eq!(json["changePercent"], "1.23");
        assert_eq!(json["volume"], "1,234,567");
        assert!(json.get("name").is_none(), "Absent name should be skipped");
    }

    #[test]
    fn test_with_name_sets_display_name() {
        let quote = sample_quote().with_name("Apple Inc.");
        assert_eq!(quote.name.as_deref(), Some("Apple Inc."));
    }

    #[test]
    fn test_time_series_point_serializes_iso_date() {
        let point = TimeSeriesPoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            close: 185.64,
        };

        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, r#"{"date":"2024-01-02","close":185.64}"#);
    }

    #[test]
    fn test_normalize_symbol_trims_and_uppercases() {
        assert_eq!(normalize_symbol(" msft ").unwrap(), "MSFT");
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
    }

    #[test]
    fn test_normalize_symbol_rejects_blank() {
        assert_eq!(
            normalize_symbol("   "),
            Err(FetchError::InvalidSymbol("   ".to_string()))
        );
    }

    #[test]
    fn test_rate_limited_message() {
        let err = FetchError::RateLimited {
            note: "Thank you for using Alpha Vantage!".to_string(),
        };
        assert!(err.is_rate_limited());
        assert!(err.to_string().contains("rate limit"));
        assert!(!FetchError::Http(500).is_rate_limited());
    }

    #[test]
    fn test_json_error_maps_to_parse() {
        let err: FetchError = serde_json::from_str::<serde_json::Value>("not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, FetchError::Parse(_)));
    }
}
