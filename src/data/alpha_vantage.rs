//! Alpha Vantage HTTP transport and raw payload shapes
//!
//! The provider answers every call with HTTP 200, so throttling and unknown
//! symbols are signalled inside the JSON body. This module only moves bytes
//! and describes the raw shapes; interpreting them lives in `market`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;

use super::FetchError;
use crate::config::Config;
use crate::rate_limit::{RateLimitConfig, RateLimiter};

/// Base URL for the Alpha Vantage query API
pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Provider endpoints used by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// Latest quote for a symbol
    GlobalQuote,
    /// Compact (last 100 days) daily series for a symbol
    TimeSeriesDaily,
}

impl Function {
    /// Value of the `function` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Function::GlobalQuote => "GLOBAL_QUOTE",
            Function::TimeSeriesDaily => "TIME_SERIES_DAILY",
        }
    }

    fn extra_params(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Function::GlobalQuote => &[],
            Function::TimeSeriesDaily => &[("outputsize", "compact")],
        }
    }
}

/// Source of raw provider JSON
#[async_trait]
pub trait QuoteTransport: Send + Sync {
    /// Performs one provider call and returns the decoded JSON body
    async fn fetch_json(&self, function: Function, symbol: &str) -> Result<Value, FetchError>;
}

/// Transport that talks to the provider over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    api_key: String,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpTransport {
    /// Create a transport with a default HTTP client and no rate limiter
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            limiter: None,
        }
    }

    /// Create a transport from resolved configuration
    ///
    /// Applies the optional request timeout and attaches a token-bucket limiter
    /// when `requests_per_minute` is set.
    ///
    /// # Errors
    /// Returns `FetchError::Transport` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let transport = Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            limiter: None,
        };
        Ok(match config.requests_per_minute {
            Some(rpm) => transport.with_rate_limiter(Arc::new(RateLimiter::new(
                RateLimitConfig::per_minute(rpm),
            ))),
            None => transport,
        })
    }

    /// Share a rate limiter across every call made through this transport
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Builds the request URL for a provider call
    pub fn request_url(&self, function: Function, symbol: &str) -> Result<Url, FetchError> {
        let mut params: Vec<(&str, &str)> = vec![("function", function.as_str()), ("symbol", symbol)];
        params.extend_from_slice(function.extra_params());
        params.push(("apikey", &self.api_key));

        Url::parse_with_params(&self.base_url, &params)
            .map_err(|e| FetchError::Transport(format!("Failed to build URL: {}", e)))
    }

    /// URL with the `apikey` parameter masked, for logging
    fn redacted(url: &Url) -> String {
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let mut masked = url.clone();
        masked.query_pairs_mut().clear().extend_pairs(pairs.iter().map(|(name, value)| {
            if name == "apikey" {
                (name.as_str(), "***")
            } else {
                (name.as_str(), value.as_str())
            }
        }));
        masked.into()
    }
}

#[async_trait]
impl QuoteTransport for HttpTransport {
    async fn fetch_json(&self, function: Function, symbol: &str) -> Result<Value, FetchError> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        let url = self.request_url(function, symbol)?;
        debug!("Alpha Vantage request: {}", Self::redacted(&url));

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// GLOBAL_QUOTE response body
///
/// The quote object is kept as a string map because the provider keys its
/// fields with numbered labels and may send an empty object for bad symbols.
#[derive(Debug, Default, Deserialize)]
pub struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    pub global_quote: Option<HashMap<String, String>>,
    #[serde(rename = "Information")]
    pub information: Option<String>,
    #[serde(rename = "Note")]
    pub note: Option<String>,
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,
}

impl GlobalQuoteResponse {
    /// The provider's throttling message, if any
    pub fn throttle_marker(&self) -> Option<&str> {
        self.information.as_deref().or(self.note.as_deref())
    }
}

/// TIME_SERIES_DAILY response body
#[derive(Debug, Default, Deserialize)]
pub struct DailySeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    pub time_series: Option<BTreeMap<String, DailyBar>>,
    #[serde(rename = "Information")]
    pub information: Option<String>,
    #[serde(rename = "Note")]
    pub note: Option<String>,
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,
}

impl DailySeriesResponse {
    /// The provider's throttling message, if any
    pub fn throttle_marker(&self) -> Option<&str> {
        self.information.as_deref().or(self.note.as_deref())
    }
}

/// One day of a daily series; only the close is used
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyBar {
    #[serde(rename = "4. close")]
    pub close: Option<String>,
}
