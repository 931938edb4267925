//! Command-line interface parsing for stockdash
//!
//! This module handles parsing of CLI arguments using clap: global provider
//! overrides, output format, and the `quote`, `watchlist` and `series`
//! subcommands.

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::config::ConfigOverrides;

/// Longest ticker accepted on the command line
const MAX_SYMBOL_LEN: usize = 10;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The symbol is empty, too long, or contains unexpected characters
    #[error("Invalid symbol: '{0}'. Symbols are 1-10 letters, digits, '.' or '-'")]
    InvalidSymbol(String),
}

/// stockdash - Cached stock quotes and daily price history
#[derive(Parser, Debug)]
#[command(name = "stockdash")]
#[command(about = "Stock quotes and daily price history from Alpha Vantage")]
#[command(version)]
pub struct Cli {
    /// Provider API key (overrides ALPHA_VANTAGE_API_KEY)
    #[arg(long, global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Provider base URL (overrides ALPHA_VANTAGE_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Delay between successive requests in a batch, in milliseconds
    #[arg(long, global = true, value_name = "MILLIS")]
    pub stagger_ms: Option<u64>,

    /// Print JSON instead of a table
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch quotes for the given symbols
    ///
    /// Examples:
    ///   stockdash quote AAPL          # One quote
    ///   stockdash quote AAPL MSFT     # Staggered batch
    Quote {
        #[arg(required = true, value_name = "SYMBOL", value_parser = parse_symbol_arg)]
        symbols: Vec<String>,
    },
    /// Fetch quotes for the default watchlist
    Watchlist,
    /// Show the compact daily close history for a symbol
    Series {
        #[arg(value_name = "SYMBOL", value_parser = parse_symbol_arg)]
        symbol: String,
        /// Number of most recent days drawn in the sparkline
        #[arg(long, default_value_t = 60)]
        width: usize,
    },
}

/// Parses and normalizes a ticker argument.
///
/// # Returns
/// * `Ok(String)` with the upper-cased symbol
/// * `Err(CliError::InvalidSymbol)` if the symbol is malformed
pub fn parse_symbol_arg(s: &str) -> Result<String, CliError> {
    let symbol = s.trim();
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !valid {
        return Err(CliError::InvalidSymbol(s.to_string()));
    }
    Ok(symbol.to_ascii_uppercase())
}

impl Cli {
    /// Configuration overrides taken from global flags
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            stagger_ms: self.stagger_ms,
        }
    }
}
