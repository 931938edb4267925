//! Normalization of raw provider fields into display-ready values

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use super::alpha_vantage::DailyBar;
use super::{FetchError, Quote, TimeSeriesPoint};

const SYMBOL_FIELD: &str = "01. symbol";
const PRICE_FIELD: &str = "05. price";
const VOLUME_FIELD: &str = "06. volume";
const CHANGE_FIELD: &str = "09. change";
const CHANGE_PERCENT_FIELD: &str = "10. change percent";

fn malformed(field: &str, raw: &str) -> FetchError {
    FetchError::MalformedResponse(format!("{field}: {raw:?}"))
}

/// Formats a decimal string with exactly two fractional digits
pub fn format_decimal_2(field: &str, raw: &str) -> Result<String, FetchError> {
    let value: f64 = raw.trim().parse().map_err(|_| malformed(field, raw))?;
    if !value.is_finite() {
        return Err(malformed(field, raw));
    }
    Ok(format!("{:.2}", value))
}

/// Removes a single trailing percent sign
pub fn strip_percent(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix('%').unwrap_or(trimmed).to_string()
}

/// Formats an integer string with ',' thousands separators
pub fn group_thousands(field: &str, raw: &str) -> Result<String, FetchError> {
    let value: i64 = raw.trim().parse().map_err(|_| malformed(field, raw))?;

    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    Ok(grouped)
}

fn required<'a>(raw: &'a HashMap<String, String>, field: &str) -> Result<&'a str, FetchError> {
    raw.get(field)
        .map(String::as_str)
        .ok_or_else(|| FetchError::MalformedResponse(format!("missing field '{field}'")))
}

/// Builds a [`Quote`] from the provider's `Global Quote` object
pub fn normalize_quote(raw: &HashMap<String, String>) -> Result<Quote, FetchError> {
    let symbol = required(raw, SYMBOL_FIELD)?.trim().to_string();
    if symbol.is_empty() {
        return Err(malformed(SYMBOL_FIELD, ""));
    }

    Ok(Quote {
        symbol,
        name: None,
        price: format_decimal_2(PRICE_FIELD, required(raw, PRICE_FIELD)?)?,
        change: format_decimal_2(CHANGE_FIELD, required(raw, CHANGE_FIELD)?)?,
        change_percent: strip_percent(required(raw, CHANGE_PERCENT_FIELD)?),
        volume: group_thousands(VOLUME_FIELD, required(raw, VOLUME_FIELD)?)?,
    })
}

/// Turns the provider's date-keyed mapping into chronologically ordered points
pub fn normalize_series(
    series: &BTreeMap<String, DailyBar>,
) -> Result<Vec<TimeSeriesPoint>, FetchError> {
    let mut points = series
        .iter()
        .map(|(date, bar)| {
            let date_value = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .map_err(|_| malformed("date", date))?;
            let close_raw = bar
                .close
                .as_deref()
                .ok_or_else(|| FetchError::MalformedResponse(format!("missing close for {date}")))?;
            let close: f64 = close_raw
                .trim()
                .parse()
                .map_err(|_| malformed("4. close", close_raw))?;
            Ok(TimeSeriesPoint {
                date: date_value,
                close,
            })
        })
        .collect::<Result<Vec<_>, FetchError>>()?;

    points.sort_by_key(|point| point.date);
    Ok(points)
}
