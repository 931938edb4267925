//! Plain-text rendering for the command-line output

pub mod sparkline;

pub use sparkline::render_sparkline;

use crate::batch::BatchReport;
use crate::data::{Quote, TimeSeriesPoint};

const HEADERS: [&str; 6] = ["SYMBOL", "NAME", "PRICE", "CHANGE", "CHANGE%", "VOLUME"];

fn quote_row(quote: &Quote) -> [String; 6] {
    [
        quote.symbol.clone(),
        quote.name.clone().unwrap_or_default(),
        quote.price.clone(),
        quote.change.clone(),
        format!("{}%", quote.change_percent),
        quote.volume.clone(),
    ]
}

/// Formats quotes as an aligned table
///
/// Text columns are left-aligned and numeric columns right-aligned.
pub fn format_quote_table(quotes: &[Quote]) -> String {
    let rows: Vec<[String; 6]> = quotes.iter().map(quote_row).collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: [String; 6] = HEADERS.map(str::to_string);
    let mut lines = Vec::with_capacity(rows.len() + 1);
    for row in std::iter::once(&header).chain(rows.iter()) {
        let cells: Vec<String> = row
            .iter()
            .zip(widths.iter())
            .enumerate()
            .map(|(column, (cell, width))| {
                let pad = width.saturating_sub(cell.chars().count());
                if column < 2 {
                    format!("{cell}{}", " ".repeat(pad))
                } else {
                    format!("{}{cell}", " ".repeat(pad))
                }
            })
            .collect();
        lines.push(cells.join("  ").trim_end().to_string());
    }
    lines.join("\n")
}

/// Formats a batch: the table plus one line per skipped symbol
pub fn format_batch_report(report: &BatchReport) -> String {
    let quotes = report.quotes();
    let mut out = if quotes.is_empty() {
        "No quotes available.".to_string()
    } else {
        format_quote_table(&quotes)
    };

    let skipped: Vec<String> = report
        .skipped()
        .map(|entry| match &entry.outcome {
            crate::batch::SymbolOutcome::Failed(err) => {
                format!("  {}: {}", entry.item.symbol, err)
            }
            _ => format!("  {}: no data", entry.item.symbol),
        })
        .collect();
    if !skipped.is_empty() {
        out.push_str("\n\nSkipped:\n");
        out.push_str(&skipped.join("\n"));
    }
    out
}

/// Formats a daily series as a summary line and a sparkline
pub fn format_series(symbol: &str, points: &[TimeSeriesPoint], width: usize) -> String {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return format!("{symbol}: no daily closes");
    };

    let low = points.iter().map(|p| p.close).fold(f64::INFINITY, f64::min);
    let high = points.iter().map(|p| p.close).fold(f64::NEG_INFINITY, f64::max);

    format!(
        "{symbol} daily closes, {} to {} ({} days)\n{}\nlast {:.2}  low {:.2}  high {:.2}",
        first.date,
        last.date,
        points.len(),
        render_sparkline(points, width),
        last.close,
        low,
        high
    )
}
