//! Text sparkline for daily closes

use crate::data::TimeSeriesPoint;

/// Block characters for different price levels (8 levels)
const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn close_to_block(close: f64, low: f64, span: f64) -> char {
    if span <= 0.0 {
        return BLOCKS[3];
    }
    let normalized = ((close - low) / span).clamp(0.0, 1.0);
    let index = ((normalized * 7.0).round() as usize).min(7);
    BLOCKS[index]
}

/// Renders the most recent `width` closes, scaled between their low and high
pub fn render_sparkline(points: &[TimeSeriesPoint], width: usize) -> String {
    if width == 0 || points.is_empty() {
        return String::new();
    }

    let window = &points[points.len().saturating_sub(width)..];
    let low = window.iter().map(|p| p.close).fold(f64::INFINITY, f64::min);
    let high = window.iter().map(|p| p.close).fold(f64::NEG_INFINITY, f64::max);

    window
        .iter()
        .map(|p| close_to_block(p.close, low, high - low))
        .collect()
}
