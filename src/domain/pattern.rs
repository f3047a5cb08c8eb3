//! Candle shape detection producing chart annotations.

use chrono::{DateTime, Utc};

use crate::domain::layer::Color;
use crate::domain::ohlcv::{OhlcvRecord, TimeSeriesTable};

pub const DEFAULT_DOJI_FRACTION: f64 = 0.1;

/// Markers sit this fraction of the candle's range above its high.
pub const DEFAULT_MARKER_OFFSET: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Star,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerStyle {
    pub color: Color,
    pub size: f64,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            color: Color::YELLOW,
            size: 9.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationPoint {
    pub timestamp: DateTime<Utc>,
    /// Position of the annotated record in the table.
    pub index: usize,
    pub price: f64,
    pub glyph: Glyph,
    pub style: MarkerStyle,
}

/// Doji: body narrower than `body_fraction` of a non-zero high-low range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DojiRule {
    pub body_fraction: f64,
    pub marker_offset: f64,
}

impl Default for DojiRule {
    fn default() -> Self {
        Self {
            body_fraction: DEFAULT_DOJI_FRACTION,
            marker_offset: DEFAULT_MARKER_OFFSET,
        }
    }
}

impl DojiRule {
    pub fn with_fraction(body_fraction: f64) -> Self {
        Self {
            body_fraction,
            ..Self::default()
        }
    }

    pub fn matches(&self, record: &OhlcvRecord) -> bool {
        let range = record.range();
        range > 0.0 && record.body() < self.body_fraction * range
    }
}

/// Scans every record in time order and annotates each doji.
pub fn detect_doji(table: &TimeSeriesTable, rule: &DojiRule) -> Vec<AnnotationPoint> {
    table
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| rule.matches(r))
        .map(|(index, r)| AnnotationPoint {
            timestamp: r.timestamp,
            index,
            price: r.high + rule.marker_offset * r.range(),
            glyph: Glyph::Star,
            style: MarkerStyle::default(),
        })
        .collect()
}

/// Runs the detector only when the batch asked for pattern highlighting.
pub fn detect_patterns(table: &TimeSeriesTable, rule: &DojiRule) -> Vec<AnnotationPoint> {
    if !table.metadata().highlight_patterns {
        return Vec::new();
    }
    let annotations = detect_doji(table, rule);
    tracing::debug!(count = annotations.len(), "doji annotations");
    annotations
}
