//! OHLCV records and the time-ordered table the pipeline renders from.

use chrono::{DateTime, Utc};

use crate::domain::error::ChartError;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvRecord {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvRecord {
    /// |open - close|
    pub fn body(&self) -> f64 {
        (self.open - self.close).abs()
    }

    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Fields carried alongside the records that describe the whole batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchMetadata {
    pub symbol: Option<String>,
    pub support: Vec<f64>,
    pub highlight_patterns: bool,
}

/// Non-empty sequence of records with a strictly increasing time index.
#[derive(Debug, Clone)]
pub struct TimeSeriesTable {
    records: Vec<OhlcvRecord>,
    metadata: BatchMetadata,
}

impl TimeSeriesTable {
    /// Sorts `records` by time and checks the table invariants.
    pub fn new(
        mut records: Vec<OhlcvRecord>,
        metadata: BatchMetadata,
    ) -> Result<Self, ChartError> {
        if records.is_empty() {
            return Err(ChartError::payload_shape("empty or non-array payload"));
        }

        records.sort_by_key(|r| r.timestamp);

        if let Some(pair) = records
            .windows(2)
            .find(|pair| pair[0].timestamp == pair[1].timestamp)
        {
            return Err(ChartError::TimeOrdering {
                timestamp: pair[1].timestamp.to_rfc3339(),
            });
        }

        Ok(Self { records, metadata })
    }

    pub fn records(&self) -> &[OhlcvRecord] {
        &self.records
    }

    pub fn metadata(&self) -> &BatchMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.close).collect()
    }

    pub fn first_timestamp(&self) -> DateTime<Utc> {
        self.records[0].timestamp
    }

    pub fn last_timestamp(&self) -> DateTime<Utc> {
        self.records[self.records.len() - 1].timestamp
    }

    /// (lowest, highest) price across every OHLC field of every record.
    ///
    /// Records whose open or close lie outside their high/low, or whose high
    /// is below their low, are kept as given, so all four fields are scanned.
    pub fn price_range(&self) -> (f64, f64) {
        self.records
            .iter()
            .flat_map(|r| [r.open, r.high, r.low, r.close])
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }
}
