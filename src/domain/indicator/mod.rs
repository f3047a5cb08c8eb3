//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values, aligned with the table
//!
//! Points with insufficient history carry `value: None`; they are never zero.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod stddev;

pub use bollinger::calculate_bands;
pub use macd::calculate_macd;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

use crate::domain::error::ChartError;
use crate::domain::ohlcv::TimeSeriesTable;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<IndicatorValue>,
}

impl IndicatorPoint {
    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Bands {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Bands { window: i64, mult_x100: i64 },
    Macd { fast: i64, slow: i64, signal: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// A series aligned with `table` where every point is undefined.
    pub fn undefined(indicator_type: IndicatorType, table: &TimeSeriesTable) -> Self {
        Self {
            indicator_type,
            values: table
                .records()
                .iter()
                .map(|r| IndicatorPoint {
                    timestamp: r.timestamp,
                    value: None,
                })
                .collect(),
        }
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|p| p.is_defined()).count()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Bands { window, mult_x100 } => {
                let mult = *mult_x100 as f64 / 100.0;
                write!(f, "BANDS({},{})", window, mult)
            }
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}

/// Volatility band parameters as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct BandParams {
    pub window: i64,
    pub mult: f64,
}

impl Default for BandParams {
    fn default() -> Self {
        Self {
            window: bollinger::DEFAULT_WINDOW,
            mult: bollinger::DEFAULT_MULT,
        }
    }
}

/// Dual-EMA oscillator parameters as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OscillatorParams {
    pub fast: i64,
    pub slow: i64,
    pub signal: i64,
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self {
            fast: macd::DEFAULT_FAST,
            slow: macd::DEFAULT_SLOW,
            signal: macd::DEFAULT_SIGNAL,
        }
    }
}

/// Which indicator families to compute; `None` switches a family off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorRequest {
    pub bands: Option<BandParams>,
    pub oscillator: Option<OscillatorParams>,
}

impl Default for IndicatorRequest {
    /// Bands on with default parameters, oscillator off.
    fn default() -> Self {
        Self {
            bands: Some(BandParams::default()),
            oscillator: None,
        }
    }
}

impl IndicatorRequest {
    pub fn none() -> Self {
        Self {
            bands: None,
            oscillator: None,
        }
    }
}

/// How parameter problems are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputeMode {
    /// Unusable parameters yield an all-undefined series.
    #[default]
    Lenient,
    /// Unusable parameters, or windows longer than the table, are errors.
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedIndicators {
    pub bands: Option<IndicatorSeries>,
    pub oscillator: Option<IndicatorSeries>,
}

/// Computes every requested indicator family over `table`.
pub fn compute_indicators(
    table: &TimeSeriesTable,
    request: &IndicatorRequest,
    mode: ComputeMode,
) -> Result<ComputedIndicators, ChartError> {
    let bands = request
        .bands
        .map(|params| bollinger::compute_bands(table, params, mode))
        .transpose()?;
    let oscillator = request
        .oscillator
        .map(|params| macd::compute_macd(table, params, mode))
        .transpose()?;

    Ok(ComputedIndicators { bands, oscillator })
}

/// Validates a window or span. `Ok(None)` means the caller should fall back to
/// an all-undefined series.
pub(crate) fn checked_period(
    indicator: &IndicatorType,
    name: &str,
    requested: i64,
    available: usize,
    mode: ComputeMode,
) -> Result<Option<usize>, ChartError> {
    let fail = |reason: String| match mode {
        ComputeMode::Strict => Err(ChartError::Computation {
            indicator: indicator.to_string(),
            reason,
        }),
        ComputeMode::Lenient => {
            tracing::debug!(%indicator, %reason, "indicator left undefined");
            Ok(None)
        }
    };

    if requested <= 0 {
        return fail(format!("{name} must be positive, got {requested}"));
    }
    let period = requested as usize;
    if mode == ComputeMode::Strict && period > available {
        return fail(format!(
            "{name} {period} exceeds available history of {available} records"
        ));
    }
    Ok(Some(period))
}
