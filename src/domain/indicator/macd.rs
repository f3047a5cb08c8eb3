//! MACD, the dual-EMA momentum oscillator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Every EMA is seeded from the first observation, so there is no warmup.

use crate::domain::error::ChartError;
use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{
    checked_period, ComputeMode, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
    OscillatorParams,
};
use crate::domain::ohlcv::TimeSeriesTable;

pub const DEFAULT_FAST: i64 = 12;
pub const DEFAULT_SLOW: i64 = 26;
pub const DEFAULT_SIGNAL: i64 = 9;

pub fn compute_macd(
    table: &TimeSeriesTable,
    params: OscillatorParams,
    mode: ComputeMode,
) -> Result<IndicatorSeries, ChartError> {
    calculate_macd(table, params.fast, params.slow, params.signal, mode)
}

pub fn calculate_macd(
    table: &TimeSeriesTable,
    fast: i64,
    slow: i64,
    signal_span: i64,
    mode: ComputeMode,
) -> Result<IndicatorSeries, ChartError> {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_span,
    };

    let len = table.len();
    let fast = checked_period(&indicator_type, "fast span", fast, len, mode)?;
    let slow = checked_period(&indicator_type, "slow span", slow, len, mode)?;
    let signal_span = checked_period(&indicator_type, "signal span", signal_span, len, mode)?;
    let (Some(fast), Some(slow), Some(signal_span)) = (fast, slow, signal_span) else {
        return Ok(IndicatorSeries::undefined(indicator_type, table));
    };

    let closes = table.closes();
    let ema_fast = ema_values(&closes, fast);
    let ema_slow = ema_values(&closes, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_values(&macd_line, signal_span);

    let values = table
        .records()
        .iter()
        .zip(macd_line.iter().zip(&signal_line))
        .map(|(r, (&line, &signal))| IndicatorPoint {
            timestamp: r.timestamp,
            value: Some(IndicatorValue::Macd {
                line,
                signal,
                histogram: line - signal,
            }),
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}
