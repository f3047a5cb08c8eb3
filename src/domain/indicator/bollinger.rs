//! Volatility (Bollinger) bands.
//!
//! - Middle: Simple Moving Average (SMA) over n closes
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: window=20, multiplier=2.0
//! Warmup: first (window-1) points are undefined.

use crate::domain::error::ChartError;
use crate::domain::indicator::stddev::rolling_mean_stddev;
use crate::domain::indicator::{
    checked_period, BandParams, ComputeMode, IndicatorPoint, IndicatorSeries, IndicatorType,
    IndicatorValue,
};
use crate::domain::ohlcv::TimeSeriesTable;

pub const DEFAULT_WINDOW: i64 = 20;
pub const DEFAULT_MULT: f64 = 2.0;

pub fn compute_bands(
    table: &TimeSeriesTable,
    params: BandParams,
    mode: ComputeMode,
) -> Result<IndicatorSeries, ChartError> {
    calculate_bands(table, params.window, params.mult, mode)
}

pub fn calculate_bands(
    table: &TimeSeriesTable,
    window: i64,
    mult: f64,
    mode: ComputeMode,
) -> Result<IndicatorSeries, ChartError> {
    let indicator_type = IndicatorType::Bands {
        window,
        mult_x100: (mult * 100.0).round() as i64,
    };

    // A negative multiplier would put the lower band above the upper one.
    if !mult.is_finite() || mult < 0.0 {
        if mode == ComputeMode::Strict {
            return Err(ChartError::Computation {
                indicator: indicator_type.to_string(),
                reason: format!("multiplier must be a non-negative number, got {mult}"),
            });
        }
        return Ok(IndicatorSeries::undefined(indicator_type, table));
    }

    let Some(window) = checked_period(&indicator_type, "window", window, table.len(), mode)?
    else {
        return Ok(IndicatorSeries::undefined(indicator_type, table));
    };

    let stats = rolling_mean_stddev(&table.closes(), window);
    let values = table
        .records()
        .iter()
        .zip(stats)
        .map(|(r, stat)| IndicatorPoint {
            timestamp: r.timestamp,
            value: stat.map(|(middle, stddev)| IndicatorValue::Bands {
                upper: middle + mult * stddev,
                middle,
                lower: middle - mult * stddev,
            }),
        })
        .collect();

    Ok(IndicatorSeries {
        indicator_type,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::{BatchMetadata, OhlcvRecord};
    use chrono::{TimeZone, Utc};

    fn make_table(prices: &[f64]) -> TimeSeriesTable {
        let records = prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvRecord {
                timestamp: Utc.with_ymd_and_hms(2024, 1, (i + 1) as u32, 0, 0, 0).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect();
        TimeSeriesTable::new(records, BatchMetadata::default()).unwrap()
    }

    fn bands(point: &IndicatorPoint) -> (f64, f64, f64) {
        match point.value {
            Some(IndicatorValue::Bands {
                upper,
                middle,
                lower,
            }) => (upper, middle, lower),
            ref other => panic!("Expected Bands value, got {other:?}"),
        }
    }

    #[test]
    fn bands_warmup() {
        let table = make_table(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_bands(&table, 3, 2.0, ComputeMode::Lenient).unwrap();

        assert!(!series.values[0].is_defined());
        assert!(!series.values[1].is_defined());
        assert!(series.values[2].is_defined());
        assert!(series.values[3].is_defined());
        assert!(series.values[4].is_defined());
    }

    #[test]
    fn bands_constant_values() {
        let table = make_table(&[100.0; 5]);
        let series = calculate_bands(&table, 3, 2.0, ComputeMode::Lenient).unwrap();
        let (upper, middle, lower) = bands(&series.values[2]);
        assert!((middle - 100.0).abs() < f64::EPSILON);
        assert!((upper - 100.0).abs() < f64::EPSILON);
        assert!((lower - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bands_basic_calculation() {
        let table = make_table(&[10.0, 20.0, 30.0]);
        let series = calculate_bands(&table, 3, 2.0, ComputeMode::Lenient).unwrap();
        let (upper, middle, lower) = bands(&series.values[2]);

        let expected_middle: f64 = 20.0;
        let stddev = (200.0_f64 / 3.0).sqrt();
        assert!((middle - expected_middle).abs() < 1e-10);
        assert!((upper - (expected_middle + 2.0 * stddev)).abs() < 1e-10);
        assert!((lower - (expected_middle - 2.0 * stddev)).abs() < 1e-10);
    }

    #[test]
    fn bands_symmetry_and_ordering() {
        let table = make_table(&[10.0, 25.0, 17.0, 31.0, 8.0]);
        let series = calculate_bands(&table, 3, 1.5, ComputeMode::Lenient).unwrap();
        for point in series.values.iter().filter(|p| p.is_defined()) {
            let (upper, middle, lower) = bands(point);
            assert!(lower <= middle && middle <= upper);
            assert!(((upper - middle) - (middle - lower)).abs() < 1e-10);
        }
    }

    #[test]
    fn short_table_is_all_undefined_when_lenient() {
        let table = make_table(&[10.0, 20.0, 30.0]);
        let series = compute_bands(&table, BandParams::default(), ComputeMode::Lenient).unwrap();
        assert_eq!(series.values.len(), 3);
        assert_eq!(series.defined_count(), 0);
    }

    #[test]
    fn short_table_errors_when_strict() {
        let table = make_table(&[10.0, 20.0, 30.0]);
        let err = compute_bands(&table, BandParams::default(), ComputeMode::Strict).unwrap_err();
        assert!(matches!(err, ChartError::Computation { .. }));
    }

    #[test]
    fn negative_multiplier_is_rejected() {
        let table = make_table(&[10.0, 20.0, 30.0]);
        let series = calculate_bands(&table, 2, -1.0, ComputeMode::Lenient).unwrap();
        assert_eq!(series.defined_count(), 0);
        assert!(calculate_bands(&table, 2, -1.0, ComputeMode::Strict).is_err());
    }

    #[test]
    fn bands_indicator_type() {
        let table = make_table(&[10.0, 20.0, 30.0]);
        let series = calculate_bands(&table, 20, 2.0, ComputeMode::Lenient).unwrap();
        assert_eq!(
            series.indicator_type,
            IndicatorType::Bands {
                window: 20,
                mult_x100: 200
            }
        );
    }
}
