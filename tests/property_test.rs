//! Property tests for the indicator and normalization invariants.

use candlechart::domain::indicator::{
    calculate_bands, calculate_macd, ComputeMode, IndicatorValue,
};
use candlechart::domain::normalizer::normalize;
use candlechart::domain::ohlcv::{BatchMetadata, OhlcvRecord, TimeSeriesTable};
use candlechart::domain::pattern::{detect_patterns, DojiRule};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{json, Value};

fn table_from(bars: &[(f64, f64, f64)], highlight: bool) -> TimeSeriesTable {
    let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
    let records = bars
        .iter()
        .enumerate()
        .map(|(i, &(open, close, spread))| OhlcvRecord {
            timestamp: start + Duration::hours(i as i64),
            open,
            high: open.max(close) + spread,
            low: open.min(close) - spread,
            close,
            volume: 1.0,
        })
        .collect();
    let metadata = BatchMetadata {
        highlight_patterns: highlight,
        ..BatchMetadata::default()
    };
    TimeSeriesTable::new(records, metadata).unwrap()
}

fn bars(max_len: usize) -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((1.0f64..1000.0, 1.0f64..1000.0, 0.0f64..50.0), 1..max_len)
}

proptest! {
    #[test]
    fn bands_are_ordered_wherever_defined(
        data in bars(80),
        window in 1i64..30,
        mult in 0.0f64..4.0,
    ) {
        let table = table_from(&data, false);
        let series = calculate_bands(&table, window, mult, ComputeMode::Lenient).unwrap();
        prop_assert_eq!(series.values.len(), table.len());
        for point in &series.values {
            if let Some(IndicatorValue::Bands { upper, middle, lower }) = point.value {
                let tol = 1e-9 * middle.abs().max(1.0);
                prop_assert!(lower <= middle + tol);
                prop_assert!(middle <= upper + tol);
            }
        }
    }

    #[test]
    fn bands_undefined_before_window_fills(
        data in bars(40),
        window in 1i64..60,
    ) {
        let table = table_from(&data, false);
        let series = calculate_bands(&table, window, 2.0, ComputeMode::Lenient).unwrap();
        let window = window as usize;
        let expected = if window > table.len() { 0 } else { table.len() - window + 1 };
        prop_assert_eq!(series.defined_count(), expected);
    }

    #[test]
    fn histogram_is_line_minus_signal(
        data in bars(80),
        fast in 1i64..15,
        slow in 1i64..30,
        signal in 1i64..12,
    ) {
        let table = table_from(&data, false);
        prop_assume!((fast.max(slow).max(signal) as usize) <= table.len());
        let series = calculate_macd(&table, fast, slow, signal, ComputeMode::Strict).unwrap();
        prop_assert_eq!(series.defined_count(), table.len());
        for point in &series.values {
            if let Some(IndicatorValue::Macd { line, signal, histogram }) = point.value {
                prop_assert!((histogram - (line - signal)).abs() <= 1e-9 * line.abs().max(1.0));
            }
        }
    }

    #[test]
    fn doji_markers_match_rule(data in bars(60), fraction in 0.01f64..0.5) {
        let rule = DojiRule::with_fraction(fraction);
        let table = table_from(&data, true);
        let expected = table.records().iter().filter(|r| rule.matches(r)).count();
        prop_assert_eq!(detect_patterns(&table, &rule).len(), expected);

        let quiet = table_from(&data, false);
        prop_assert!(detect_patterns(&quiet, &rule).is_empty());
    }

    #[test]
    fn normalization_ignores_input_order(data in bars(30)) {
        let rows: Vec<Value> = data
            .iter()
            .enumerate()
            .map(|(i, &(open, close, spread))| json!({
                "timestamp": 1_700_000_000i64 + 60 * i as i64,
                "open": open,
                "high": open.max(close) + spread,
                "low": open.min(close) - spread,
                "close": close,
                "volume": 1.0,
            }))
            .collect();
        let forward = normalize(&Value::Array(rows.clone())).unwrap();
        let reversed = normalize(&Value::Array(rows.into_iter().rev().collect())).unwrap();
        prop_assert_eq!(forward.records(), reversed.records());
        prop_assert!(forward
            .records()
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp));
    }
}
