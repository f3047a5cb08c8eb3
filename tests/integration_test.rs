//! End-to-end tests: JSON payload through normalization, indicators, pattern
//! detection, composition and the PNG renderer.
//!
//! Tests cover:
//! - Decoded image size and theme colours
//! - Optional layers (watermark, doji markers, oscillator panel)
//! - Validation failures and their classification
//! - Strict versus lenient indicator handling
//! - Concurrent renders sharing one renderer

mod common;

use candlechart::domain::error::{ChartError, ErrorClass};
use common::*;
use image::{Rgb, RgbImage};
use serde_json::json;

fn decode(bytes: &[u8]) -> RgbImage {
    image::load_from_memory(bytes).unwrap().to_rgb8()
}

fn count_colour(image: &RgbImage, colour: Rgb<u8>) -> usize {
    image.pixels().filter(|p| **p == colour).count()
}

const GREEN: Rgb<u8> = Rgb([0, 200, 83]);
const RED: Rgb<u8> = Rgb([255, 68, 68]);
const YELLOW: Rgb<u8> = Rgb([255, 235, 59]);

mod rendering {
    use super::*;

    #[test]
    fn full_payload_renders_png_at_configured_size() {
        let image = render(&full_payload(60), &small_settings(), &StaticAsset(None)).unwrap();
        assert_eq!(image.content_type, "image/png");
        let decoded = decode(&image.bytes);
        assert_eq!(decoded.dimensions(), (900, 450));
    }

    #[test]
    fn default_settings_render_full_resolution() {
        let settings = candlechart::domain::settings::RenderSettings::default();
        let image = render(&payload(wave_candles(30)), &settings, &StaticAsset(None)).unwrap();
        assert_eq!(decode(&image.bytes).dimensions(), (2700, 1350));
    }

    #[test]
    fn background_is_dark_and_candles_are_green_and_red() {
        let image = render(&payload(wave_candles(40)), &small_settings(), &StaticAsset(None)).unwrap();
        let decoded = decode(&image.bytes);
        let corner = decoded.get_pixel(1, 1);
        assert!(corner.0.iter().all(|c| *c < 60), "corner was {corner:?}");
        assert!(count_colour(&decoded, GREEN) > 0);
        assert!(count_colour(&decoded, RED) > 0);
    }

    #[test]
    fn doji_markers_drawn_only_when_requested() {
        let with = render(&full_payload(40), &small_settings(), &StaticAsset(None)).unwrap();
        assert!(count_colour(&decode(&with.bytes), YELLOW) > 0);

        let mut body = full_payload(40);
        body["highlight_patterns"] = json!(false);
        let without = render(&body, &small_settings(), &StaticAsset(None)).unwrap();
        assert_eq!(count_colour(&decode(&without.bytes), YELLOW), 0);
    }

    #[test]
    fn watermark_changes_pixels_but_not_size() {
        let plain = render(&full_payload(30), &small_settings(), &StaticAsset(None)).unwrap();
        let branded =
            render(&full_payload(30), &small_settings(), &StaticAsset(Some(white_logo()))).unwrap();
        assert_ne!(plain.bytes, branded.bytes);
        assert_eq!(
            decode(&plain.bytes).dimensions(),
            decode(&branded.bytes).dimensions()
        );
    }

    #[test]
    fn two_records_with_oscillator_still_render() {
        let body = json!({
            "candles": [
                {"time": "2024-01-01 09:00", "open": 100, "high": 110, "low": 90, "close": 105, "volume": 1000},
                {"time": "2024-01-01 09:05", "open": 105, "high": 108, "low": 101, "close": 103, "volume": 800}
            ],
            "indicators": {"oscillator": {"fast": 12, "slow": 26, "signal": 9}}
        });
        assert!(render(&body, &small_settings(), &StaticAsset(None)).is_ok());
    }

    #[test]
    fn open_far_outside_high_low_renders_promptly() {
        for open in [1e9, 1e11] {
            let mut candles = wave_candles(5);
            candles.push(candle(25, open, 110.0, 90.0, 100.0, 500.0));
            let started = std::time::Instant::now();
            let image = render(&payload(candles), &small_settings(), &StaticAsset(None)).unwrap();
            assert_eq!(decode(&image.bytes).dimensions(), (900, 450));
            assert!(
                started.elapsed() < std::time::Duration::from_secs(10),
                "open={open} took {:?}",
                started.elapsed()
            );
        }
    }

    #[test]
    fn inverted_high_low_renders() {
        let candles: Vec<_> = (0..6)
            .map(|i| {
                let base = 100.0 + i as f64;
                candle(5 * i, base, base - 4.0, base + 4.0, base + 1.0, 500.0)
            })
            .collect();
        let image = render(&payload(candles), &small_settings(), &StaticAsset(None)).unwrap();
        assert_eq!(decode(&image.bytes).dimensions(), (900, 450));
    }

    #[test]
    fn concurrent_renders_are_independent() {
        let settings = small_settings();
        let asset = StaticAsset(Some(white_logo()));
        let body = full_payload(50);
        let expected = render(&body, &settings, &asset).unwrap();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| render(&body, &settings, &asset).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}

mod payload_validation {
    use super::*;

    fn client_error(body: serde_json::Value) -> ChartError {
        let err = render(&body, &small_settings(), &StaticAsset(None)).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Client);
        err
    }

    #[test]
    fn bare_array_and_ohlc_key_are_accepted() {
        let bare = serde_json::Value::Array(wave_candles(5));
        assert!(render(&bare, &small_settings(), &StaticAsset(None)).is_ok());
        let ohlc = json!({ "ohlc": wave_candles(5) });
        assert!(render(&ohlc, &small_settings(), &StaticAsset(None)).is_ok());
    }

    #[test]
    fn empty_array_is_payload_shape_error() {
        assert!(matches!(
            client_error(json!([])),
            ChartError::PayloadShape { .. }
        ));
    }

    #[test]
    fn duplicate_timestamp_is_rejected() {
        let mut candles = wave_candles(4);
        candles[2]["time"] = candles[1]["time"].clone();
        assert!(matches!(
            client_error(payload(candles)),
            ChartError::TimeOrdering { .. }
        ));
    }

    #[test]
    fn missing_volume_names_the_field() {
        let mut candles = wave_candles(4);
        candles[3].as_object_mut().unwrap().remove("volume");
        match client_error(payload(candles)) {
            ChartError::MissingField { field } => assert_eq!(field, "volume"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn aliases_resolve_case_insensitively() {
        let body = json!([
            {"Timestamp": "2024-01-01T00:00:00Z", "OPEN": 1, "High": 2, "low": 0.5, "Close": 1.5, "Volume": 10},
            {"TIME": 1704070800, "open": "1.5", "high": 2.5, "LOW": 1, "close": 2, "volume": 12}
        ]);
        assert!(render(&body, &small_settings(), &StaticAsset(None)).is_ok());
    }
}

mod indicator_modes {
    use super::*;

    fn short_history_with_default_bands() -> serde_json::Value {
        payload(wave_candles(8))
    }

    #[test]
    fn lenient_mode_degrades_short_history() {
        assert!(render(&short_history_with_default_bands(), &small_settings(), &StaticAsset(None)).is_ok());
    }

    #[test]
    fn strict_payload_flag_rejects_short_history() {
        let mut body = short_history_with_default_bands();
        body["strict"] = json!(true);
        let err = render(&body, &small_settings(), &StaticAsset(None)).unwrap_err();
        assert!(matches!(err, ChartError::Computation { .. }));
        assert_eq!(err.class(), ErrorClass::Client);
    }

    #[test]
    fn strict_setting_rejects_short_history() {
        let settings = candlechart::domain::settings::RenderSettings {
            strict: true,
            ..small_settings()
        };
        let err = render(&short_history_with_default_bands(), &settings, &StaticAsset(None)).unwrap_err();
        assert!(matches!(err, ChartError::Computation { .. }));
    }
}
