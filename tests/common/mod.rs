#![allow(dead_code)]

use candlechart::adapters::png_renderer::PngRenderer;
use candlechart::domain::chart::ChartService;
use candlechart::domain::error::ChartError;
use candlechart::domain::settings::RenderSettings;
use candlechart::ports::asset_port::BrandAssetPort;
use candlechart::ports::render_port::RenderedImage;
use chrono::{Duration, TimeZone, Utc};
use image::{Rgba, RgbaImage};
use serde_json::{json, Value};
use std::sync::Arc;

/// One record as the payload carries it, with an ISO-style time string.
pub fn candle(minute: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Value {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let time = (start + Duration::minutes(minute)).format("%Y-%m-%d %H:%M:%S").to_string();
    json!({
        "time": time,
        "open": open,
        "high": high,
        "low": low,
        "close": close,
        "volume": volume,
    })
}

/// `n` records in five-minute steps with a gentle wave and alternating direction.
pub fn wave_candles(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            let base = 100.0 + (i as f64 * 0.4).sin() * 6.0;
            let close = if i % 2 == 0 { base + 1.2 } else { base - 1.2 };
            candle(5 * i as i64, base, base + 3.0, base - 3.0, close, 500.0 + i as f64)
        })
        .collect()
}

pub fn payload(candles: Vec<Value>) -> Value {
    json!({ "candles": candles })
}

/// A payload exercising every optional layer.
pub fn full_payload(n: usize) -> Value {
    let mut candles = wave_candles(n);
    // A near-doji so the marker layer is populated.
    candles[n / 2] = candle(5 * (n / 2) as i64, 100.0, 110.0, 90.0, 100.2, 700.0);
    json!({
        "candles": candles,
        "symbol": "BTCUSDT",
        "support": [95.0, 104.5],
        "highlight_patterns": true,
        "indicators": {
            "bands": {"window": 10, "mult": 2.0},
            "oscillator": {"fast": 12, "slow": 26, "signal": 9},
        },
        "timeframe": "5m",
    })
}

pub struct StaticAsset(pub Option<Arc<RgbaImage>>);

impl BrandAssetPort for StaticAsset {
    fn watermark(&self) -> Result<Option<Arc<RgbaImage>>, ChartError> {
        Ok(self.0.clone())
    }
}

pub fn white_logo() -> Arc<RgbaImage> {
    Arc::new(RgbaImage::from_pixel(16, 8, Rgba([255, 255, 255, 255])))
}

pub fn small_settings() -> RenderSettings {
    RenderSettings {
        width: 900,
        height: 450,
        dpi: 100,
        ..RenderSettings::default()
    }
}

pub fn render(
    payload: &Value,
    settings: &RenderSettings,
    asset: &StaticAsset,
) -> Result<RenderedImage, ChartError> {
    let renderer = PngRenderer::from_settings(settings);
    ChartService {
        settings,
        assets: asset,
        renderer: &renderer,
    }
    .render(payload)
}
