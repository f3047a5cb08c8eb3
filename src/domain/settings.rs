//! Typed, validated render settings read from a [`ConfigPort`].
//!
//! Every key is optional; missing keys take the defaults below.

use std::path::PathBuf;

use crate::domain::composer::{DEFAULT_SYMBOL, DEFAULT_TIMEFRAME, DEFAULT_WATERMARK_OPACITY};
use crate::domain::error::ChartError;
use crate::domain::pattern::DEFAULT_DOJI_FRACTION;
use crate::ports::config_port::ConfigPort;

/// 12in × 1.5 figscale at 150 DPI.
pub const DEFAULT_WIDTH: u32 = 2700;
/// 6in × 1.5 figscale at 150 DPI.
pub const DEFAULT_HEIGHT: u32 = 1350;
pub const DEFAULT_DPI: u32 = 150;
pub const DEFAULT_LISTEN: &str = "127.0.0.1:5000";

const MAX_DIMENSION: i64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub dpi: u32,
    pub watermark_path: Option<PathBuf>,
    pub watermark_opacity: f32,
    pub strict: bool,
    pub doji_fraction: f64,
    pub default_symbol: String,
    pub default_timeframe: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            dpi: DEFAULT_DPI,
            watermark_path: None,
            watermark_opacity: DEFAULT_WATERMARK_OPACITY,
            strict: false,
            doji_fraction: DEFAULT_DOJI_FRACTION,
            default_symbol: DEFAULT_SYMBOL.to_string(),
            default_timeframe: DEFAULT_TIMEFRAME.to_string(),
        }
    }
}

impl RenderSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ChartError> {
        let defaults = Self::default();
        Ok(Self {
            width: read_dimension(config, "width", defaults.width)?,
            height: read_dimension(config, "height", defaults.height)?,
            dpi: read_dimension(config, "dpi", defaults.dpi)?,
            watermark_path: config.get_non_empty("chart", "watermark_path").map(PathBuf::from),
            watermark_opacity: read_opacity(config)?,
            strict: config.get_bool("chart", "strict", defaults.strict),
            doji_fraction: read_doji_fraction(config)?,
            default_symbol: config
                .get_non_empty("chart", "default_symbol")
                .unwrap_or(defaults.default_symbol),
            default_timeframe: config
                .get_non_empty("chart", "default_timeframe")
                .unwrap_or(defaults.default_timeframe),
        })
    }

    /// Scale factor for text and strokes relative to 100 DPI.
    pub fn scale(&self) -> f64 {
        self.dpi as f64 / 100.0
    }
}

pub fn listen_address(config: &dyn ConfigPort) -> String {
    config
        .get_non_empty("web", "listen")
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ChartError {
    ChartError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn read_dimension(config: &dyn ConfigPort, key: &str, default: u32) -> Result<u32, ChartError> {
    let value = config.get_int("render", key, default as i64);
    if value <= 0 || value > MAX_DIMENSION {
        return Err(invalid(
            "render",
            key,
            format!("{key} must be between 1 and {MAX_DIMENSION}"),
        ));
    }
    Ok(value as u32)
}

fn read_opacity(config: &dyn ConfigPort) -> Result<f32, ChartError> {
    let value = config.get_double("chart", "watermark_opacity", DEFAULT_WATERMARK_OPACITY as f64);
    if !(value > 0.0 && value <= 1.0) {
        return Err(invalid(
            "chart",
            "watermark_opacity",
            "watermark_opacity must be in (0, 1]",
        ));
    }
    Ok(value as f32)
}

fn read_doji_fraction(config: &dyn ConfigPort) -> Result<f64, ChartError> {
    let value = config.get_double("chart", "doji_fraction", DEFAULT_DOJI_FRACTION);
    if !(value > 0.0 && value < 1.0) {
        return Err(invalid(
            "chart",
            "doji_fraction",
            "doji_fraction must be in (0, 1)",
        ));
    }
    Ok(value)
}
