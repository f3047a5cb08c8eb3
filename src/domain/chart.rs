//! The render pipeline: payload in, image bytes or a [`ChartError`] out.
//!
//! Stages run strictly in order: normalize, then indicators and pattern
//! detection side by side, then composition, then rendering. The pipeline
//! holds no state between calls.

use serde_json::Value;

use crate::domain::composer::{compose, ComposeOptions};
use crate::domain::error::ChartError;
use crate::domain::indicator::{compute_indicators, ComputeMode};
use crate::domain::normalizer::parse_request;
use crate::domain::pattern::{detect_patterns, DojiRule};
use crate::domain::settings::RenderSettings;
use crate::ports::asset_port::BrandAssetPort;
use crate::ports::render_port::{RenderPort, RenderedImage};

pub struct ChartService<'a> {
    pub settings: &'a RenderSettings,
    pub assets: &'a dyn BrandAssetPort,
    pub renderer: &'a dyn RenderPort,
}

impl ChartService<'_> {
    pub fn render(&self, payload: &Value) -> Result<RenderedImage, ChartError> {
        let request = parse_request(payload)?;
        let table = request.table;

        let mode = if request.strict || self.settings.strict {
            ComputeMode::Strict
        } else {
            ComputeMode::Lenient
        };
        let rule = DojiRule::with_fraction(self.settings.doji_fraction);

        let (indicators, annotations) = rayon::join(
            || compute_indicators(&table, &request.indicators, mode),
            || detect_patterns(&table, &rule),
        );
        let indicators = indicators?;

        let watermark = match self.assets.watermark() {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(error = %e, "watermark unavailable, rendering without it");
                None
            }
        };

        let options = ComposeOptions {
            default_symbol: self.settings.default_symbol.clone(),
            default_timeframe: self.settings.default_timeframe.clone(),
            timeframe: request.timeframe,
            watermark,
            watermark_opacity: self.settings.watermark_opacity,
        };

        let rows = table.len();
        let spec = compose(table, &indicators, &annotations, &options)?;
        let image = self.renderer.render(spec)?;
        tracing::info!(rows, bytes = image.bytes.len(), "chart rendered");
        Ok(image)
    }
}
