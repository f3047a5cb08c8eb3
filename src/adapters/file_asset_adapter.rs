//! Watermark loaded from an image file on disk.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use image::RgbaImage;

use crate::domain::error::ChartError;
use crate::ports::asset_port::BrandAssetPort;

/// Decodes the configured image once and hands out shared copies.
///
/// A missing path or missing file yields no watermark; an unreadable or
/// corrupt file is an error, which the pipeline logs and renders around.
pub struct FileBrandAsset {
    path: Option<PathBuf>,
    cached: OnceLock<Result<Option<Arc<RgbaImage>>, String>>,
}

impl FileBrandAsset {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            cached: OnceLock::new(),
        }
    }

    fn load(&self) -> Result<Option<Arc<RgbaImage>>, String> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        if !path.exists() {
            tracing::info!(path = %path.display(), "watermark file not found, charts will be unbranded");
            return Ok(None);
        }
        let decoded = image::open(path)
            .map_err(|e| format!("cannot decode watermark {}: {e}", path.display()))?;
        let image = decoded.to_rgba8();
        tracing::debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "loaded watermark"
        );
        Ok(Some(Arc::new(image)))
    }
}

impl BrandAssetPort for FileBrandAsset {
    fn watermark(&self) -> Result<Option<Arc<RgbaImage>>, ChartError> {
        self.cached
            .get_or_init(|| self.load())
            .clone()
            .map_err(ChartError::render)
    }
}
