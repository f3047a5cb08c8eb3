//! Brand asset port trait.

use std::sync::Arc;

use image::RgbaImage;

use crate::domain::error::ChartError;

/// Source of the watermark image.
///
/// `Ok(None)` means no asset is configured or present, which is not an error.
pub trait BrandAssetPort {
    fn watermark(&self) -> Result<Option<Arc<RgbaImage>>, ChartError>;
}
