//! Rasterization port trait.

use crate::domain::error::ChartError;
use crate::domain::layer::ChartSpec;

/// Encoded chart image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Port for turning a composed chart into image bytes.
///
/// Implementations must build their drawing surface per call and release it
/// before returning, so one renderer can serve concurrent requests.
pub trait RenderPort {
    fn render(&self, spec: ChartSpec) -> Result<RenderedImage, ChartError>;
}
