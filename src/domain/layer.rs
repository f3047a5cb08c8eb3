//! Visual layers and the assembled chart description.
//!
//! Layers are plain data. Positions are in data coordinates: x is the record
//! index in the table, y is price (or oscillator value in the lower panel).

use std::sync::Arc;

use image::RgbaImage;

use crate::domain::ohlcv::TimeSeriesTable;
use crate::domain::pattern::AnnotationPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const GREEN: Color = Color::rgb(0, 200, 83);
    pub const RED: Color = Color::rgb(255, 68, 68);
    pub const BLUE: Color = Color::rgb(33, 150, 243);
    pub const ORANGE: Color = Color::rgb(255, 152, 0);
    pub const YELLOW: Color = Color::rgb(255, 235, 59);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const LIGHT_GRAY: Color = Color::rgb(200, 200, 200);
    pub const GRAY: Color = Color::rgb(110, 110, 110);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Primary,
    Oscillator,
}

/// Rectangle in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataExtent {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl DataExtent {
    pub fn is_valid(&self) -> bool {
        [self.x_min, self.x_max, self.y_min, self.y_max]
            .iter()
            .all(|v| v.is_finite())
            && self.x_max > self.x_min
            && self.y_max > self.y_min
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub index: usize,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandleLayer {
    pub candles: Vec<Candle>,
    pub up_color: Color,
    pub down_color: Color,
}

/// A polyline over the time index, or a horizontal reference level.
#[derive(Debug, Clone, PartialEq)]
pub enum LineGeometry {
    /// One optional value per record; gaps break the line.
    Series(Vec<Option<f64>>),
    Horizontal(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineLayer {
    pub label: String,
    pub panel: Panel,
    pub geometry: LineGeometry,
    pub color: Color,
    pub style: LineStyle,
    pub width: f64,
}

/// Histogram bars rising from zero, one optional value per record.
#[derive(Debug, Clone, PartialEq)]
pub struct BarLayer {
    pub label: String,
    pub panel: Panel,
    pub values: Vec<Option<f64>>,
    pub positive_color: Color,
    pub negative_color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerLayer {
    pub markers: Vec<AnnotationPoint>,
}

#[derive(Debug, Clone)]
pub struct WatermarkLayer {
    pub image: Arc<RgbaImage>,
    pub opacity: f32,
    pub extent: DataExtent,
}

#[derive(Debug, Clone)]
pub enum VisualLayer {
    Candle(CandleLayer),
    Line(LineLayer),
    Bar(BarLayer),
    Marker(MarkerLayer),
    Watermark(WatermarkLayer),
}

impl VisualLayer {
    pub fn panel(&self) -> Panel {
        match self {
            VisualLayer::Line(line) => line.panel,
            VisualLayer::Bar(bar) => bar.panel,
            VisualLayer::Candle(_) | VisualLayer::Marker(_) | VisualLayer::Watermark(_) => {
                Panel::Primary
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VisualLayer::Candle(_) => "candle",
            VisualLayer::Line(_) => "line",
            VisualLayer::Bar(_) => "bar",
            VisualLayer::Marker(_) => "marker",
            VisualLayer::Watermark(_) => "watermark",
        }
    }
}

/// A vertically stacked plot area and the value range it shows.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSpec {
    pub panel: Panel,
    pub y_label: String,
    pub y_range: (f64, f64),
    /// Share of the total plot height.
    pub height_ratio: f64,
}

/// Everything the renderer needs, consumed exactly once.
#[derive(Debug, Clone)]
pub struct ChartSpec {
    pub table: TimeSeriesTable,
    /// Bottom to top.
    pub layers: Vec<VisualLayer>,
    /// Top to bottom.
    pub panels: Vec<PanelSpec>,
    pub title: String,
    pub datetime_format: String,
}

impl ChartSpec {
    pub fn panel(&self, panel: Panel) -> Option<&PanelSpec> {
        self.panels.iter().find(|p| p.panel == panel)
    }

    pub fn layers_in(&self, panel: Panel) -> impl Iterator<Item = &VisualLayer> {
        self.layers.iter().filter(move |l| l.panel() == panel)
    }

    pub fn has_watermark(&self) -> bool {
        self.layers
            .iter()
            .any(|l| matches!(l, VisualLayer::Watermark(_)))
    }
}
