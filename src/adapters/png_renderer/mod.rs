//! PNG rasterizer for composed charts.
//!
//! Each call allocates its own [`Canvas`], draws panels top to bottom, then
//! encodes and drops it. Nothing is shared between calls, so a single
//! renderer can serve concurrent requests.

mod axis;
mod canvas;
mod font;
mod theme;

use std::fmt::Write as _;
use std::f64::consts::PI;

use crate::domain::error::ChartError;
use crate::domain::layer::{
    BarLayer, CandleLayer, ChartSpec, LineGeometry, LineLayer, LineStyle, MarkerLayer, Panel,
    PanelSpec, VisualLayer, WatermarkLayer,
};
use crate::domain::settings::RenderSettings;
use crate::ports::render_port::{RenderPort, RenderedImage};

use axis::{decimals_for, format_tick, label_indices, nice_ticks, Viewport};
use canvas::{Anchor, Canvas, PixelRect, Stroke};
use font::{text_width, GLYPH_HEIGHT};
use theme::{to_rgb, Theme};

pub const PNG_CONTENT_TYPE: &str = "image/png";

const CANDLE_BODY_SHARE: f64 = 0.7;
const BAR_SHARE: f64 = 0.6;
const STAR_INNER_RATIO: f64 = 0.4;

#[derive(Debug, Clone)]
pub struct PngRenderer {
    width: u32,
    height: u32,
    scale: f64,
    theme: Theme,
}

/// One laid-out panel: where it sits and which ticks it shows.
struct Frame<'a> {
    spec: &'a PanelSpec,
    viewport: Viewport,
    ticks: Vec<String>,
    tick_values: Vec<f64>,
}

impl PngRenderer {
    pub fn new(width: u32, height: u32, scale: f64) -> Self {
        Self {
            width,
            height,
            scale: if scale.is_finite() && scale > 0.0 { scale } else { 1.0 },
            theme: Theme::default(),
        }
    }

    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self::new(settings.width, settings.height, settings.scale())
    }

    fn px(&self, points: f64) -> f64 {
        points * self.scale
    }

    fn label_size(&self) -> u32 {
        (2.0 * self.scale).round().max(1.0) as u32
    }

    fn title_size(&self) -> u32 {
        (3.0 * self.scale).round().max(2.0) as u32
    }

    fn layout<'a>(&self, spec: &'a ChartSpec) -> Result<Vec<Frame<'a>>, ChartError> {
        let label = self.label_size();
        let text_height = (GLYPH_HEIGHT * label) as f64;
        let top = (GLYPH_HEIGHT * self.title_size()) as f64 + self.px(24.0);
        let bottom = text_height + self.px(20.0);
        let left = self.px(20.0);
        let gap = self.px(10.0);

        // Tick labels decide the right margin, so compute them before placing panels.
        let mut ticked: Vec<(&PanelSpec, Vec<f64>, Vec<String>)> = Vec::new();
        let mut widest = 0;
        for panel in &spec.panels {
            let (lo, hi) = panel.y_range;
            let (values, step) = nice_ticks(lo, hi, 6);
            let places = decimals_for(step);
            let labels: Vec<String> = values.iter().map(|v| format_tick(*v, places)).collect();
            widest = labels
                .iter()
                .map(|l| text_width(l, label))
                .max()
                .unwrap_or(0)
                .max(widest);
            ticked.push((panel, values, labels));
        }
        let right = widest as f64 + self.px(24.0);

        let plot_width = self.width as f64 - left - right;
        let gaps = gap * spec.panels.len().saturating_sub(1) as f64;
        let plot_height = self.height as f64 - top - bottom - gaps;
        if plot_width < 10.0 || plot_height < 10.0 || spec.panels.is_empty() {
            return Err(ChartError::render(format!(
                "{}x{} image is too small for the chart layout",
                self.width, self.height
            )));
        }

        let ratio_total: f64 = spec.panels.iter().map(|p| p.height_ratio.max(0.0)).sum();
        let ratio_total = if ratio_total > 0.0 { ratio_total } else { 1.0 };

        let mut y = top;
        let frames = ticked
            .into_iter()
            .map(|(panel, tick_values, ticks)| {
                let height = plot_height * panel.height_ratio.max(0.0) / ratio_total;
                let rect = PixelRect::new(left, y, left + plot_width, y + height);
                y += height + gap;
                Frame {
                    spec: panel,
                    viewport: Viewport::for_records(rect, spec.table.len(), panel.y_range),
                    ticks,
                    tick_values,
                }
            })
            .collect();
        Ok(frames)
    }

    fn draw_title(&self, canvas: &mut Canvas, title: &str) {
        let size = self.title_size();
        let y = ((GLYPH_HEIGHT * size) as f64 + self.px(24.0)) / 2.0;
        canvas.text(
            title,
            self.width as f64 / 2.0,
            y,
            size,
            self.theme.text,
            Anchor::Center,
        );
    }

    fn draw_frame(&self, canvas: &mut Canvas, frame: &Frame<'_>, time_ticks: &[usize]) {
        let rect = frame.viewport.rect;
        canvas.fill_rect(rect, self.theme.panel, 1.0);

        let grid = Stroke {
            color: self.theme.grid,
            width: 1.0,
            dash: None,
        };
        for value in &frame.tick_values {
            let y = frame.viewport.y(*value);
            canvas.line((rect.x0, y), (rect.x1, y), &grid);
        }
        for index in time_ticks {
            let x = frame.viewport.x(*index as f64);
            canvas.line((x, rect.y0), (x, rect.y1), &grid);
        }

        let label = self.label_size();
        for (value, text) in frame.tick_values.iter().zip(&frame.ticks) {
            canvas.text(
                text,
                rect.x1 + self.px(8.0),
                frame.viewport.y(*value),
                label,
                self.theme.muted_text,
                Anchor::Left,
            );
        }
    }

    fn draw_panel_label(&self, canvas: &mut Canvas, frame: &Frame<'_>) {
        let rect = frame.viewport.rect;
        let label = self.label_size();
        canvas.stroke_rect(rect, self.theme.axis, 1.0);
        canvas.text(
            &frame.spec.y_label,
            rect.x0 + self.px(8.0),
            rect.y0 + self.px(6.0) + (GLYPH_HEIGHT * label) as f64 / 2.0,
            label,
            self.theme.muted_text,
            Anchor::Left,
        );
    }

    fn draw_time_axis(&self, canvas: &mut Canvas, spec: &ChartSpec, frame: &Frame<'_>, ticks: &[usize]) {
        let label = self.label_size();
        let y = frame.viewport.rect.y1 + self.px(8.0) + (GLYPH_HEIGHT * label) as f64 / 2.0;
        for &index in ticks {
            let Some(record) = spec.table.records().get(index) else {
                continue;
            };
            let mut text = String::new();
            if write!(text, "{}", record.timestamp.format(&spec.datetime_format)).is_err() {
                text = record.timestamp.to_rfc3339();
            }
            canvas.text(
                &text,
                frame.viewport.x(index as f64),
                y,
                label,
                self.theme.muted_text,
                Anchor::Center,
            );
        }
    }

    fn time_ticks(&self, spec: &ChartSpec, plot_width: f64) -> Vec<usize> {
        let Some(first) = spec.table.records().first() else {
            return Vec::new();
        };
        let mut sample = String::new();
        if write!(sample, "{}", first.timestamp.format(&spec.datetime_format)).is_err() {
            sample = first.timestamp.to_rfc3339();
        }
        let slot = text_width(&sample, self.label_size()) as f64 + self.px(30.0);
        let max_labels = (plot_width / slot).floor().max(1.0) as usize;
        label_indices(spec.table.len(), max_labels.min(8))
    }

    fn draw_layer(&self, canvas: &mut Canvas, viewport: &Viewport, layer: &VisualLayer) {
        match layer {
            VisualLayer::Watermark(watermark) => self.draw_watermark(canvas, viewport, watermark),
            VisualLayer::Candle(candles) => self.draw_candles(canvas, viewport, candles),
            VisualLayer::Line(line) => self.draw_line(canvas, viewport, line),
            VisualLayer::Bar(bars) => self.draw_bars(canvas, viewport, bars),
            VisualLayer::Marker(markers) => self.draw_markers(canvas, viewport, markers),
        }
    }

    fn draw_watermark(&self, canvas: &mut Canvas, viewport: &Viewport, layer: &WatermarkLayer) {
        let extent = layer.extent;
        let rect = PixelRect::new(
            viewport.x(extent.x_min),
            viewport.y(extent.y_max),
            viewport.x(extent.x_max),
            viewport.y(extent.y_min),
        );
        canvas.draw_image(&layer.image, rect, layer.opacity);
    }

    fn draw_candles(&self, canvas: &mut Canvas, viewport: &Viewport, layer: &CandleLayer) {
        let body = (viewport.slot_width() * CANDLE_BODY_SHARE).max(1.0);
        let wick = self.px(1.0).max(1.0).min(body);
        for candle in &layer.candles {
            let color = to_rgb(if candle.is_bullish() {
                layer.up_color
            } else {
                layer.down_color
            });
            let x = viewport.x(candle.index as f64);
            canvas.fill_rect(
                PixelRect::new(
                    x - wick / 2.0,
                    viewport.y(candle.high),
                    x + wick / 2.0,
                    viewport.y(candle.low),
                ),
                color,
                1.0,
            );
            canvas.fill_rect(
                PixelRect::new(
                    x - body / 2.0,
                    viewport.y(candle.open.max(candle.close)),
                    x + body / 2.0,
                    viewport.y(candle.open.min(candle.close)),
                ),
                color,
                1.0,
            );
        }
    }

    fn draw_line(&self, canvas: &mut Canvas, viewport: &Viewport, layer: &LineLayer) {
        let width = self.px(layer.width).max(1.0);
        let stroke = Stroke {
            color: to_rgb(layer.color),
            width,
            dash: match layer.style {
                LineStyle::Solid => None,
                LineStyle::Dashed => Some((width * 4.0, width * 2.5)),
                LineStyle::Dotted => Some((width, width * 2.0)),
            },
        };
        match &layer.geometry {
            LineGeometry::Horizontal(level) => {
                let y = viewport.y(*level);
                canvas.line((viewport.rect.x0, y), (viewport.rect.x1, y), &stroke);
            }
            LineGeometry::Series(values) => {
                // Undefined points split the series into separate runs.
                let mut run: Vec<(f64, f64)> = Vec::new();
                for (i, value) in values.iter().enumerate() {
                    match value {
                        Some(v) if v.is_finite() => run.push((viewport.x(i as f64), viewport.y(*v))),
                        _ => {
                            canvas.polyline(&run, &stroke);
                            run.clear();
                        }
                    }
                }
                canvas.polyline(&run, &stroke);
            }
        }
    }

    fn draw_bars(&self, canvas: &mut Canvas, viewport: &Viewport, layer: &BarLayer) {
        let width = (viewport.slot_width() * BAR_SHARE).max(1.0);
        let zero = viewport.y(0.0);
        for (i, value) in layer.values.iter().enumerate() {
            let Some(v) = value.filter(|v| v.is_finite()) else {
                continue;
            };
            let color = if v >= 0.0 {
                layer.positive_color
            } else {
                layer.negative_color
            };
            let x = viewport.x(i as f64);
            canvas.fill_rect(
                PixelRect::new(x - width / 2.0, zero, x + width / 2.0, viewport.y(v)),
                to_rgb(color),
                1.0,
            );
        }
    }

    fn draw_markers(&self, canvas: &mut Canvas, viewport: &Viewport, layer: &MarkerLayer) {
        for marker in &layer.markers {
            let radius = self.px(marker.style.size) * 0.7;
            let star = star_points(
                viewport.x(marker.index as f64),
                viewport.y(marker.price),
                radius,
            );
            canvas.fill_polygon(&star, to_rgb(marker.style.color));
        }
    }
}

/// Five-pointed star, first point straight up.
fn star_points(cx: f64, cy: f64, outer: f64) -> Vec<(f64, f64)> {
    let inner = outer * STAR_INNER_RATIO;
    (0..10)
        .map(|i| {
            let r = if i % 2 == 0 { outer } else { inner };
            let angle = -PI / 2.0 + i as f64 * PI / 5.0;
            (cx + r * angle.cos(), cy + r * angle.sin())
        })
        .collect()
}

impl RenderPort for PngRenderer {
    fn render(&self, spec: ChartSpec) -> Result<RenderedImage, ChartError> {
        let frames = self.layout(&spec)?;
        let plot_width = frames
            .first()
            .map(|f| f.viewport.rect.width())
            .unwrap_or_default();
        let time_ticks = self.time_ticks(&spec, plot_width);

        let mut canvas = Canvas::new(self.width, self.height, self.theme.background);
        self.draw_title(&mut canvas, &spec.title);

        for frame in &frames {
            self.draw_frame(&mut canvas, frame, &time_ticks);
            canvas.set_clip(frame.viewport.rect);
            for layer in spec.layers_in(frame.spec.panel) {
                self.draw_layer(&mut canvas, &frame.viewport, layer);
            }
            canvas.reset_clip();
            self.draw_panel_label(&mut canvas, frame);
        }
        if let Some(bottom) = frames.last() {
            self.draw_time_axis(&mut canvas, &spec, bottom, &time_ticks);
        }

        tracing::debug!(
            width = self.width,
            height = self.height,
            panels = frames.len(),
            oscillator = spec.panel(Panel::Oscillator).is_some(),
            "rasterized chart"
        );
        let bytes = canvas.into_png()?;
        Ok(RenderedImage {
            bytes,
            content_type: PNG_CONTENT_TYPE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::composer::{compose, ComposeOptions};
    use crate::domain::indicator::{compute_indicators, ComputeMode, IndicatorRequest, OscillatorParams};
    use crate::domain::ohlcv::{BatchMetadata, OhlcvRecord, TimeSeriesTable};
    use chrono::{Duration, TimeZone, Utc};
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;

    fn table(n: usize) -> TimeSeriesTable {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let records = (0..n)
            .map(|i| {
                let base = 50.0 + (i as f64 * 0.5).cos() * 5.0;
                OhlcvRecord {
                    timestamp: start + Duration::hours(i as i64),
                    open: base,
                    high: base + 2.0,
                    low: base - 2.0,
                    close: base + if i % 2 == 0 { 1.0 } else { -1.0 },
                    volume: 10.0,
                }
            })
            .collect();
        let metadata = BatchMetadata {
            symbol: Some("ETHUSDT".into()),
            support: vec![47.0],
            highlight_patterns: true,
        };
        TimeSeriesTable::new(records, metadata).unwrap()
    }

    fn spec(n: usize, oscillator: bool, watermark: bool) -> ChartSpec {
        let table = table(n);
        let request = IndicatorRequest {
            oscillator: oscillator.then(OscillatorParams::default),
            ..IndicatorRequest::default()
        };
        let indicators = compute_indicators(&table, &request, ComputeMode::Lenient).unwrap();
        let options = ComposeOptions {
            watermark: watermark
                .then(|| Arc::new(RgbaImage::from_pixel(8, 4, Rgba([255, 255, 255, 255])))),
            ..ComposeOptions::default()
        };
        compose(table, &indicators, &[], &options).unwrap()
    }

    #[test]
    fn renders_png_of_configured_size() {
        let renderer = PngRenderer::new(800, 400, 1.0);
        let image = renderer.render(spec(40, true, true)).unwrap();
        assert_eq!(image.content_type, "image/png");
        let decoded = image::load_from_memory(&image.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 400));
    }

    #[test]
    fn oscillator_adds_second_panel() {
        let renderer = PngRenderer::new(800, 400, 1.0);
        let spec = spec(30, true, false);
        let frames = renderer.layout(&spec).unwrap();
        assert_eq!(frames.len(), 2);
        let primary = frames[0].viewport.rect;
        let lower = frames[1].viewport.rect;
        assert!(primary.y1 < lower.y0);
        let share = primary.height() / (primary.height() + lower.height());
        assert!((share - 0.7).abs() < 1e-9);
    }

    #[test]
    fn tiny_canvas_is_a_render_error() {
        let renderer = PngRenderer::new(20, 20, 1.0);
        let err = renderer.render(spec(5, false, false)).unwrap_err();
        assert!(matches!(err, ChartError::Render { .. }));
    }

    #[test]
    fn watermark_brightens_background() {
        let renderer = PngRenderer::new(600, 300, 1.0);
        let plain = renderer.render(spec(10, false, false)).unwrap();
        let branded = renderer.render(spec(10, false, true)).unwrap();
        assert_ne!(plain.bytes, branded.bytes);
    }

    #[test]
    fn repeated_renders_are_identical() {
        let renderer = PngRenderer::new(500, 250, 1.0);
        let a = renderer.render(spec(12, true, false)).unwrap();
        let b = renderer.render(spec(12, true, false)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn star_starts_at_top() {
        let points = star_points(10.0, 10.0, 5.0);
        assert_eq!(points.len(), 10);
        assert!((points[0].0 - 10.0).abs() < 1e-9);
        assert!((points[0].1 - 5.0).abs() < 1e-9);
    }
}
