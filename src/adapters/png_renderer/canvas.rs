//! Pixel-level drawing on an owned RGB buffer.
//!
//! Coordinates are floating-point pixels with the origin at the top left.
//! Every primitive honours the current clip rectangle.

use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, RgbaImage};

use super::font::{lit_cells, text_width, GLYPH_ADVANCE, GLYPH_HEIGHT};
use crate::domain::error::ChartError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PixelRect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    fn intersect(&self, other: &PixelRect) -> PixelRect {
        PixelRect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        }
    }
}

/// Stroke pattern as (on, off) lengths in pixels; `None` is solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgb<u8>,
    pub width: f64,
    pub dash: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Left,
    Center,
}

pub struct Canvas {
    image: RgbImage,
    clip: PixelRect,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgb<u8>) -> Self {
        Self {
            image: RgbImage::from_pixel(width, height, background),
            clip: Self::full(width, height),
        }
    }

    fn full(width: u32, height: u32) -> PixelRect {
        PixelRect::new(0.0, 0.0, width as f64, height as f64)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn set_clip(&mut self, rect: PixelRect) {
        self.clip = rect.intersect(&Self::full(self.width(), self.height()));
    }

    pub fn reset_clip(&mut self) {
        self.clip = Self::full(self.width(), self.height());
    }

    /// Writable pixel span as half-open `(x0, y0, x1, y1)`: the clip
    /// rectangle widened to whole pixels and limited to the image.
    fn pixel_bounds(&self) -> (i64, i64, i64, i64) {
        (
            (self.clip.x0.floor() as i64).max(0),
            (self.clip.y0.floor() as i64).max(0),
            (self.clip.x1.ceil() as i64).min(self.width() as i64),
            (self.clip.y1.ceil() as i64).min(self.height() as i64),
        )
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgb<u8>, alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let (bx0, by0, bx1, by1) = self.pixel_bounds();
        if x < bx0 || y < by0 || x >= bx1 || y >= by1 {
            return;
        }
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        if alpha >= 1.0 {
            *pixel = color;
            return;
        }
        for c in 0..3 {
            let dst = pixel.0[c] as f32;
            let src = color.0[c] as f32;
            pixel.0[c] = (dst + (src - dst) * alpha).round().clamp(0.0, 255.0) as u8;
        }
    }

    /// Fills the pixels whose centres fall inside `rect`, at least one pixel.
    pub fn fill_rect(&mut self, rect: PixelRect, color: Rgb<u8>, alpha: f32) {
        let x_start = rect.x0.round() as i64;
        let y_start = rect.y0.round() as i64;
        let x_end = (rect.x1.round() as i64).max(x_start.saturating_add(1));
        let y_end = (rect.y1.round() as i64).max(y_start.saturating_add(1));

        let (bx0, by0, bx1, by1) = self.pixel_bounds();
        for y in y_start.max(by0)..y_end.min(by1) {
            for x in x_start.max(bx0)..x_end.min(bx1) {
                self.blend(x, y, color, alpha);
            }
        }
    }

    pub fn stroke_rect(&mut self, rect: PixelRect, color: Rgb<u8>, width: f64) {
        let solid = Stroke {
            color,
            width,
            dash: None,
        };
        let corners = [
            (rect.x0, rect.y0),
            (rect.x1, rect.y0),
            (rect.x1, rect.y1),
            (rect.x0, rect.y1),
            (rect.x0, rect.y0),
        ];
        self.polyline(&corners, &solid);
    }

    /// Draws connected segments; the dash pattern runs on across joints.
    pub fn polyline(&mut self, points: &[(f64, f64)], stroke: &Stroke) {
        let mut travelled = 0.0;
        if let [(x, y)] = points {
            self.stamp(*x, *y, stroke);
            return;
        }
        for pair in points.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            let (dx, dy) = (x1 - x0, y1 - y0);
            let length = dx.hypot(dy);
            let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
            for i in 0..=steps {
                let t = i as f64 / steps as f64;
                if dash_is_on(stroke.dash, travelled + t * length) {
                    self.stamp(x0 + dx * t, y0 + dy * t, stroke);
                }
            }
            travelled += length;
        }
    }

    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), stroke: &Stroke) {
        self.polyline(&[from, to], stroke);
    }

    fn stamp(&mut self, x: f64, y: f64, stroke: &Stroke) {
        let half = (stroke.width / 2.0).max(0.5);
        self.fill_rect(
            PixelRect::new(x - half, y - half, x + half, y + half),
            stroke.color,
            1.0,
        );
    }

    /// Even-odd scanline fill over the polygon's bounding box.
    pub fn fill_polygon(&mut self, points: &[(f64, f64)], color: Rgb<u8>) {
        if points.len() < 3 {
            return;
        }
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let (bx0, by0, bx1, by1) = self.pixel_bounds();
        let x_start = (min_x.floor() as i64).max(bx0);
        let x_end = (max_x.ceil() as i64).min(bx1 - 1);
        let y_start = (min_y.floor() as i64).max(by0);
        let y_end = (max_y.ceil() as i64).min(by1 - 1);
        for py in y_start..=y_end {
            for px in x_start..=x_end {
                if contains(points, px as f64 + 0.5, py as f64 + 0.5) {
                    self.blend(px, py, color, 1.0);
                }
            }
        }
    }

    /// Scales `source` into `rect` and composites it at `opacity`, weighted
    /// by the source alpha.
    pub fn draw_image(&mut self, source: &RgbaImage, rect: PixelRect, opacity: f32) {
        let width = rect.width().round();
        let height = rect.height().round();
        if width < 1.0 || height < 1.0 || source.width() == 0 || source.height() == 0 {
            return;
        }
        let scaled = imageops::resize(source, width as u32, height as u32, FilterType::Triangle);
        let (left, top) = (rect.x0.round() as i64, rect.y0.round() as i64);
        for (x, y, pixel) in scaled.enumerate_pixels() {
            let alpha = opacity * pixel.0[3] as f32 / 255.0;
            let color = Rgb([pixel.0[0], pixel.0[1], pixel.0[2]]);
            self.blend(left + x as i64, top + y as i64, color, alpha);
        }
    }

    /// Draws `text` with its vertical centre at `y`.
    pub fn text(&mut self, text: &str, x: f64, y: f64, size: u32, color: Rgb<u8>, anchor: Anchor) {
        let size = size.max(1);
        let width = text_width(text, size) as f64;
        let left = match anchor {
            Anchor::Left => x,
            Anchor::Center => x - width / 2.0,
        }
        .round() as i64;
        let top = (y - (GLYPH_HEIGHT * size) as f64 / 2.0).round() as i64;
        let dot = size as i64;
        for (i, c) in text.chars().enumerate() {
            let origin = left + i as i64 * (GLYPH_ADVANCE * size) as i64;
            for (col, row) in lit_cells(c) {
                let cx = origin + col as i64 * dot;
                let cy = top + row as i64 * dot;
                for dy in 0..dot {
                    for dx in 0..dot {
                        self.blend(cx + dx, cy + dy, color, 1.0);
                    }
                }
            }
        }
    }

    pub fn into_png(self) -> Result<Vec<u8>, ChartError> {
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(
                self.image.as_raw(),
                self.image.width(),
                self.image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| ChartError::render(format!("png encoding failed: {e}")))?;
        Ok(bytes)
    }

    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        *self.image.get_pixel(x, y)
    }
}

fn dash_is_on(dash: Option<(f64, f64)>, distance: f64) -> bool {
    match dash {
        None => true,
        Some((on, off)) if on + off > 0.0 => distance.rem_euclid(on + off) < on,
        Some(_) => true,
    }
}

fn contains(polygon: &[(f64, f64)], x: f64, y: f64) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    #[test]
    fn fill_rect_respects_clip() {
        let mut canvas = Canvas::new(10, 10, BLACK);
        canvas.set_clip(PixelRect::new(0.0, 0.0, 5.0, 10.0));
        canvas.fill_rect(PixelRect::new(0.0, 0.0, 10.0, 10.0), WHITE, 1.0);
        assert_eq!(canvas.pixel(4, 4), WHITE);
        assert_eq!(canvas.pixel(6, 4), BLACK);
        canvas.reset_clip();
        canvas.fill_rect(PixelRect::new(6.0, 0.0, 7.0, 1.0), WHITE, 1.0);
        assert_eq!(canvas.pixel(6, 0), WHITE);
    }

    #[test]
    fn oversized_rect_only_touches_clip() {
        let mut canvas = Canvas::new(10, 10, BLACK);
        canvas.set_clip(PixelRect::new(2.0, 2.0, 8.0, 8.0));
        canvas.fill_rect(PixelRect::new(4.0, -1e12, 6.0, 1e12), WHITE, 1.0);
        assert_eq!(canvas.pixel(5, 2), WHITE);
        assert_eq!(canvas.pixel(5, 7), WHITE);
        assert_eq!(canvas.pixel(5, 1), BLACK);
        assert_eq!(canvas.pixel(5, 8), BLACK);
        assert_eq!(canvas.pixel(3, 5), BLACK);
    }

    #[test]
    fn partial_alpha_blends() {
        let mut canvas = Canvas::new(1, 1, BLACK);
        canvas.fill_rect(PixelRect::new(0.0, 0.0, 1.0, 1.0), WHITE, 0.5);
        let px = canvas.pixel(0, 0);
        assert!((127..=128).contains(&px.0[0]));
    }

    #[test]
    fn dashed_line_leaves_gaps() {
        let mut canvas = Canvas::new(40, 3, BLACK);
        let stroke = Stroke {
            color: WHITE,
            width: 1.0,
            dash: Some((4.0, 4.0)),
        };
        canvas.line((0.0, 1.0), (39.0, 1.0), &stroke);
        assert_eq!(canvas.pixel(1, 1), WHITE);
        assert_eq!(canvas.pixel(6, 1), BLACK);
        assert_eq!(canvas.pixel(9, 1), WHITE);
    }

    #[test]
    fn polygon_fills_interior_only() {
        let mut canvas = Canvas::new(10, 10, BLACK);
        canvas.fill_polygon(&[(1.0, 1.0), (9.0, 1.0), (9.0, 9.0), (1.0, 9.0)], WHITE);
        assert_eq!(canvas.pixel(5, 5), WHITE);
        assert_eq!(canvas.pixel(0, 0), BLACK);
    }

    #[test]
    fn oversized_polygon_is_bounded_by_clip() {
        let mut canvas = Canvas::new(10, 10, BLACK);
        canvas.set_clip(PixelRect::new(0.0, 0.0, 5.0, 10.0));
        canvas.fill_polygon(
            &[(-1e12, -1e12), (1e12, -1e12), (1e12, 1e12), (-1e12, 1e12)],
            WHITE,
        );
        assert_eq!(canvas.pixel(0, 0), WHITE);
        assert_eq!(canvas.pixel(4, 9), WHITE);
        assert_eq!(canvas.pixel(5, 5), BLACK);
    }

    #[test]
    fn image_opacity_is_faint() {
        let mut canvas = Canvas::new(4, 4, BLACK);
        let logo = RgbaImage::from_pixel(2, 2, image::Rgba([255, 255, 255, 255]));
        canvas.draw_image(&logo, PixelRect::new(0.0, 0.0, 4.0, 4.0), 0.08);
        let px = canvas.pixel(1, 1);
        assert!(px.0[0] > 0 && px.0[0] < 40, "got {px:?}");
    }

    #[test]
    fn text_lights_pixels_near_anchor() {
        let mut canvas = Canvas::new(30, 10, BLACK);
        canvas.text("1", 15.0, 5.0, 1, WHITE, Anchor::Center);
        let lit = (0..30)
            .flat_map(|x| (0..10).map(move |y| (x, y)))
            .filter(|&(x, y)| canvas.pixel(x, y) == WHITE)
            .count();
        assert_eq!(lit, 10);
    }

    #[test]
    fn encodes_png_signature() {
        let bytes = Canvas::new(3, 2, BLACK).into_png().unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
