//! Data-to-pixel mapping and tick placement.

use super::canvas::PixelRect;

/// Maps data coordinates into one panel's pixel rectangle. The x axis is the
/// record index, centred on each slot; y grows upwards.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub rect: PixelRect,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl Viewport {
    pub fn for_records(rect: PixelRect, records: usize, y_range: (f64, f64)) -> Self {
        Self {
            rect,
            x_range: (-0.5, records as f64 - 0.5),
            y_range,
        }
    }

    pub fn x(&self, value: f64) -> f64 {
        let (lo, hi) = self.x_range;
        self.rect.x0 + (value - lo) / (hi - lo) * self.rect.width()
    }

    pub fn y(&self, value: f64) -> f64 {
        let (lo, hi) = self.y_range;
        self.rect.y1 - (value - lo) / (hi - lo) * self.rect.height()
    }

    /// Pixel width of one record slot.
    pub fn slot_width(&self) -> f64 {
        let (lo, hi) = self.x_range;
        self.rect.width() / (hi - lo)
    }
}

/// Round-number ticks covering `[lo, hi]`, roughly `target` of them.
pub fn nice_ticks(lo: f64, hi: f64, target: usize) -> (Vec<f64>, f64) {
    let (lo, hi) = (lo.min(hi), lo.max(hi));
    if !(lo.is_finite() && hi.is_finite()) || hi <= lo || target == 0 {
        return (Vec::new(), 0.0);
    }
    let rough = (hi - lo) / target as f64;
    let magnitude = 10f64.powf(rough.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= rough)
        .unwrap_or(10.0 * magnitude);

    let first = (lo / step).ceil() * step;
    let ticks = (0..)
        .map(|i| first + i as f64 * step)
        .take_while(|v| *v <= hi + step * 1e-9)
        .take(64)
        .collect();
    (ticks, step)
}

/// Decimal places needed to tell adjacent ticks apart.
pub fn decimals_for(step: f64) -> usize {
    if step <= 0.0 || !step.is_finite() {
        return 2;
    }
    let digits = -(step.log10() + 1e-9).floor();
    let mut places = digits.max(0.0) as usize;
    // 2.5 × 10^k needs one more place than its magnitude.
    let scaled = step * 10f64.powi(places as i32);
    if (scaled - scaled.round()).abs() > 1e-6 {
        places += 1;
    }
    places.min(8)
}

pub fn format_tick(value: f64, places: usize) -> String {
    let text = format!("{value:.places$}");
    // Avoid "-0.00".
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text[1..].to_string()
    } else {
        text
    }
}

/// Evenly spaced record indices for time labels, always including the first.
pub fn label_indices(records: usize, max_labels: usize) -> Vec<usize> {
    if records == 0 || max_labels == 0 {
        return Vec::new();
    }
    let step = records.div_ceil(max_labels).max(1);
    (0..records).step_by(step).collect()
}
