//! Layer composition: table, indicators and annotations to a [`ChartSpec`].
//!
//! Stack order, bottom to top: watermark, candles, band lines, support levels,
//! annotation markers. The oscillator, when present, lives in its own panel
//! below the primary one and shares the time axis.
//!
//! The watermark is placed in data coordinates so it scales with the content.
//! Optional layers that cannot be placed are logged and skipped; only the
//! candle layer is mandatory.

use std::sync::Arc;

use image::RgbaImage;

use crate::domain::error::ChartError;
use crate::domain::indicator::{ComputedIndicators, IndicatorSeries, IndicatorValue};
use crate::domain::layer::{
    BarLayer, Candle, CandleLayer, ChartSpec, Color, DataExtent, LineGeometry, LineLayer,
    LineStyle, MarkerLayer, Panel, PanelSpec, VisualLayer, WatermarkLayer,
};
use crate::domain::ohlcv::TimeSeriesTable;
use crate::domain::pattern::AnnotationPoint;

pub const DEFAULT_SYMBOL: &str = "Crypto";
pub const DEFAULT_TIMEFRAME: &str = "4H";
pub const DEFAULT_WATERMARK_OPACITY: f32 = 0.08;
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

const PRIMARY_HEIGHT_RATIO: f64 = 0.7;
const RANGE_PADDING: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub default_symbol: String,
    pub default_timeframe: String,
    pub timeframe: Option<String>,
    pub watermark: Option<Arc<RgbaImage>>,
    pub watermark_opacity: f32,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            default_symbol: DEFAULT_SYMBOL.to_string(),
            default_timeframe: DEFAULT_TIMEFRAME.to_string(),
            timeframe: None,
            watermark: None,
            watermark_opacity: DEFAULT_WATERMARK_OPACITY,
        }
    }
}

/// "<symbol> - <timeframe> Chart", falling back to the configured defaults.
pub fn chart_title(symbol: Option<&str>, timeframe: Option<&str>, options: &ComposeOptions) -> String {
    let symbol = symbol
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(options.default_symbol.as_str());
    let timeframe = timeframe
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(options.default_timeframe.as_str());
    format!("{symbol} - {timeframe} Chart")
}

pub fn compose(
    table: TimeSeriesTable,
    indicators: &ComputedIndicators,
    annotations: &[AnnotationPoint],
    options: &ComposeOptions,
) -> Result<ChartSpec, ChartError> {
    let candle_layer = build_candle_layer(&table)?;

    let band_lines = indicators
        .bands
        .as_ref()
        .map(band_layers)
        .unwrap_or_default();
    let support_lines = support_layers(&table.metadata().support);
    let markers = marker_layer(&table, annotations);

    let primary_range = padded(primary_range(&table, &band_lines, &support_lines, markers.as_ref()));
    let oscillator = indicators.oscillator.as_ref().map(oscillator_layers);

    let mut layers = Vec::new();
    if let Some(watermark) = watermark_layer(&table, primary_range, options) {
        layers.push(VisualLayer::Watermark(watermark));
    }
    layers.push(VisualLayer::Candle(candle_layer));
    layers.extend(band_lines.into_iter().map(VisualLayer::Line));
    layers.extend(support_lines.into_iter().map(VisualLayer::Line));
    if let Some(markers) = markers {
        layers.push(VisualLayer::Marker(markers));
    }

    let mut panels = Vec::with_capacity(2);
    match oscillator {
        Some((osc_layers, osc_range)) => {
            panels.push(PanelSpec {
                panel: Panel::Primary,
                y_label: "Price".into(),
                y_range: primary_range,
                height_ratio: PRIMARY_HEIGHT_RATIO,
            });
            panels.push(PanelSpec {
                panel: Panel::Oscillator,
                y_label: "MACD".into(),
                y_range: padded(osc_range),
                height_ratio: 1.0 - PRIMARY_HEIGHT_RATIO,
            });
            layers.extend(osc_layers);
        }
        None => panels.push(PanelSpec {
            panel: Panel::Primary,
            y_label: "Price".into(),
            y_range: primary_range,
            height_ratio: 1.0,
        }),
    }

    let title = chart_title(
        table.metadata().symbol.as_deref(),
        options.timeframe.as_deref(),
        options,
    );
    tracing::debug!(layers = layers.len(), panels = panels.len(), %title, "composed chart");

    Ok(ChartSpec {
        table,
        layers,
        panels,
        title,
        datetime_format: DATETIME_FORMAT.to_string(),
    })
}

fn build_candle_layer(table: &TimeSeriesTable) -> Result<CandleLayer, ChartError> {
    if table.is_empty() {
        return Err(ChartError::render("no candles to draw"));
    }
    let candles = table
        .records()
        .iter()
        .enumerate()
        .map(|(index, r)| {
            if !r.is_finite() {
                return Err(ChartError::render(format!(
                    "candle at {} has non-finite values",
                    r.timestamp
                )));
            }
            Ok(Candle {
                index,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CandleLayer {
        candles,
        up_color: Color::GREEN,
        down_color: Color::RED,
    })
}

fn band_layers(series: &IndicatorSeries) -> Vec<LineLayer> {
    let pick = |f: fn(f64, f64, f64) -> f64| -> Vec<Option<f64>> {
        series
            .values
            .iter()
            .map(|p| match p.value {
                Some(IndicatorValue::Bands {
                    upper,
                    middle,
                    lower,
                }) => Some(f(upper, middle, lower)),
                _ => None,
            })
            .collect()
    };

    let line = |label: &str, values, style| LineLayer {
        label: format!("{} {}", series.indicator_type, label),
        panel: Panel::Primary,
        geometry: LineGeometry::Series(values),
        color: Color::BLUE,
        style,
        width: 1.5,
    };

    vec![
        line("upper", pick(|u, _, _| u), LineStyle::Dashed),
        line("middle", pick(|_, m, _| m), LineStyle::Dotted),
        line("lower", pick(|_, _, l| l), LineStyle::Dashed),
    ]
}

fn support_layers(levels: &[f64]) -> Vec<LineLayer> {
    levels
        .iter()
        .filter(|l| l.is_finite())
        .map(|&level| LineLayer {
            label: format!("support {level}"),
            panel: Panel::Primary,
            geometry: LineGeometry::Horizontal(level),
            color: Color::RED,
            style: LineStyle::Solid,
            width: 1.0,
        })
        .collect()
}

fn marker_layer(table: &TimeSeriesTable, annotations: &[AnnotationPoint]) -> Option<MarkerLayer> {
    let (placeable, dropped): (Vec<_>, Vec<_>) = annotations
        .iter()
        .cloned()
        .partition(|a| a.price.is_finite() && a.index < table.len());
    if !dropped.is_empty() {
        tracing::warn!(dropped = dropped.len(), "skipping annotations outside the chart");
    }
    (!placeable.is_empty()).then_some(MarkerLayer { markers: placeable })
}

/// Histogram, MACD line, signal line and zero line, plus their value range.
fn oscillator_layers(series: &IndicatorSeries) -> (Vec<VisualLayer>, (f64, f64)) {
    let mut line = Vec::with_capacity(series.values.len());
    let mut signal = Vec::with_capacity(series.values.len());
    let mut histogram = Vec::with_capacity(series.values.len());
    for point in &series.values {
        match point.value {
            Some(IndicatorValue::Macd {
                line: l,
                signal: s,
                histogram: h,
            }) => {
                line.push(Some(l));
                signal.push(Some(s));
                histogram.push(Some(h));
            }
            _ => {
                line.push(None);
                signal.push(None);
                histogram.push(None);
            }
        }
    }

    let range = line
        .iter()
        .chain(&signal)
        .chain(&histogram)
        .flatten()
        .fold((0.0_f64, 0.0_f64), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let label = series.indicator_type.to_string();
    let layers = vec![
        VisualLayer::Bar(BarLayer {
            label: format!("{label} histogram"),
            panel: Panel::Oscillator,
            values: histogram,
            positive_color: Color::GREEN,
            negative_color: Color::RED,
        }),
        VisualLayer::Line(LineLayer {
            label: format!("{label} zero"),
            panel: Panel::Oscillator,
            geometry: LineGeometry::Horizontal(0.0),
            color: Color::GRAY,
            style: LineStyle::Solid,
            width: 1.0,
        }),
        VisualLayer::Line(LineLayer {
            label: format!("{label} line"),
            panel: Panel::Oscillator,
            geometry: LineGeometry::Series(line),
            color: Color::BLUE,
            style: LineStyle::Solid,
            width: 1.5,
        }),
        VisualLayer::Line(LineLayer {
            label: format!("{label} signal"),
            panel: Panel::Oscillator,
            geometry: LineGeometry::Series(signal),
            color: Color::ORANGE,
            style: LineStyle::Solid,
            width: 1.5,
        }),
    ];
    (layers, range)
}

fn primary_range(
    table: &TimeSeriesTable,
    bands: &[LineLayer],
    support: &[LineLayer],
    markers: Option<&MarkerLayer>,
) -> (f64, f64) {
    let mut range = table.price_range();
    let mut include = |v: f64| {
        if v.is_finite() {
            range.0 = range.0.min(v);
            range.1 = range.1.max(v);
        }
    };
    for layer in bands.iter().chain(support) {
        match &layer.geometry {
            LineGeometry::Series(values) => values.iter().flatten().for_each(|&v| include(v)),
            LineGeometry::Horizontal(level) => include(*level),
        }
    }
    if let Some(markers) = markers {
        markers.markers.iter().for_each(|m| include(m.price));
    }
    range
}

/// Widens `range` by a margin on both sides; a flat range gets a fixed margin.
fn padded((lo, hi): (f64, f64)) -> (f64, f64) {
    let span = hi - lo;
    if span > 0.0 {
        (lo - span * RANGE_PADDING, hi + span * RANGE_PADDING)
    } else {
        let margin = if lo.abs() > 0.0 { lo.abs() * 0.01 } else { 1.0 };
        (lo - margin, hi + margin)
    }
}

fn watermark_layer(
    table: &TimeSeriesTable,
    (y_min, y_max): (f64, f64),
    options: &ComposeOptions,
) -> Option<WatermarkLayer> {
    let image = options.watermark.as_ref()?;

    if image.width() == 0 || image.height() == 0 {
        tracing::warn!("watermark image is empty, skipping");
        return None;
    }
    if !(options.watermark_opacity > 0.0 && options.watermark_opacity <= 1.0) {
        tracing::warn!(
            opacity = options.watermark_opacity,
            "watermark opacity out of range, skipping"
        );
        return None;
    }

    let extent = DataExtent {
        x_min: -0.5,
        x_max: table.len() as f64 - 0.5,
        y_min,
        y_max,
    };
    if !extent.is_valid() {
        tracing::warn!(?extent, "watermark extent is degenerate, skipping");
        return None;
    }

    Some(WatermarkLayer {
        image: Arc::clone(image),
        opacity: options.watermark_opacity,
        extent,
    })
}
