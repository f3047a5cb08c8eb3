//! Input normalization: loosely structured JSON payload to [`TimeSeriesTable`].
//!
//! Field names are resolved through a fixed alias table. For each logical field
//! the aliases are tried in order, an exact key match before a case-insensitive
//! one, and the first hit wins.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::domain::error::ChartError;
use crate::domain::indicator::{BandParams, IndicatorRequest, OscillatorParams};
use crate::domain::ohlcv::{BatchMetadata, OhlcvRecord, TimeSeriesTable};

/// Keys under which a wrapping object may carry the record array.
pub const SERIES_KEYS: &[&str] = &["candles", "ohlc"];

/// Epoch numbers above this are taken to be milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Timestamp,
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Timestamp => "timestamp",
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Timestamp => &["timestamp", "time"],
            Field::Open => &["open"],
            Field::High => &["high"],
            Field::Low => &["low"],
            Field::Close => &["close"],
            Field::Volume => &["volume"],
        }
    }
}

/// A normalized request: the table plus the caller's rendering parameters.
#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub table: TimeSeriesTable,
    pub indicators: IndicatorRequest,
    pub timeframe: Option<String>,
    pub strict: bool,
}

/// Looks `aliases` up in `object`, exact match first, then ignoring ASCII case.
pub fn resolve_key<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    for alias in aliases {
        if let Some(value) = object.get(*alias) {
            return Some(value);
        }
        if let Some((_, value)) = object.iter().find(|(k, _)| k.eq_ignore_ascii_case(alias)) {
            return Some(value);
        }
    }
    None
}

fn resolve_present<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    resolve_key(object, aliases).filter(|v| !v.is_null())
}

/// Parses the full payload: records, indicator toggles, timeframe, strict flag.
pub fn parse_request(payload: &Value) -> Result<ChartRequest, ChartError> {
    let table = normalize(payload)?;

    let (indicators, timeframe, strict) = match payload.as_object() {
        Some(object) => (
            parse_indicators(resolve_key(object, &["indicators"]))?,
            resolve_present(object, &["timeframe"]).and_then(value_to_label),
            resolve_present(object, &["strict"]).is_some_and(is_truthy),
        ),
        None => (IndicatorRequest::default(), None, false),
    };

    Ok(ChartRequest {
        table,
        indicators,
        timeframe,
        strict,
    })
}

/// Extracts and validates the record array into a [`TimeSeriesTable`].
pub fn normalize(payload: &Value) -> Result<TimeSeriesTable, ChartError> {
    let wrapper = payload.as_object();
    let rows = match wrapper {
        Some(object) => resolve_key(object, SERIES_KEYS).unwrap_or(payload),
        None => payload,
    };

    let rows = match rows.as_array() {
        Some(rows) if !rows.is_empty() => rows,
        _ => return Err(ChartError::payload_shape("empty or non-array payload")),
    };

    tracing::info!(entries = rows.len(), "received payload");

    let mut records = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;
    for (i, row) in rows.iter().enumerate() {
        let object = row.as_object().ok_or_else(|| {
            ChartError::payload_shape(format!("record {i} is not an object"))
        })?;
        match parse_record(object)? {
            Some(record) => records.push(record),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::warn!(dropped, "dropped records with unparseable timestamps");
    }
    if records.is_empty() {
        return Err(ChartError::payload_shape(
            "no records with a parseable timestamp",
        ));
    }

    let metadata = collect_metadata(wrapper, rows);
    TimeSeriesTable::new(records, metadata)
}

/// `Ok(None)` when the timestamp is present but cannot be parsed.
fn parse_record(object: &Map<String, Value>) -> Result<Option<OhlcvRecord>, ChartError> {
    let required = |field: Field| {
        resolve_present(object, field.aliases()).ok_or_else(|| ChartError::MissingField {
            field: field.name().to_string(),
        })
    };

    // Presence is checked for every field before any value is parsed.
    let ts = required(Field::Timestamp)?;
    let open = required(Field::Open)?;
    let high = required(Field::High)?;
    let low = required(Field::Low)?;
    let close = required(Field::Close)?;
    let volume = required(Field::Volume)?;

    let open = parse_number(open, Field::Open)?;
    let high = parse_number(high, Field::High)?;
    let low = parse_number(low, Field::Low)?;
    let close = parse_number(close, Field::Close)?;
    let volume = parse_number(volume, Field::Volume)?;

    Ok(parse_timestamp(ts).map(|timestamp| OhlcvRecord {
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    }))
}

fn parse_number(value: &Value, field: Field) -> Result<f64, ChartError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| ChartError::InvalidField {
            field: field.name().to_string(),
            reason: format!("expected a finite number, got {value}"),
        })
}

/// Parses RFC 3339, a handful of naive date/time layouts, or epoch seconds/millis.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(epoch) = s.parse::<f64>() {
        return from_epoch(epoch);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn from_epoch(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() {
        return None;
    }
    let millis = if epoch.abs() > EPOCH_MILLIS_THRESHOLD {
        epoch
    } else {
        epoch * 1000.0
    };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

/// Top-level values win; otherwise the first record carrying the field.
fn collect_metadata(wrapper: Option<&Map<String, Value>>, rows: &[Value]) -> BatchMetadata {
    let lookup = |key: &str| -> Option<&Value> {
        wrapper
            .and_then(|w| resolve_present(w, &[key]))
            .or_else(|| {
                rows.iter()
                    .filter_map(Value::as_object)
                    .find_map(|r| resolve_present(r, &[key]))
            })
    };

    BatchMetadata {
        symbol: lookup("symbol").and_then(value_to_label),
        support: lookup("support").map(parse_levels).unwrap_or_default(),
        highlight_patterns: lookup("highlight_patterns").is_some_and(is_truthy),
    }
}

fn parse_levels(value: &Value) -> Vec<f64> {
    let as_level = |v: &Value| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(as_level)
            .filter(|v| v.is_finite())
            .collect(),
        other => as_level(other).filter(|v| v.is_finite()).into_iter().collect(),
    }
}

fn value_to_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

fn parse_indicators(value: Option<&Value>) -> Result<IndicatorRequest, ChartError> {
    let Some(value) = value else {
        return Ok(IndicatorRequest::default());
    };
    let object = match value {
        Value::Null => return Ok(IndicatorRequest::default()),
        Value::Object(object) => object,
        other => {
            return Err(ChartError::InvalidField {
                field: "indicators".into(),
                reason: format!("expected an object, got {other}"),
            });
        }
    };

    Ok(IndicatorRequest {
        bands: parse_toggle::<BandParams>(resolve_key(object, &["bands"]), "indicators.bands")?,
        oscillator: parse_toggle::<OscillatorParams>(
            resolve_key(object, &["oscillator"]),
            "indicators.oscillator",
        )?,
    })
}

/// Absent or `false` disables, `true` enables with defaults, an object overrides them.
fn parse_toggle<T>(value: Option<&Value>, field: &str) -> Result<Option<T>, ChartError>
where
    T: DeserializeOwned + Default,
{
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Bool(true)) => Ok(Some(T::default())),
        Some(other) => serde_json::from_value(other.clone())
            .map(Some)
            .map_err(|e| ChartError::InvalidField {
                field: field.to_string(),
                reason: e.to_string(),
            }),
    }
}
