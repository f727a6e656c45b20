//! Sanitizer
//!
//! Turns provider output into JSON-safe values: tables become lists of row
//! objects, series become string-keyed maps, timestamps become ISO-8601
//! strings, boxed scalars are unwrapped and NaN/Infinity become null.
//! Total: every input has an output.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike};
use serde_json::{Map, Number, Value};

use super::raw::{DataFrame, Index, NumericScalar, RawValue, Series};

/// Normalized value. Cannot hold NaN or Infinity.
pub type SanitizedValue = Value;

/// Column name given to a promoted row index that has no name.
const DEFAULT_INDEX_COLUMN: &str = "index";

const DATE_FORMAT: &str = "%Y-%m-%d";

// == Sanitize ==
/// Recursively normalizes `value`.
pub fn sanitize(value: &RawValue) -> SanitizedValue {
    match value {
        RawValue::None => Value::Null,
        RawValue::Frame(frame) => sanitize_frame(frame),
        RawValue::Series(series) => sanitize_series(series),
        RawValue::Timestamp(ts) => Value::String(format_timestamp(ts, 'T')),
        RawValue::NaiveTimestamp(ts) => Value::String(format_naive_timestamp(ts, 'T')),
        RawValue::Date(date) => Value::String(date.format(DATE_FORMAT).to_string()),
        RawValue::Scalar(scalar) => sanitize_scalar(*scalar),
        RawValue::Float(x) => float(*x),
        RawValue::Array(items) | RawValue::List(items) | RawValue::Set(items) => {
            Value::Array(items.iter().map(sanitize).collect())
        }
        RawValue::Map(pairs) => Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (key_string(k), sanitize(v)))
                .collect(),
        ),
        RawValue::Bool(b) => Value::Bool(*b),
        RawValue::Int(i) => Value::from(*i),
        RawValue::UInt(u) => Value::from(*u),
        RawValue::Str(s) => Value::String(s.clone()),
        RawValue::Other(other) => Value::String(other.to_string()),
    }
}

/// Non-finite floats have no JSON form.
fn float(x: f64) -> Value {
    Number::from_f64(x).map_or(Value::Null, Value::Number)
}

fn sanitize_scalar(scalar: NumericScalar) -> Value {
    match scalar {
        NumericScalar::Int(i) => Value::from(i),
        NumericScalar::UInt(u) => Value::from(u),
        NumericScalar::Float(x) => float(x),
        NumericScalar::Float32(x) => float(f64::from(x)),
        NumericScalar::Bool(b) => Value::Bool(b),
    }
}

// == Labels ==
/// String form of a map key, series label or column label.
///
/// Labels are rendered the way the data provider prints them (`True`,
/// `None`, `nan`, `2024-01-02 00:00:00+00:00`) rather than as JSON, so keys
/// that are distinct upstream stay distinct here.
pub fn key_string(key: &RawValue) -> String {
    match key {
        RawValue::None => "None".to_string(),
        RawValue::Bool(b) | RawValue::Scalar(NumericScalar::Bool(b)) => bool_label(*b),
        RawValue::Int(i) | RawValue::Scalar(NumericScalar::Int(i)) => i.to_string(),
        RawValue::UInt(u) | RawValue::Scalar(NumericScalar::UInt(u)) => u.to_string(),
        RawValue::Float(x) | RawValue::Scalar(NumericScalar::Float(x)) => float_label(*x),
        RawValue::Scalar(NumericScalar::Float32(x)) => float_label(f64::from(*x)),
        RawValue::Str(s) => s.clone(),
        RawValue::Timestamp(ts) => format_timestamp(ts, ' '),
        RawValue::NaiveTimestamp(ts) => format_naive_timestamp(ts, ' '),
        RawValue::Date(date) => date.format(DATE_FORMAT).to_string(),
        RawValue::Other(other) => other.to_string(),
        RawValue::Array(_)
        | RawValue::List(_)
        | RawValue::Set(_)
        | RawValue::Map(_)
        | RawValue::Series(_)
        | RawValue::Frame(_) => sanitize(key).to_string(),
    }
}

fn bool_label(b: bool) -> String {
    String::from(if b { "True" } else { "False" })
}

fn float_label(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        String::from(if x > 0.0 { "inf" } else { "-inf" })
    } else {
        // Debug keeps the trailing `.0` on whole numbers
        format!("{:?}", x)
    }
}

// == Timestamps ==
/// Six fractional digits when the time has a sub-second part, none otherwise.
fn time_format(separator: char, nanos: u32) -> String {
    if nanos % 1_000_000_000 == 0 {
        format!("{}{}%H:%M:%S", DATE_FORMAT, separator)
    } else {
        format!("{}{}%H:%M:%S%.6f", DATE_FORMAT, separator)
    }
}

fn format_timestamp(ts: &DateTime<FixedOffset>, separator: char) -> String {
    let format = time_format(separator, ts.nanosecond()) + "%:z";
    ts.format(&format).to_string()
}

fn format_naive_timestamp(ts: &NaiveDateTime, separator: char) -> String {
    ts.format(&time_format(separator, ts.nanosecond())).to_string()
}

// == Tables ==
fn sanitize_frame(frame: &DataFrame) -> Value {
    if frame.is_empty() {
        return Value::Array(Vec::new());
    }

    let columns: Vec<String> = frame.columns.iter().map(key_string).collect();
    let index_column = match &frame.index {
        Index::Range => None,
        Index::Labels { name, labels } => Some((
            name.as_deref().unwrap_or(DEFAULT_INDEX_COLUMN),
            labels,
        )),
    };

    let records = frame
        .rows
        .iter()
        .enumerate()
        .map(|(row_number, cells)| {
            let mut record = Map::new();

            if let Some((name, labels)) = index_column {
                let label = labels.get(row_number).map_or(Value::Null, sanitize);
                record.insert(name.to_string(), label);
            }

            for (position, column) in columns.iter().enumerate() {
                let cell = cells.get(position).map_or(Value::Null, sanitize);
                record.insert(column.clone(), cell);
            }

            Value::Object(record)
        })
        .collect();

    Value::Array(records)
}

fn sanitize_series(series: &Series) -> Value {
    Value::Object(
        series
            .iter()
            .map(|(idx, value)| (key_string(idx), sanitize(value)))
            .collect(),
    )
}
