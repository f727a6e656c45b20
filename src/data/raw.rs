//! Raw Provider Values
//!
//! The shapes a market data provider hands back before normalization:
//! tables, indexed series, boxed numeric scalars, timestamps, sets and
//! plain nested collections.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

// == Numeric Scalar ==
/// Boxed scalar as produced by a numeric array library.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericScalar {
    Int(i64),
    UInt(u64),
    Float(f64),
    Float32(f32),
    Bool(bool),
}

// == Series ==
/// One column of values keyed by an index.
#[derive(Debug, Clone, Default)]
pub struct Series {
    pub name: Option<String>,
    pub index: Vec<RawValue>,
    pub values: Vec<RawValue>,
}

impl Series {
    /// Pairs `index[i]` with `values[i]`; extra entries on either side are ignored.
    pub fn new(index: Vec<RawValue>, values: Vec<RawValue>) -> Self {
        Self {
            name: None,
            index,
            values,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.index.len().min(self.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RawValue, &RawValue)> {
        self.index.iter().zip(self.values.iter())
    }
}

// == Row Index ==
/// Row labels of a table.
#[derive(Debug, Clone, Default)]
pub enum Index {
    /// Implicit 0..n positions; dropped on normalization
    #[default]
    Range,
    /// Explicit labels, promoted to a leading column on normalization
    Labels {
        name: Option<String>,
        labels: Vec<RawValue>,
    },
}

// == Data Frame ==
/// Rows by named columns.
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    pub columns: Vec<RawValue>,
    pub index: Index,
    pub rows: Vec<Vec<RawValue>>,
}

impl DataFrame {
    /// Creates an empty table with the given column labels.
    pub fn new<C: Into<RawValue>>(columns: impl IntoIterator<Item = C>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            index: Index::Range,
            rows: Vec::new(),
        }
    }

    /// Replaces the row index with explicit labels.
    pub fn with_index(mut self, name: Option<&str>, labels: Vec<RawValue>) -> Self {
        self.index = Index::Labels {
            name: name.map(str::to_string),
            labels,
        };
        self
    }

    /// Appends a row. Short rows read as missing cells.
    pub fn row(mut self, cells: Vec<RawValue>) -> Self {
        self.rows.push(cells);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }
}

// == Raw Value ==
/// Any value a wrapped data operation may produce.
#[derive(Clone)]
pub enum RawValue {
    None,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Timestamp(DateTime<FixedOffset>),
    NaiveTimestamp(NaiveDateTime),
    Date(NaiveDate),
    Scalar(NumericScalar),
    /// Homogeneous numeric-library array
    Array(Vec<RawValue>),
    List(Vec<RawValue>),
    /// Unordered collection; iteration order is insertion order
    Set(Vec<RawValue>),
    Map(Vec<(RawValue, RawValue)>),
    Series(Series),
    Frame(DataFrame),
    /// Anything else, rendered through `Display`
    Other(Arc<dyn fmt::Display + Send + Sync>),
}

impl RawValue {
    /// Builds a map from string keys.
    pub fn map<K: Into<String>, V: Into<RawValue>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        RawValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (RawValue::Str(k.into()), v.into()))
                .collect(),
        )
    }

    pub fn list<V: Into<RawValue>>(items: impl IntoIterator<Item = V>) -> Self {
        RawValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn other<T: fmt::Display + Send + Sync + 'static>(value: T) -> Self {
        RawValue::Other(Arc::new(value))
    }
}

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::None => f.write_str("None"),
            RawValue::Bool(b) => write!(f, "Bool({b})"),
            RawValue::Int(i) => write!(f, "Int({i})"),
            RawValue::UInt(u) => write!(f, "UInt({u})"),
            RawValue::Float(x) => write!(f, "Float({x})"),
            RawValue::Str(s) => write!(f, "Str({s:?})"),
            RawValue::Timestamp(t) => write!(f, "Timestamp({t})"),
            RawValue::NaiveTimestamp(t) => write!(f, "NaiveTimestamp({t})"),
            RawValue::Date(d) => write!(f, "Date({d})"),
            RawValue::Scalar(s) => write!(f, "Scalar({s:?})"),
            RawValue::Array(items) => f.debug_tuple("Array").field(items).finish(),
            RawValue::List(items) => f.debug_tuple("List").field(items).finish(),
            RawValue::Set(items) => f.debug_tuple("Set").field(items).finish(),
            RawValue::Map(pairs) => f.debug_tuple("Map").field(pairs).finish(),
            RawValue::Series(s) => f.debug_tuple("Series").field(s).finish(),
            RawValue::Frame(df) => f.debug_tuple("Frame").field(df).finish(),
            RawValue::Other(v) => write!(f, "Other({v})"),
        }
    }
}

// == Conversions ==
impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Int(value.into())
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Int(value)
    }
}

impl From<u64> for RawValue {
    fn from(value: u64) -> Self {
        RawValue::UInt(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Str(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Str(value)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(value: DateTime<Utc>) -> Self {
        RawValue::Timestamp(value.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for RawValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        RawValue::Timestamp(value)
    }
}

impl From<NaiveDateTime> for RawValue {
    fn from(value: NaiveDateTime) -> Self {
        RawValue::NaiveTimestamp(value)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(value: NaiveDate) -> Self {
        RawValue::Date(value)
    }
}

impl From<NumericScalar> for RawValue {
    fn from(value: NumericScalar) -> Self {
        RawValue::Scalar(value)
    }
}

impl From<Series> for RawValue {
    fn from(value: Series) -> Self {
        RawValue::Series(value)
    }
}

impl From<DataFrame> for RawValue {
    fn from(value: DataFrame) -> Self {
        RawValue::Frame(value)
    }
}

impl From<Vec<RawValue>> for RawValue {
    fn from(value: Vec<RawValue>) -> Self {
        RawValue::List(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawValue::None, Into::into)
    }
}

/// Lifts already-normalized JSON back into the raw model.
impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::None,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    RawValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    RawValue::UInt(u)
                } else {
                    RawValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => RawValue::Str(s),
            Value::Array(items) => RawValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => RawValue::Map(
                map.into_iter()
                    .map(|(k, v)| (RawValue::Str(k), v.into()))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_series_length_uses_shorter_side() {
        let series = Series::new(vec!["a".into(), "b".into()], vec![1.into()]);
        assert_eq!(series.len(), 1);
        assert!(!series.is_empty());
        assert!(Series::default().is_empty());
    }

    #[test]
    fn test_frame_emptiness() {
        assert!(DataFrame::new(["Open", "Close"]).is_empty());
        assert!(DataFrame::new(Vec::<&str>::new()).row(vec![]).is_empty());
        assert!(!DataFrame::new(["Open"]).row(vec![1.0.into()]).is_empty());
    }

    #[test]
    fn test_from_json_keeps_number_kinds() {
        let raw = RawValue::from(json!([1, -2, 18446744073709551615u64, 1.5]));
        let RawValue::List(items) = raw else {
            panic!("expected list");
        };
        assert!(matches!(items[0], RawValue::Int(1)));
        assert!(matches!(items[1], RawValue::Int(-2)));
        assert!(matches!(items[2], RawValue::UInt(u64::MAX)));
        assert!(matches!(items[3], RawValue::Float(x) if x == 1.5));
    }

    #[test]
    fn test_option_conversion() {
        assert!(matches!(RawValue::from(None::<i64>), RawValue::None));
        assert!(matches!(RawValue::from(Some("x")), RawValue::Str(ref s) if s == "x"));
    }
}
