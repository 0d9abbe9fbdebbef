//! Columnar time-series types

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// Scalar value carried by a data point
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataPointValue {
    /// Explicit JSON `null`
    Null,

    Boolean(bool),

    /// Integral number that fits in 64 bits
    Long(i64),

    /// Any other number
    Double(OrderedFloat<f64>),

    Text(String),
}

/// A single value at one timestamp, with its optional quality code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// The measured value
    pub value: DataPointValue,

    /// Quality code, absent unless the source row carried `<variable>_qc`.
    /// Kept as an opaque JSON value; `Some(Value::Null)` is a present null.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub qc: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Data points of one variable keyed by Unix millisecond timestamp,
/// in insertion order
pub type VariableSeries = IndexMap<i64, DataPoint>;

/// Columnar time-series: variable name -> timestamp -> data point.
///
/// Both levels keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSeriesData {
    variables: IndexMap<String, VariableSeries>,
}

impl DataPointValue {
    /// Convert a JSON scalar; arrays and objects yield `None`
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(DataPointValue::Null),
            Value::Bool(b) => Some(DataPointValue::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(v) => Some(DataPointValue::Long(v)),
                None => n.as_f64().map(|v| DataPointValue::Double(OrderedFloat(v))),
            },
            Value::String(s) => Some(DataPointValue::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Convert back to JSON. Non-finite doubles have no JSON form and become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            DataPointValue::Null => Value::Null,
            DataPointValue::Boolean(b) => Value::Bool(*b),
            DataPointValue::Long(v) => Value::Number(Number::from(*v)),
            DataPointValue::Double(v) => Number::from_f64(v.into_inner())
                .map(Value::Number)
                .unwrap_or(Value::Null),
            DataPointValue::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataPointValue::Null)
    }
}

impl From<i64> for DataPointValue {
    fn from(v: i64) -> Self {
        DataPointValue::Long(v)
    }
}

impl From<f64> for DataPointValue {
    fn from(v: f64) -> Self {
        DataPointValue::Double(OrderedFloat(v))
    }
}

impl From<bool> for DataPointValue {
    fn from(v: bool) -> Self {
        DataPointValue::Boolean(v)
    }
}

impl From<&str> for DataPointValue {
    fn from(v: &str) -> Self {
        DataPointValue::Text(v.to_string())
    }
}

impl From<String> for DataPointValue {
    fn from(v: String) -> Self {
        DataPointValue::Text(v)
    }
}

impl DataPoint {
    /// Create a data point without a quality code
    pub fn new<V: Into<DataPointValue>>(value: V) -> Self {
        Self {
            value: value.into(),
            qc: None,
        }
    }

    /// Create a data point holding `null`
    pub fn null() -> Self {
        Self {
            value: DataPointValue::Null,
            qc: None,
        }
    }

    /// Attach a quality code
    pub fn with_qc<Q: Into<Value>>(mut self, qc: Q) -> Self {
        self.qc = Some(qc.into());
        self
    }
}

impl TimeSeriesData {
    /// Create an empty data set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a data point, replacing any existing point for the same
    /// variable and timestamp in place
    pub fn insert<S: Into<String>>(&mut self, variable: S, timestamp_ms: i64, point: DataPoint) {
        self.series_mut(variable).insert(timestamp_ms, point);
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_point<S: Into<String>>(
        mut self,
        variable: S,
        timestamp_ms: i64,
        point: DataPoint,
    ) -> Self {
        self.insert(variable, timestamp_ms, point);
        self
    }

    /// Series for a variable, created empty on first use
    pub fn series_mut<S: Into<String>>(&mut self, variable: S) -> &mut VariableSeries {
        self.variables.entry(variable.into()).or_default()
    }

    pub fn series(&self, variable: &str) -> Option<&VariableSeries> {
        self.variables.get(variable)
    }

    /// Look up a single data point
    pub fn get(&self, variable: &str, timestamp_ms: i64) -> Option<&DataPoint> {
        self.variables
            .get(variable)
            .and_then(|series| series.get(&timestamp_ms))
    }

    /// Iterate variables in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariableSeries)> {
        self.variables.iter()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Total number of data points across all variables
    pub fn point_count(&self) -> usize {
        self.variables.values().map(IndexMap::len).sum()
    }

    /// True when no variable is present
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Union another data set into this one. A point for a variable and
    /// timestamp already present is overwritten and keeps its position.
    pub fn merge(&mut self, other: TimeSeriesData) {
        for (variable, series) in other.variables {
            self.series_mut(variable).extend(series);
        }
    }
}
