//! Filter input values and bound SQL parameters.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::{SqlError, SqlResult};

/// Textual form dates take once bound (SQLite has no native date type).
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A node of a caller-supplied filter document.
///
/// Object entries keep their insertion order; clause order in the compiled
/// SQL follows it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum FilterValue {
    /// Value not supplied. Plain fields holding it are dropped.
    Undefined,
    /// NULL
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Integer above `i64::MAX`. SQLite cannot store it, so it never binds.
    BigInt(u64),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// Local date-time
    Date(NaiveDateTime),
    /// Raw binary payload (never bound through a filter)
    Bytes(Vec<u8>),
    /// Array of values
    Array(Vec<FilterValue>),
    /// Ordered key/value mapping
    Object(Vec<(String, FilterValue)>),
}

impl FilterValue {
    /// Build an object from key/value pairs, keeping their order.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<FilterValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        FilterValue::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FilterValue::Undefined => "undefined",
            FilterValue::Null => "null",
            FilterValue::Bool(_) => "boolean",
            FilterValue::Int(_) | FilterValue::BigInt(_) | FilterValue::Float(_) => "number",
            FilterValue::String(_) => "string",
            FilterValue::Date(_) => "date",
            FilterValue::Bytes(_) => "binary",
            FilterValue::Array(_) => "array",
            FilterValue::Object(_) => "object",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, FilterValue::Undefined)
    }

    /// `null` and `undefined` both mean "no value".
    pub fn is_nullish(&self) -> bool {
        matches!(self, FilterValue::Undefined | FilterValue::Null)
    }

    pub fn as_object(&self) -> Option<&[(String, FilterValue)]> {
        match self {
            FilterValue::Object(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FilterValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for FilterValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FilterValue::Null,
            serde_json::Value::Bool(b) => FilterValue::Bool(b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => FilterValue::Int(i),
                (None, Some(u)) => FilterValue::BigInt(u),
                (None, None) => FilterValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => FilterValue::String(s),
            serde_json::Value::Array(items) => {
                FilterValue::Array(items.into_iter().map(FilterValue::from).collect())
            }
            serde_json::Value::Object(map) => FilterValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, FilterValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        FilterValue::Int(n as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Int(n)
    }
}

impl From<u32> for FilterValue {
    fn from(n: u32) -> Self {
        FilterValue::Int(n as i64)
    }
}

impl From<u64> for FilterValue {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(i) => FilterValue::Int(i),
            Err(_) => FilterValue::BigInt(n),
        }
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Float(n)
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::String(s)
    }
}

impl From<NaiveDateTime> for FilterValue {
    fn from(dt: NaiveDateTime) -> Self {
        FilterValue::Date(dt)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for FilterValue {
    fn from(dt: DateTime<Tz>) -> Self {
        FilterValue::Date(dt.with_timezone(&Local).naive_local())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => FilterValue::Undefined,
        }
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(items: Vec<T>) -> Self {
        FilterValue::Array(items.into_iter().map(Into::into).collect())
    }
}

/// A parameter bound positionally to a `?` placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Integer(n) => write!(f, "{}", n),
            SqlValue::Real(n) => write!(f, "{}", n),
            SqlValue::Text(s) => write!(f, "'{}'", s),
            SqlValue::Blob(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Integer(n)
    }
}

impl From<i32> for SqlValue {
    fn from(n: i32) -> Self {
        SqlValue::Integer(n as i64)
    }
}

impl From<f64> for SqlValue {
    fn from(n: f64) -> Self {
        SqlValue::Real(n)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}

/// Turn a scalar into the parameter bound for its placeholder.
///
/// Dates become `YYYY-MM-DD HH:MM:SS` text and `undefined` collapses into
/// NULL. Binary data is refused: blobs must be bound on purpose through
/// [`SqlValue::Blob`], never slipped in as a filter operand.
pub fn coerce_value(value: &FilterValue) -> SqlResult<SqlValue> {
    match value {
        FilterValue::Undefined | FilterValue::Null => Ok(SqlValue::Null),
        FilterValue::Bool(b) => Ok(SqlValue::Bool(*b)),
        FilterValue::Int(n) => Ok(SqlValue::Integer(*n)),
        FilterValue::BigInt(n) => Err(SqlError::UnsupportedValue(format!(
            "integer {} out of 64-bit signed range",
            n
        ))),
        FilterValue::Float(n) if n.is_finite() => Ok(SqlValue::Real(*n)),
        FilterValue::Float(n) => Err(SqlError::UnsupportedValue(format!(
            "non-finite number {}",
            n
        ))),
        FilterValue::String(s) => Ok(SqlValue::Text(s.clone())),
        FilterValue::Date(dt) => Ok(SqlValue::Text(dt.format(DATE_FORMAT).to_string())),
        FilterValue::Bytes(_) => Err(SqlError::BinaryNotAllowed),
        FilterValue::Array(_) | FilterValue::Object(_) => Err(SqlError::UnsupportedValue(
            format!("{} in scalar position", value.type_name()),
        )),
    }
}
