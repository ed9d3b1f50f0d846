use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{to_value, Value};

use crate::buffer::{Chunk, SafeString};
use crate::errors::{Error, Result};
use crate::part::ValuePart;

/// The locals of a scope (and the data of a part): an insertion-ordered
/// mapping of names to values. Order does not affect equality but it does
/// pick the primary value of a [`ValuePart`].
pub type Locals = IndexMap<String, ScopeValue>;

/// Any value a template can see: a local, a part's data entry, the result
/// of a context call or of rendering a partial.
#[derive(Clone, Debug, PartialEq)]
pub enum ScopeValue {
    /// Plain data, escaped when written to output
    Json(Value),
    /// Pre-escaped markup, typically rendered partial output
    Safe(SafeString),
    /// A wrapped value with template-directed dispatch
    Part(ValuePart),
    /// A collection that may mix data and parts
    List(Vec<ScopeValue>),
    /// Nested locals
    Map(Locals),
}

impl ScopeValue {
    /// Builds a value from anything serde can serialize.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<ScopeValue> {
        Ok(ScopeValue::Json(to_value(value)?))
    }

    /// Ruby truthiness: only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, ScopeValue::Json(Value::Null) | ScopeValue::Json(Value::Bool(false)))
    }

    /// The unescaped string form of the value, the way `to_s` would print
    /// it: strings verbatim, `nil` empty, collections as JSON.
    pub fn to_plain(&self) -> String {
        match self {
            ScopeValue::Json(Value::String(s)) => s.clone(),
            ScopeValue::Json(Value::Null) => String::new(),
            ScopeValue::Json(v) => v.to_string(),
            ScopeValue::Safe(s) => s.as_str().to_string(),
            ScopeValue::Part(p) => p.to_string(),
            ScopeValue::List(_) | ScopeValue::Map(_) => self.to_json_value().to_string(),
        }
    }

    /// Best-effort JSON form; parts collapse to their primary value's
    /// string form.
    pub fn to_json_value(&self) -> Value {
        match self {
            ScopeValue::Json(v) => v.clone(),
            ScopeValue::Safe(s) => Value::String(s.as_str().to_string()),
            ScopeValue::Part(p) => Value::String(p.to_string()),
            ScopeValue::List(items) => {
                Value::Array(items.iter().map(|i| i.to_json_value()).collect())
            }
            ScopeValue::Map(map) => Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json_value())).collect(),
            ),
        }
    }

    /// Tags the value for the escaping buffer: safe values stay safe,
    /// everything else is escaped on append.
    pub fn to_chunk(&self) -> Chunk {
        match self {
            ScopeValue::Safe(s) => Chunk::Safe(s.clone()),
            other => Chunk::Text(other.to_plain()),
        }
    }

    /// The items yielded when iterating this value.
    pub fn iter_items(&self) -> Result<Vec<ScopeValue>> {
        match self {
            ScopeValue::Json(Value::Array(items)) => {
                Ok(items.iter().cloned().map(ScopeValue::Json).collect())
            }
            ScopeValue::List(items) => Ok(items.clone()),
            ScopeValue::Part(p) => p.iter(),
            other => Err(Error::not_iterable(other.to_plain())),
        }
    }
}

impl From<Value> for ScopeValue {
    fn from(v: Value) -> Self {
        ScopeValue::Json(v)
    }
}

impl From<&str> for ScopeValue {
    fn from(v: &str) -> Self {
        ScopeValue::Json(Value::String(v.to_string()))
    }
}

impl From<String> for ScopeValue {
    fn from(v: String) -> Self {
        ScopeValue::Json(Value::String(v))
    }
}

impl From<i64> for ScopeValue {
    fn from(v: i64) -> Self {
        ScopeValue::Json(Value::from(v))
    }
}

impl From<f64> for ScopeValue {
    fn from(v: f64) -> Self {
        ScopeValue::Json(Value::from(v))
    }
}

impl From<bool> for ScopeValue {
    fn from(v: bool) -> Self {
        ScopeValue::Json(Value::Bool(v))
    }
}

impl From<SafeString> for ScopeValue {
    fn from(v: SafeString) -> Self {
        ScopeValue::Safe(v)
    }
}

impl From<ValuePart> for ScopeValue {
    fn from(v: ValuePart) -> Self {
        ScopeValue::Part(v)
    }
}

impl From<Vec<ScopeValue>> for ScopeValue {
    fn from(v: Vec<ScopeValue>) -> Self {
        ScopeValue::List(v)
    }
}

impl From<Locals> for ScopeValue {
    fn from(v: Locals) -> Self {
        ScopeValue::Map(v)
    }
}

/// Builds [`Locals`] from `name => value` pairs, converting each value
/// with `ScopeValue::from`.
///
/// ```
/// use vellum::locals;
///
/// let locals = locals! { name => "Jane", admin => true };
/// assert_eq!(locals.len(), 2);
/// ```
#[macro_export]
macro_rules! locals {
    () => { $crate::Locals::new() };
    ($($key:ident => $value:expr),+ $(,)?) => {{
        let mut locals = $crate::Locals::new();
        $(locals.insert(stringify!($key).to_string(), $crate::ScopeValue::from($value));)+
        locals
    }};
}
