//! Column value transforms
//!
//! Every column reads its value out of the API item through a `Transform`,
//! then passes through type coercion and null-if-zero.

use chrono::{DateTime, SecondsFormat};
use googleworkspace_protocol::{ColumnType, QueryRequest};
use serde_json::Value;

use super::qual::QualLookup;

#[derive(Clone, Copy)]
pub enum Transform {
    /// Field named like the column, in lowerCamelCase
    FromCamel,
    /// Dotted JSON path; numeric segments index arrays
    Field(&'static str),
    /// Echo the `=` qualifier on the given column
    FromQual(&'static str),
    /// Epoch milliseconds (string or number) at the path, as RFC3339
    UnixMs(&'static str),
    Func(fn(&Value) -> Value),
}

impl Transform {
    pub fn apply(&self, column: &str, item: &Value, query: &QueryRequest) -> Value {
        match self {
            Transform::FromCamel => item.get(to_lower_camel(column).as_str()).cloned().unwrap_or(Value::Null),
            Transform::Field(path) => lookup(item, path).cloned().unwrap_or(Value::Null),
            Transform::FromQual(name) => query.equals(name).map(|v| v.to_json()).unwrap_or(Value::Null),
            Transform::UnixMs(path) => lookup(item, path).map(unix_ms_to_rfc3339).unwrap_or(Value::Null),
            Transform::Func(f) => f(item),
        }
    }
}

impl std::fmt::Debug for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transform::FromCamel => f.write_str("FromCamel"),
            Transform::Field(p) => write!(f, "Field({})", p),
            Transform::FromQual(c) => write!(f, "FromQual({})", c),
            Transform::UnixMs(p) => write!(f, "UnixMs({})", p),
            Transform::Func(_) => f.write_str("Func"),
        }
    }
}

/// `created_time` -> `createdTime`
pub fn to_lower_camel(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

pub fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(item, |current, segment| match current {
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => current.get(segment),
    })
}

fn unix_ms_to_rfc3339(value: &Value) -> Value {
    let millis = match value {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    millis
        .and_then(DateTime::from_timestamp_millis)
        .map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true)))
        .unwrap_or(Value::Null)
}

/// Google encodes int64 fields as JSON strings; turn those into numbers.
pub fn coerce(column_type: ColumnType, value: Value) -> Value {
    match (column_type, &value) {
        (ColumnType::Int, Value::String(s)) => s.parse::<i64>().map(Value::from).unwrap_or(value),
        (ColumnType::Double, Value::String(s)) => s
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(value),
        _ => value,
    }
}

/// Empty strings and numeric zero read as null. `false` is kept.
pub fn null_if_zero(value: Value) -> Value {
    match &value {
        Value::String(s) if s.is_empty() => Value::Null,
        Value::Number(n) if n.as_f64() == Some(0.0) => Value::Null,
        _ => value,
    }
}
