use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=", alias = "<>")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
        }
    }

    pub const RANGE: [Operator; 5] = [Operator::Eq, Operator::Gt, Operator::Ge, Operator::Lt, Operator::Le];
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed qualifier value, tagged on the wire as `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum QualValue {
    String(String),
    Int(i64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Inet(String),
}

impl QualValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QualValue::String(s) | QualValue::Inet(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            QualValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            QualValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            QualValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Plain JSON form used when a qualifier value is echoed into a row.
    pub fn to_json(&self) -> Value {
        match self {
            QualValue::String(s) | QualValue::Inet(s) => Value::String(s.clone()),
            QualValue::Int(n) => Value::from(*n),
            QualValue::Bool(b) => Value::Bool(*b),
            QualValue::Timestamp(t) => Value::String(t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qual {
    pub column: String,
    pub operator: Operator,
    pub value: QualValue,
}

impl Qual {
    pub fn new(column: impl Into<String>, operator: Operator, value: QualValue) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }
}

/// Params of `table.list` and `table.get`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub table: String,
    /// Requested columns; empty means all.
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub quals: Vec<Qual>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl QueryRequest {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn with_qual(mut self, column: &str, operator: Operator, value: QualValue) -> Self {
        self.quals.push(Qual::new(column, operator, value));
        self
    }

    pub fn with_columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `column` is part of the projection.
    pub fn wants(&self, column: &str) -> bool {
        self.columns.is_empty() || self.columns.iter().any(|c| c == column)
    }
}

/// `table.row` notification params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowNotification {
    pub request_id: Value,
    pub row: Map<String, Value>,
}

/// `table.list` result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResult {
    pub rows_streamed: u64,
    pub cancelled: bool,
}

/// `table.get` result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetResult {
    pub row: Option<Map<String, Value>>,
}
