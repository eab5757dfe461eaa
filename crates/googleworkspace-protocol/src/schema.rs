use serde::{Deserialize, Serialize};

use crate::query::Operator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Int,
    Double,
    Bool,
    Timestamp,
    Json,
    Inet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Required,
    Optional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyColumnDescriptor {
    pub name: String,
    pub require: Requirement,
    pub operators: Vec<Operator>,
}

/// Table metadata returned by `plugin.schema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub description: String,
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub list_key_columns: Vec<KeyColumnDescriptor>,
    #[serde(default)]
    pub get_key_columns: Vec<KeyColumnDescriptor>,
}
