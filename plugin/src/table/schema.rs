//! Declarative table metadata: columns, key columns and ignorable errors.

use googleworkspace_protocol::{
    ColumnDescriptor, ColumnType, KeyColumnDescriptor, Operator, QueryRequest, Requirement, TableDescriptor,
};
use serde_json::{Map, Value};

use super::transform::{coerce, null_if_zero, Transform};
use crate::common::{AppResult, PluginError};

#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub description: &'static str,
    pub transform: Transform,
    /// Needs the per-row hydrate call
    pub hydrate: bool,
    pub default: Option<Value>,
}

macro_rules! column_ctor {
    ($($fn_name:ident => $ty:ident),* $(,)?) => {
        $(
            pub fn $fn_name(name: &'static str, description: &'static str) -> Self {
                Self::new(name, ColumnType::$ty, description)
            }
        )*
    };
}

impl Column {
    pub fn new(name: &'static str, column_type: ColumnType, description: &'static str) -> Self {
        Self {
            name,
            column_type,
            description,
            transform: Transform::FromCamel,
            hydrate: false,
            default: None,
        }
    }

    column_ctor! {
        string => String,
        int => Int,
        double => Double,
        bool => Bool,
        timestamp => Timestamp,
        json => Json,
        inet => Inet,
    }

    pub fn field(mut self, path: &'static str) -> Self {
        self.transform = Transform::Field(path);
        self
    }

    pub fn from_qual(mut self) -> Self {
        self.transform = Transform::FromQual(self.name);
        self
    }

    pub fn unix_ms(mut self, path: &'static str) -> Self {
        self.transform = Transform::UnixMs(path);
        self
    }

    pub fn func(mut self, f: fn(&Value) -> Value) -> Self {
        self.transform = Transform::Func(f);
        self
    }

    pub fn hydrated(mut self) -> Self {
        self.hydrate = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Column value for one API item.
    pub fn value(&self, item: &Value, query: &QueryRequest) -> Value {
        let raw = self.transform.apply(self.name, item, query);
        match null_if_zero(coerce(self.column_type, raw)) {
            Value::Null => self.default.clone().unwrap_or(Value::Null),
            v => v,
        }
    }

    pub fn descriptor(&self) -> ColumnDescriptor {
        ColumnDescriptor {
            name: self.name.to_string(),
            column_type: self.column_type,
            description: self.description.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyColumn {
    pub name: &'static str,
    pub require: Requirement,
    pub operators: Vec<Operator>,
}

impl KeyColumn {
    pub fn required(name: &'static str) -> Self {
        Self {
            name,
            require: Requirement::Required,
            operators: vec![Operator::Eq],
        }
    }

    pub fn optional(name: &'static str) -> Self {
        Self {
            require: Requirement::Optional,
            ..Self::required(name)
        }
    }

    pub fn operators(mut self, operators: &[Operator]) -> Self {
        self.operators = operators.to_vec();
        self
    }

    fn is_satisfied_by(&self, query: &QueryRequest) -> bool {
        query
            .quals
            .iter()
            .any(|q| q.column == self.name && self.operators.contains(&q.operator))
    }

    fn descriptor(&self) -> KeyColumnDescriptor {
        KeyColumnDescriptor {
            name: self.name.to_string(),
            require: self.require,
            operators: self.operators.clone(),
        }
    }
}

pub const DEFAULT_IGNORED_STATUSES: &[u16] = &[404, 400, 403];

/// HTTP statuses that end a scan quietly instead of failing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IgnoreConfig {
    pub list: &'static [u16],
    pub get: &'static [u16],
}

impl IgnoreConfig {
    pub const fn only(statuses: &'static [u16]) -> Self {
        Self {
            list: statuses,
            get: statuses,
        }
    }

    pub fn ignores_list(&self, err: &PluginError) -> bool {
        err.status().is_some_and(|s| self.list.contains(&s))
    }

    pub fn ignores_get(&self, err: &PluginError) -> bool {
        err.status().is_some_and(|s| self.get.contains(&s))
    }
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self::only(DEFAULT_IGNORED_STATUSES)
    }
}

#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub columns: Vec<Column>,
    pub list_keys: Vec<KeyColumn>,
    pub get_keys: Vec<KeyColumn>,
    pub ignore: IgnoreConfig,
}

impl TableSchema {
    pub fn new(name: &'static str, description: &'static str, columns: Vec<Column>) -> Self {
        Self {
            name,
            description,
            columns,
            list_keys: Vec::new(),
            get_keys: Vec::new(),
            ignore: IgnoreConfig::default(),
        }
    }

    pub fn list_keys(mut self, keys: Vec<KeyColumn>) -> Self {
        self.list_keys = keys;
        self
    }

    pub fn get_keys(mut self, names: &[&'static str]) -> Self {
        self.get_keys = names.iter().copied().map(KeyColumn::required).collect();
        self
    }

    pub fn ignore(mut self, statuses: &'static [u16]) -> Self {
        self.ignore = IgnoreConfig::only(statuses);
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn descriptor(&self) -> TableDescriptor {
        TableDescriptor {
            name: self.name.to_string(),
            description: self.description.to_string(),
            columns: self.columns.iter().map(Column::descriptor).collect(),
            list_key_columns: self.list_keys.iter().map(KeyColumn::descriptor).collect(),
            get_key_columns: self.get_keys.iter().map(KeyColumn::descriptor).collect(),
        }
    }

    pub fn validate_columns(&self, query: &QueryRequest) -> AppResult<()> {
        match query.columns.iter().find(|c| self.column(c).is_none()) {
            Some(unknown) => Err(PluginError::invalid_query(format!(
                "column \"{}\" does not exist in table {}",
                unknown, self.name
            ))),
            None => Ok(()),
        }
    }

    pub fn check_list_keys(&self, query: &QueryRequest) -> AppResult<()> {
        check_required(self.name, &self.list_keys, query)
    }

    pub fn check_get_keys(&self, query: &QueryRequest) -> AppResult<()> {
        if self.get_keys.is_empty() {
            return Err(PluginError::invalid_query(format!(
                "table {} does not support get",
                self.name
            )));
        }
        check_required(self.name, &self.get_keys, query)
    }

    /// Whether any requested column needs the hydrate call.
    pub fn needs_hydrate(&self, query: &QueryRequest) -> bool {
        self.columns.iter().any(|c| c.hydrate && query.wants(c.name))
    }

    /// Requested columns of one item (every column when none were requested).
    pub fn project(&self, item: &Value, query: &QueryRequest) -> Map<String, Value> {
        self.columns
            .iter()
            .filter(|c| query.wants(c.name))
            .map(|c| (c.name.to_string(), c.value(item, query)))
            .collect()
    }
}

fn check_required(table: &str, keys: &[KeyColumn], query: &QueryRequest) -> AppResult<()> {
    let missing: Vec<&str> = keys
        .iter()
        .filter(|k| k.require == Requirement::Required && !k.is_satisfied_by(query))
        .map(|k| k.name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PluginError::invalid_query(format!(
            "table {} requires a qualifier on: {}",
            table,
            missing.join(", ")
        )))
    }
}
