//! Qualifier lookup and translation into native API filters.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use googleworkspace_protocol::{Operator, Qual, QualValue, QueryRequest};

use crate::common::{AppResult, PluginError};

/// UTC with milliseconds, as Drive and Calendar expect.
const MILLIS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

pub trait QualLookup {
    /// Value of the first `=` qualifier on `column`.
    fn equals(&self, column: &str) -> Option<&QualValue>;

    fn quals_for(&self, column: &str) -> Vec<&Qual>;

    fn equals_str(&self, column: &str) -> Option<&str> {
        self.equals(column).and_then(QualValue::as_str)
    }

    fn equals_bool(&self, column: &str) -> Option<bool> {
        self.equals(column).and_then(QualValue::as_bool)
    }

    fn equals_i64(&self, column: &str) -> Option<i64> {
        self.equals(column).and_then(QualValue::as_i64)
    }

    /// Non-empty string from the `=` qualifier on a required key column.
    fn require_str(&self, column: &str) -> AppResult<&str> {
        self.equals_str(column)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PluginError::invalid_query(format!("{} must be a non-empty string", column)))
    }
}

impl QualLookup for QueryRequest {
    fn equals(&self, column: &str) -> Option<&QualValue> {
        self.quals
            .iter()
            .find(|q| q.column == column && q.operator == Operator::Eq)
            .map(|q| &q.value)
    }

    fn quals_for(&self, column: &str) -> Vec<&Qual> {
        self.quals.iter().filter(|q| q.column == column).collect()
    }
}

/// Timestamp qualifiers on `column`, with their operators.
pub fn time_quals(query: &QueryRequest, column: &str) -> Vec<(Operator, DateTime<Utc>)> {
    query
        .quals_for(column)
        .into_iter()
        .filter_map(|q| q.value.as_timestamp().map(|t| (q.operator, t)))
        .collect()
}

/// Join non-empty filter fragments with ` and `.
pub fn join_filters(filters: Vec<String>) -> Option<String> {
    let filters: Vec<String> = filters.into_iter().filter(|f| !f.is_empty()).collect();
    if filters.is_empty() {
        None
    } else {
        Some(filters.join(" and "))
    }
}

/// An explicit `query` qualifier wins over the filter built from the other quals.
pub fn query_or_filters(query: &QueryRequest, filters: Vec<String>) -> Option<String> {
    match query.equals_str("query").filter(|q| !q.is_empty()) {
        Some(q) => Some(q.to_string()),
        None => join_filters(filters),
    }
}

fn millis(t: DateTime<Utc>) -> String {
    t.format(MILLIS_FORMAT).to_string()
}

/// `t` moved by `secs`, pinned to `t` at the edge of the representable range.
fn shifted(t: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    t.checked_add_signed(Duration::seconds(secs)).unwrap_or(t)
}

/// Drive search clause for a timestamp comparison on `field`.
///
/// Drive compares at millisecond precision, so `=` becomes a two second window.
pub fn drive_time_filter(field: &str, operator: Operator, t: DateTime<Utc>) -> Option<String> {
    let before = millis(shifted(t, -1));
    let after = millis(shifted(t, 1));
    let clause = match operator {
        Operator::Gt => format!("{} > \"{}\"", field, millis(t)),
        Operator::Lt => format!("{} < \"{}\"", field, millis(t)),
        Operator::Ge => format!("{} > \"{}\"", field, before),
        Operator::Le => format!("{} < \"{}\"", field, after),
        Operator::Eq => format!("{} > \"{}\" and {} < \"{}\"", field, before, field, after),
        Operator::NotEq => return None,
    };
    Some(clause)
}

/// Gmail search clause for a comparison on the message date, in epoch seconds.
pub fn gmail_date_filter(operator: Operator, secs: i64) -> Option<String> {
    let clause = match operator {
        Operator::Eq => format!("after:{} before:{}", secs, secs + 1),
        Operator::Ge | Operator::Gt => format!("after:{}", secs),
        Operator::Le => format!("before:{}", secs + 1),
        Operator::Lt => format!("before:{}", secs),
        Operator::NotEq => return None,
    };
    Some(clause)
}

/// RFC3339 bounds for APIs taking a start/end pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub min: Option<String>,
    pub max: Option<String>,
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl TimeWindow {
    /// Calendar `timeMin`/`timeMax`, shifting strict bounds by one second.
    pub fn calendar(quals: &[(Operator, DateTime<Utc>)]) -> Self {
        let mut window = Self::default();
        for &(operator, t) in quals {
            match operator {
                Operator::Gt => window.min = Some(millis(shifted(t, 1))),
                Operator::Ge => window.min = Some(millis(t)),
                Operator::Eq => {
                    window.min = Some(millis(t));
                    window.max = Some(millis(t));
                }
                Operator::Le => window.max = Some(millis(t)),
                Operator::Lt => window.max = Some(millis(shifted(t, -1))),
                Operator::NotEq => {}
            }
        }
        window
    }

    /// Lower bound from any `start` qualifier and upper bound from any `end`
    /// qualifier, whatever the operator.
    pub fn open(start: &[(Operator, DateTime<Utc>)], end: &[(Operator, DateTime<Utc>)]) -> Self {
        Self {
            min: start.last().map(|&(_, t)| rfc3339(t)),
            max: end.last().map(|&(_, t)| rfc3339(t)),
        }
    }

    /// Reports `startTime`/`endTime`; strict and inclusive bounds are treated alike.
    pub fn reports(quals: &[(Operator, DateTime<Utc>)]) -> Self {
        let mut window = Self::default();
        for &(operator, t) in quals {
            match operator {
                Operator::Eq => {
                    window.min = Some(rfc3339(t));
                    window.max = Some(rfc3339(t));
                }
                Operator::Gt | Operator::Ge => window.min = Some(rfc3339(t)),
                Operator::Lt | Operator::Le => window.max = Some(rfc3339(t)),
                Operator::NotEq => {}
            }
        }
        window
    }
}
