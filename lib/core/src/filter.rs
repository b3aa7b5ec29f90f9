// Record predicates: lineage inclusion rules and store queries
use serde_json::Value;
use crate::Record;

pub trait RecordFilter: Send + Sync {
    fn matches(&self, record: &Record) -> bool;
}

impl<F> RecordFilter for F
where
    F: Fn(&Record) -> bool + Send + Sync,
{
    fn matches(&self, record: &Record) -> bool {
        self(record)
    }
}

/// Accepts every record
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeAll;

impl RecordFilter for IncludeAll {
    fn matches(&self, _record: &Record) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterCondition {
    Exists { field: String },
    Equals { field: String, value: Value },
    NotEquals { field: String, value: Value },
    GreaterThan { field: String, value: f64 },
    LessThan { field: String, value: f64 },
    /// Array field with more than `count` entries
    LengthGreaterThan { field: String, count: usize },
    And(Vec<FilterCondition>),
    Or(Vec<FilterCondition>),
    Not(Box<FilterCondition>),
}

impl FilterCondition {
    pub fn exists(field: &str) -> Self {
        FilterCondition::Exists {
            field: field.to_string(),
        }
    }

    pub fn length_greater_than(field: &str, count: usize) -> Self {
        FilterCondition::LengthGreaterThan {
            field: field.to_string(),
            count,
        }
    }

    fn matches_condition(condition: &FilterCondition, record: &Record) -> bool {
        match condition {
            FilterCondition::Exists { field } => record.get(field).is_some(),
            FilterCondition::Equals { field, value } => {
                record.get(field).map(|v| v == value).unwrap_or(false)
            }
            FilterCondition::NotEquals { field, value } => {
                record.get(field).map(|v| v != value).unwrap_or(true)
            }
            FilterCondition::GreaterThan { field, value } => record
                .get(field)
                .and_then(Value::as_f64)
                .map(|v| v > *value)
                .unwrap_or(false),
            FilterCondition::LessThan { field, value } => record
                .get(field)
                .and_then(Value::as_f64)
                .map(|v| v < *value)
                .unwrap_or(false),
            FilterCondition::LengthGreaterThan { field, count } => record
                .get(field)
                .and_then(Value::as_array)
                .map(|v| v.len() > *count)
                .unwrap_or(false),
            FilterCondition::And(conditions) => {
                conditions.iter().all(|c| Self::matches_condition(c, record))
            }
            FilterCondition::Or(conditions) => {
                conditions.iter().any(|c| Self::matches_condition(c, record))
            }
            FilterCondition::Not(condition) => !Self::matches_condition(condition, record),
        }
    }
}

impl RecordFilter for FilterCondition {
    fn matches(&self, record: &Record) -> bool {
        Self::matches_condition(self, record)
    }
}
