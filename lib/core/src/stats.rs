use crate::TraitKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Stored in place of a statistic when descendants exist but none can be measured
pub const NO_DATA: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Sum,
    Avg,
    Variance,
}

impl Statistic {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Statistic::Sum => "sum",
            Statistic::Avg => "avg",
            Statistic::Variance => "variance",
        }
    }
}

/// Result field name, e.g. `5_gen_avg_dist_w2v`.
///
/// Downstream consumers read these names, so the format is fixed.
#[must_use]
pub fn stat_field(n_gens: usize, statistic: Statistic, kind: TraitKind) -> String {
    format!("{}_gen_{}_dist_{}", n_gens, statistic.name(), kind.name())
}

/// Statistics computed for one root, keyed by result field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statistics {
    values: BTreeMap<String, f64>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, n_gens: usize, statistic: Statistic, kind: TraitKind, value: f64) {
        self.values.insert(stat_field(n_gens, statistic, kind), value);
    }

    pub fn get(&self, n_gens: usize, statistic: Statistic, kind: TraitKind) -> Option<f64> {
        self.values.get(&stat_field(n_gens, statistic, kind)).copied()
    }

    pub fn field(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Partial-update document for the root record
    pub fn to_update(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|(k, v)| {
                let number = serde_json::Number::from_f64(*v).map(Value::Number);
                (k.clone(), number.unwrap_or(Value::Null))
            })
            .collect()
    }
}
