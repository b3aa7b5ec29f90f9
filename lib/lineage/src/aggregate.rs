//! Per-root reach statistics over a crawled lineage.
//!
//! Two computations share the crawler:
//!
//! - **reach**: sum and average distance from the root's trait to each
//!   qualifying descendant's trait (`{n}_gen_sum_dist_{kind}`,
//!   `{n}_gen_avg_dist_{kind}`)
//! - **variance**: norm of the component-wise variance of the dense trait
//!   vectors across the lineage, root included (`{n}_gen_variance_dist_{kind}`)
//!
//! A root with no citations or no trait of its own scores `0`. A root whose
//! descendants carry no trait scores [`NO_DATA`] (`-1`).

use crate::crawler::crawl;
use reach_core::{
    Error, Projection, RecordFilter, RecordId, Result, Statistic, Statistics, TraitKind,
    TraitRegistry, TraitVector, CHILDREN_FIELD, NO_DATA,
};
use reach_storage::RecordStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Sum and average root-to-descendant distance
    Reach,
    /// Norm of the lineage's component-wise trait variance
    Variance,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Reach => "reach",
            Operation::Variance => "variance",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reach" | "distance" => Ok(Operation::Reach),
            "variance" => Ok(Operation::Variance),
            other => Err(Error::InvalidConfig(format!("unknown operation '{}'", other))),
        }
    }
}

/// One statistics pass: what to compute, for which trait, how deep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReachJob {
    pub operation: Operation,
    pub kind: TraitKind,
    pub generations: usize,
}

impl ReachJob {
    pub fn reach(kind: TraitKind, generations: usize) -> Self {
        Self {
            operation: Operation::Reach,
            kind,
            generations,
        }
    }

    pub fn variance(kind: TraitKind, generations: usize) -> Self {
        Self {
            operation: Operation::Variance,
            kind,
            generations,
        }
    }

    /// Stable identifier, used to match checkpoints
    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.operation, self.generations, self.kind)
    }

    /// Reject jobs that would fail on every record
    pub fn validate(&self, registry: &TraitRegistry) -> Result<()> {
        if self.operation == Operation::Variance {
            if !self.kind.supports_variance() {
                return Err(Error::UnsupportedTraitForVariance(self.kind.to_string()));
            }
            if self.kind == TraitKind::TermSet && registry.vocabulary().is_none() {
                return Err(Error::MissingVocabulary);
            }
        }
        Ok(())
    }
}

pub struct Aggregator<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    registry: &'a TraitRegistry,
}

impl<'a, S: RecordStore + ?Sized> Aggregator<'a, S> {
    pub fn new(store: &'a S, registry: &'a TraitRegistry) -> Self {
        Self { store, registry }
    }

    pub fn compute(
        &self,
        root: &RecordId,
        job: &ReachJob,
        predicate: &dyn RecordFilter,
    ) -> Result<Statistics> {
        match job.operation {
            Operation::Reach => {
                self.parent_child_distance(root, job.kind, job.generations, predicate)
            }
            Operation::Variance => self.trait_variance(root, job.kind, job.generations, predicate),
        }
    }

    /// Sum and average distance between `root` and each descendant within
    /// `n_gens` generations that satisfies `predicate` and carries the trait.
    pub fn parent_child_distance(
        &self,
        root: &RecordId,
        kind: TraitKind,
        n_gens: usize,
        predicate: &dyn RecordFilter,
    ) -> Result<Statistics> {
        let mut stats = Statistics::new();
        let mut record = |sum: f64, avg: f64| {
            stats.set(n_gens, Statistic::Sum, kind, sum);
            stats.set(n_gens, Statistic::Avg, kind, avg);
        };

        let fields = Projection::fields([CHILDREN_FIELD, kind.field()]);
        let parent = self
            .store
            .find_one(root, &fields)?
            .ok_or_else(|| Error::NoSuchRecord(root.to_string()))?;

        let parent_trait = match kind.extract(&parent)? {
            Some(t) if !t.is_empty() && parent.child_count() > 0 => t,
            _ => {
                record(0.0, 0.0);
                return Ok(stats);
            }
        };

        let lineage = match crawl(self.store, root, n_gens, &fields, predicate)? {
            Some(lineage) => lineage,
            None => {
                record(NO_DATA, NO_DATA);
                return Ok(stats);
            }
        };

        let mut sum = 0.0;
        let mut measured = 0usize;
        for entry in lineage.descendants() {
            if let Some(child_trait) = kind.extract(&entry.record)? {
                sum += self.registry.distance(&parent_trait, &child_trait)?;
                measured += 1;
            }
        }

        if measured == 0 {
            record(NO_DATA, NO_DATA);
        } else {
            record(sum, sum / measured as f64);
        }
        Ok(stats)
    }

    /// Norm of the component-wise variance of every trait vector in the
    /// lineage of `root`, root included.
    pub fn trait_variance(
        &self,
        root: &RecordId,
        kind: TraitKind,
        n_gens: usize,
        predicate: &dyn RecordFilter,
    ) -> Result<Statistics> {
        if !kind.supports_variance() {
            return Err(Error::UnsupportedTraitForVariance(kind.to_string()));
        }

        let fields = Projection::fields([kind.field()]);
        let lineage = crawl(self.store, root, n_gens, &fields, predicate)?
            .ok_or_else(|| Error::NoSuchRecord(root.to_string()))?;

        let mut vectors = Vec::with_capacity(lineage.len());
        for entry in lineage.entries() {
            if let Some(value) = kind.extract(&entry.record)? {
                vectors.push(self.registry.densify(&value)?);
            }
        }

        let variance = match TraitVector::component_variance(&vectors)? {
            Some(v) => v.norm(),
            None => NO_DATA,
        };

        let mut stats = Statistics::new();
        stats.set(n_gens, Statistic::Variance, kind, variance);
        Ok(stats)
    }
}
