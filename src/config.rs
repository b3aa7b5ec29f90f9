use anyhow::Context;
use reach_core::{
    FilterCondition, IncludeAll, RecordFilter, RecordId, TraitKind, TraitRegistry, Vocabulary,
    CHILDREN_FIELD, DEFAULT_TOPIC_COUNT,
};
use reach_lineage::{BatchConfig, Operation, ReachJob};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a run needs, loadable from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReachConfig {
    /// LMDB store directory
    pub data_dir: Option<PathBuf>,
    /// JSON-lines records to load before the run
    pub import: Option<PathBuf>,
    /// JSON-lines destination for an in-memory run
    pub output: Option<PathBuf>,
    #[serde(rename = "trait")]
    pub trait_kind: TraitKind,
    pub generations: usize,
    pub operation: Operation,
    /// Explicit roots; empty means every record carrying the trait
    pub ids: Vec<RecordId>,
    /// Only descendants cited more than this many times enter a lineage
    pub min_citations: Option<usize>,
    /// JSON object mapping stems to vector indices
    pub vocabulary: Option<PathBuf>,
    pub topics: usize,
    pub normalize_topics: bool,
    pub batch: BatchConfig,
}

impl Default for ReachConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            import: None,
            output: None,
            trait_kind: TraitKind::SemanticVector,
            generations: 5,
            operation: Operation::Reach,
            ids: Vec::new(),
            min_citations: None,
            vocabulary: None,
            topics: DEFAULT_TOPIC_COUNT,
            normalize_topics: true,
            batch: BatchConfig::default(),
        }
    }
}

impl ReachConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn job(&self) -> ReachJob {
        ReachJob {
            operation: self.operation,
            kind: self.trait_kind,
            generations: self.generations,
        }
    }

    pub fn registry(&self) -> anyhow::Result<TraitRegistry> {
        let mut registry = TraitRegistry::new()
            .with_topic_count(self.topics)
            .with_normalized_topics(self.normalize_topics);
        if let Some(path) = &self.vocabulary {
            let vocabulary = Vocabulary::load(path)
                .with_context(|| format!("loading vocabulary {}", path.display()))?;
            registry = registry.with_vocabulary(vocabulary);
        }
        Ok(registry)
    }

    /// Settings outside the job id that change computed values. A checkpoint
    /// written under a different fingerprint is not resumed.
    pub fn fingerprint(&self) -> String {
        let min_citations = self
            .min_citations
            .map(|n| n.to_string())
            .unwrap_or_else(|| "none".to_string());
        let vocabulary = self
            .vocabulary
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "none".to_string());
        format!(
            "min_citations={};topics={};normalize={};vocabulary={}",
            min_citations, self.topics, self.normalize_topics, vocabulary
        )
    }

    /// Batch settings carrying this run's fingerprint
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            fingerprint: self.fingerprint(),
            ..self.batch.clone()
        }
    }

    /// Lineage inclusion rule
    pub fn predicate(&self) -> Box<dyn RecordFilter> {
        match self.min_citations {
            Some(n) => Box::new(FilterCondition::length_greater_than(CHILDREN_FIELD, n)),
            None => Box::new(IncludeAll),
        }
    }
}
