//! # reach
//!
//! Measures how far a record's descendants drift from it in a citation graph.
//!
//! For every root record, reach crawls up to N generations of records that
//! cite it, compares each descendant's trait (tf-idf stems, a document
//! embedding, or an LDA topic mixture) with the root's, and stores the
//! results back on the root as fields like `5_gen_avg_dist_w2v`.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! reach --data-dir ./data --import patents.jsonl --trait w2v --generations 5
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use reach::prelude::*;
//! use serde_json::json;
//!
//! let store = MemoryStore::from_records([
//!     Record::new("R").with_children(["C1", "C2"]).with_field("doc_vec", json!([1.0, 0.0])),
//!     Record::new("C1").with_field("doc_vec", json!([1.0, 0.0])),
//!     Record::new("C2").with_field("doc_vec", json!([0.0, 1.0])),
//! ]);
//! let registry = TraitRegistry::new();
//! let orchestrator = BatchOrchestrator::new(&store, &registry, BatchConfig::default());
//! let report = orchestrator
//!     .run_store(&ReachJob::reach(TraitKind::SemanticVector, 1), &IncludeAll)
//!     .unwrap();
//! assert_eq!(report.updated, 3);
//! ```
//!
//! ## Crate Structure
//!
//! - `reach-core` - Records, trait kinds, densification, distances, result fields
//! - `reach-storage` - Record stores (in-memory, LMDB) and batch checkpoints
//! - `reach-lineage` - Lineage crawler, aggregator, batch orchestrator

pub mod config;

pub use config::ReachConfig;

// Re-export core types
pub use reach_core::{
    Error, Result,
    Record, RecordId, Projection,
    TraitKind, TraitValue, TraitRegistry, TraitVector, Vocabulary,
    FilterCondition, IncludeAll, RecordFilter,
    Statistic, Statistics, stat_field, NO_DATA,
};

// Re-export storage
pub use reach_storage::{RecordStore, MemoryStore, LmdbStore, Checkpoint, CheckpointFile};

// Re-export lineage
pub use reach_lineage::{
    crawl, Lineage, Aggregator, Operation, ReachJob,
    BatchConfig, BatchOrchestrator, BatchReport,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Record, RecordId, Projection,
        TraitKind, TraitValue, TraitRegistry, Vocabulary,
        FilterCondition, IncludeAll, RecordFilter,
        Statistic, Statistics, NO_DATA,
        RecordStore, MemoryStore, LmdbStore,
        Aggregator, ReachJob, Operation,
        BatchConfig, BatchOrchestrator, BatchReport,
        Error, Result,
    };
}

/// Trait distance functions
pub mod distance {
    pub use reach_core::distance::{
        term_set_distance, topic_mixture_distance, vector_cosine_distance, TERM_SET_SPAN,
    };
    pub use reach_core::densify::{densify_semantic_vector, densify_term_set, densify_topic_mixture};
}
