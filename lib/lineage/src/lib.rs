//! # reach Lineage
//!
//! Lineage crawling and reach statistics on top of a [`RecordStore`].
//!
//! - [`crawl`] - Bounded breadth-first walk down the `citedby` relation
//! - [`Aggregator`] - Per-root distance sums/averages and trait variance
//! - [`BatchOrchestrator`] - Runs a [`ReachJob`] over a record family or a whole store
//!
//! ## Example
//!
//! ```rust
//! use reach_core::{IncludeAll, Record, TraitKind, TraitRegistry};
//! use reach_lineage::Aggregator;
//! use reach_storage::MemoryStore;
//! use serde_json::json;
//!
//! let store = MemoryStore::from_records([
//!     Record::new("R").with_children(["C1", "C2"]).with_field("doc_vec", json!([1.0, 0.0])),
//!     Record::new("C1").with_field("doc_vec", json!([1.0, 0.0])),
//!     Record::new("C2").with_field("doc_vec", json!([0.0, 1.0])),
//! ]);
//! let registry = TraitRegistry::new();
//! let stats = Aggregator::new(&store, &registry)
//!     .parent_child_distance(&"R".into(), TraitKind::SemanticVector, 1, &IncludeAll)
//!     .unwrap();
//! assert_eq!(stats.field("1_gen_sum_dist_w2v"), Some(1.0));
//! ```
//!
//! [`RecordStore`]: reach_storage::RecordStore

pub mod crawler;
pub mod aggregate;
pub mod batch;

pub use crawler::{crawl, Lineage, LineageEntry};
pub use aggregate::{Aggregator, Operation, ReachJob};
pub use batch::{BatchConfig, BatchOrchestrator, BatchReport};
