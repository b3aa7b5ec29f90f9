//! # reach Core
//!
//! Core library for measuring how far a record's descendants drift from it.
//!
//! This crate provides the data model and the pure math:
//!
//! - [`Record`] - A document in the citation graph, with its `citedby` children
//! - [`TraitKind`] / [`TraitRegistry`] - Trait kinds bound to storage field, distance and densifier
//! - [`densify`] - Sparse term sets and topic mixtures to dense [`TraitVector`]s
//! - [`distance`] - Term-set, cosine and topic-mixture distances
//! - [`Statistics`] - Result fields such as `5_gen_avg_dist_w2v`
//!
//! ## Example
//!
//! ```rust
//! use reach_core::{TraitRegistry, TraitValue};
//!
//! let registry = TraitRegistry::new();
//! let kind = registry.lookup("w2v").unwrap();
//! assert_eq!(kind.field(), "doc_vec");
//!
//! let a = TraitValue::SemanticVector(vec![1.0, 0.0]);
//! let b = TraitValue::SemanticVector(vec![0.0, 1.0]);
//! let d = registry.distance(&a, &b).unwrap();
//! assert!((d - 1.0).abs() < 1e-12);
//! ```

pub mod error;
pub mod vector;
pub mod record;
pub mod trait_kind;
pub mod densify;
pub mod distance;
pub mod filter;
pub mod stats;

pub use error::{Error, Result};
pub use vector::TraitVector;
pub use record::{Projection, Record, RecordId, CHILDREN_FIELD, ID_FIELD};
pub use trait_kind::{TraitKind, TraitRegistry, TraitValue, DEFAULT_TOPIC_COUNT};
pub use densify::Vocabulary;
pub use filter::{FilterCondition, IncludeAll, RecordFilter};
pub use stats::{stat_field, Statistic, Statistics, NO_DATA};
