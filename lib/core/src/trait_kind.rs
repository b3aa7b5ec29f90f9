//! Trait kinds and the registry that binds each kind to its storage field,
//! distance function and densification function.
//!
//! Adding a kind means adding a [`TraitKind`] variant, its [`TraitValue`]
//! shape and the two match arms in [`TraitRegistry`]; the crawler,
//! aggregator and batch layers only ever go through the registry.

use crate::densify::{densify_semantic_vector, densify_term_set, densify_topic_mixture, Vocabulary};
use crate::distance::{term_set_distance, topic_mixture_distance, vector_cosine_distance};
use crate::{Error, Record, Result, TraitVector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Number of topics in the default topic model
pub const DEFAULT_TOPIC_COUNT: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraitKind {
    /// Sparse set of top tf-idf stems
    #[serde(rename = "tf-idf", alias = "term-set")]
    TermSet,
    /// Dense document embedding
    #[serde(rename = "w2v", alias = "semantic-vector")]
    SemanticVector,
    /// Sparse `(topic, weight)` pairs over a K-topic model
    #[serde(rename = "lda", alias = "topic-mixture")]
    TopicMixture,
}

impl TraitKind {
    pub const ALL: [TraitKind; 3] = [
        TraitKind::TermSet,
        TraitKind::SemanticVector,
        TraitKind::TopicMixture,
    ];

    /// Identifier used in result field names (`5_gen_avg_dist_w2v`)
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TraitKind::TermSet => "tf-idf",
            TraitKind::SemanticVector => "w2v",
            TraitKind::TopicMixture => "lda",
        }
    }

    /// Document field the native encoding is stored under
    #[must_use]
    pub fn field(self) -> &'static str {
        match self {
            TraitKind::TermSet => "top_tf-idf",
            TraitKind::SemanticVector => "doc_vec",
            TraitKind::TopicMixture => "lda_topics",
        }
    }

    #[must_use]
    pub fn supports_variance(self) -> bool {
        !matches!(self, TraitKind::TopicMixture)
    }

    /// Parse the stored JSON encoding of this kind
    pub fn parse(self, value: &Value) -> Result<TraitValue> {
        let malformed = |e: serde_json::Error| Error::MalformedTrait {
            kind: self.name().to_string(),
            reason: e.to_string(),
        };
        let value = value.clone();
        Ok(match self {
            TraitKind::TermSet => TraitValue::TermSet(serde_json::from_value(value).map_err(malformed)?),
            TraitKind::SemanticVector => {
                TraitValue::SemanticVector(serde_json::from_value(value).map_err(malformed)?)
            }
            TraitKind::TopicMixture => {
                TraitValue::TopicMixture(serde_json::from_value(value).map_err(malformed)?)
            }
        })
    }

    /// The record's trait of this kind, if stored
    pub fn extract(self, record: &Record) -> Result<Option<TraitValue>> {
        record.get(self.field()).map(|v| self.parse(v)).transpose()
    }
}

impl std::fmt::Display for TraitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for TraitKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tf-idf" | "term-set" => Ok(TraitKind::TermSet),
            "w2v" | "semantic-vector" => Ok(TraitKind::SemanticVector),
            "lda" | "topic-mixture" => Ok(TraitKind::TopicMixture),
            other => Err(Error::UnknownTraitKind(other.to_string())),
        }
    }
}

/// A trait value in its native (stored) encoding
#[derive(Debug, Clone, PartialEq)]
pub enum TraitValue {
    TermSet(Vec<String>),
    SemanticVector(Vec<f64>),
    TopicMixture(Vec<(usize, f64)>),
}

impl TraitValue {
    #[must_use]
    pub fn kind(&self) -> TraitKind {
        match self {
            TraitValue::TermSet(_) => TraitKind::TermSet,
            TraitValue::SemanticVector(_) => TraitKind::SemanticVector,
            TraitValue::TopicMixture(_) => TraitKind::TopicMixture,
        }
    }

    /// Whether the value carries anything to measure
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            TraitValue::TermSet(v) => v.is_empty(),
            TraitValue::SemanticVector(v) => v.is_empty(),
            TraitValue::TopicMixture(v) => v.is_empty(),
        }
    }
}

/// Model parameters needed to densify and compare traits
#[derive(Debug, Clone)]
pub struct TraitRegistry {
    vocabulary: Option<Arc<Vocabulary>>,
    topic_count: usize,
    normalize_topics: bool,
}

impl Default for TraitRegistry {
    fn default() -> Self {
        Self {
            vocabulary: None,
            topic_count: DEFAULT_TOPIC_COUNT,
            normalize_topics: true,
        }
    }
}

impl TraitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = Some(Arc::new(vocabulary));
        self
    }

    #[must_use]
    pub fn with_topic_count(mut self, topics: usize) -> Self {
        self.topic_count = topics;
        self
    }

    #[must_use]
    pub fn with_normalized_topics(mut self, normalize: bool) -> Self {
        self.normalize_topics = normalize;
        self
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_deref()
    }

    /// Resolve a trait identifier
    pub fn lookup(&self, name: &str) -> Result<TraitKind> {
        name.parse()
    }

    /// Distance between two values of the same kind
    pub fn distance(&self, a: &TraitValue, b: &TraitValue) -> Result<f64> {
        match (a, b) {
            (TraitValue::TermSet(a), TraitValue::TermSet(b)) => Ok(term_set_distance(a, b)),
            (TraitValue::SemanticVector(a), TraitValue::SemanticVector(b)) => vector_cosine_distance(
                &densify_semantic_vector(a),
                &densify_semantic_vector(b),
            ),
            (TraitValue::TopicMixture(a), TraitValue::TopicMixture(b)) => {
                topic_mixture_distance(a, b, self.topic_count, self.normalize_topics)
            }
            (a, b) => Err(Error::MalformedTrait {
                kind: a.kind().to_string(),
                reason: format!("cannot compare with a {} value", b.kind()),
            }),
        }
    }

    /// Dense vector form of a value
    pub fn densify(&self, value: &TraitValue) -> Result<TraitVector> {
        match value {
            TraitValue::TermSet(terms) => {
                let vocabulary = self.vocabulary.as_deref().ok_or(Error::MissingVocabulary)?;
                Ok(densify_term_set(terms, vocabulary))
            }
            TraitValue::SemanticVector(v) => Ok(densify_semantic_vector(v)),
            TraitValue::TopicMixture(pairs) => {
                densify_topic_mixture(pairs, self.topic_count, self.normalize_topics)
            }
        }
    }
}
