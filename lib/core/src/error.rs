use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown trait kind: {0}")]
    UnknownTraitKind(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Cosine distance is undefined for a zero vector")]
    ZeroVector,

    #[error("Topic mixture names all {topics} topics, no share left to distribute")]
    DegenerateMixture { topics: usize },

    #[error("Trait variance is not supported for {0}")]
    UnsupportedTraitForVariance(String),

    #[error("Record not found: {0}")]
    NoSuchRecord(String),

    #[error("No vocabulary configured for term-set densification")]
    MissingVocabulary,

    #[error("Topic index {index} out of range for a {topics}-topic model")]
    TopicOutOfRange { index: usize, topics: usize },

    #[error("Malformed {kind} value: {reason}")]
    MalformedTrait { kind: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
