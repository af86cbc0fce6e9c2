use std::time::Duration;

use thiserror::Error;

use crate::types::QueryStage;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding model unavailable: {0}")]
    Unavailable(String),

    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("embedding failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("vector index unavailable: {0}")]
    Unavailable(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("document {0} has no content to embed")]
    EmptyDocument(String),

    #[error("duplicate document id: {0}")]
    DuplicateId(String),

    #[error("index returned unknown document id: {0}")]
    MissingDocument(String),

    #[error("index backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("could not parse response: {0}")]
    Parse(String),

    #[error("timed out after {after:?}: {target}")]
    Timeout { target: String, after: Duration },

    #[error("URL not fetchable: {0}")]
    Blocked(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Web(#[from] WebError),

    #[error("corpus error: {0}")]
    Corpus(String),

    #[error("retrieval failed during {stage} for query {query:?} after {elapsed:?}: {source}")]
    Pipeline {
        stage: QueryStage,
        query: String,
        elapsed: Duration,
        #[source]
        source: Box<Error>,
    },

    #[error("operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// True for a dependency that is absent rather than broken: the query can
    /// continue on another path.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Embedding(EmbeddingError::Unavailable(_)) | Error::Index(IndexError::Unavailable(_))
        )
    }

    /// True for caller misuse (bad query, out-of-range parameters).
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::InvalidConfig(_))
    }

    pub fn in_stage(self, stage: QueryStage, query: &str, elapsed: Duration) -> Self {
        Error::Pipeline { stage, query: query.to_string(), elapsed, source: Box::new(self) }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
