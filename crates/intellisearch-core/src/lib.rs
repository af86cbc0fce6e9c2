//! Shared vocabulary of the IntelliSearch workspace: domain types, the
//! collaborator traits the retrieval pipeline is written against, the error
//! taxonomy, configuration loading and corpus loading.

pub mod config;
pub mod corpus;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{EmbeddingError, Error, IndexError, Result, WebError};
pub use types::{
    Citation, Document, DocumentId, EmbeddedDocument, LocalMatch, QueryStage, RetrievalOutcome,
    SearchHit, Strategy, WebResult, WebSearchHit,
};
