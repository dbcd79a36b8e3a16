//! Error taxonomy for ingestion and querying.
//!
//! Leaf variants describe what went wrong; the two wrapper variants
//! ([`RagError::IngestionFailed`] and [`RagError::QueryFailed`]) are what
//! callers of the pipeline and chain actually see, with the original
//! cause reachable through [`std::error::Error::source`].

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = RagError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RagError {
    /// Required configuration is missing or invalid. Raised at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The documents directory could not be listed.
    #[error("failed to list documents in '{path}': {message}")]
    ListDocuments { path: PathBuf, message: String },

    /// A source file could not be read or parsed.
    #[error("failed to load '{path}': {message}")]
    Load { path: PathBuf, message: String },

    /// The embedding service failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The vector index rejected an upsert or query.
    #[error("vector index error: {0}")]
    Index(String),

    /// The language-generation service failed.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A processed marker could not be written.
    #[error("failed to record '{id}' as processed: {message}")]
    Tracker { id: String, message: String },

    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("Failed to ingest your data")]
    IngestionFailed(#[source] Box<RagError>),

    #[error("query failed")]
    QueryFailed(#[source] Box<RagError>),
}

impl RagError {
    pub fn load(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Load {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn embedding(message: impl ToString) -> Self {
        Self::Embedding(message.to_string())
    }

    pub fn index(message: impl ToString) -> Self {
        Self::Index(message.to_string())
    }

    pub fn generation(message: impl ToString) -> Self {
        Self::Generation(message.to_string())
    }

    /// Returns the innermost cause, looking through the wrapper variants.
    pub fn root_cause(&self) -> &RagError {
        match self {
            RagError::IngestionFailed(inner) | RagError::QueryFailed(inner) => inner.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn wrapper_preserves_cause() {
        let err = RagError::IngestionFailed(Box::new(RagError::index("upsert rejected")));
        assert_eq!(err.to_string(), "Failed to ingest your data");
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "vector index error: upsert rejected");
        assert!(matches!(err.root_cause(), RagError::Index(_)));
    }

    #[test]
    fn load_error_names_the_file() {
        let err = RagError::load("docs/broken.pdf", "invalid xref");
        assert_eq!(
            err.to_string(),
            "failed to load 'docs/broken.pdf': invalid xref"
        );
    }
}
