use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("failed to load '{path}': {message}")]
    Load { path: PathBuf, message: String },

    #[error("no supported documents found in '{0}'")]
    NoDocuments(PathBuf),

    #[error("invalid chunking: chunk_size={chunk_size}, chunk_overlap={chunk_overlap} (need chunk_size > 0 and chunk_overlap < chunk_size)")]
    InvalidChunking {
        chunk_size: usize,
        chunk_overlap: usize,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("generation error: {0}")]
    Generation(String),

    #[error("got {chunks} chunks but {vectors} vectors")]
    LengthMismatch { chunks: usize, vectors: usize },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector has a non-finite value at position {position}")]
    NonFiniteVector { position: usize },

    #[error("invalid prompt template: {0}")]
    Template(String),
}

impl RagError {
    pub(crate) fn load(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        RagError::Load {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

impl From<config::ConfigError> for RagError {
    fn from(err: config::ConfigError) -> Self {
        RagError::Config(err.to_string())
    }
}
