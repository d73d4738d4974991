/// Domain errors for the metadata stores

use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// Required field missing or malformed, raised before any backend call
    #[error("{0}")]
    Validation(String),

    #[error("Workflow: {name}, version: {version} already exists!")]
    AlreadyExists { name: String, version: u32 },

    /// Produced by callers that require a record; store lookups return `Option`
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("payload codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl MetadataError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Transient backend failure, left to an external retry policy
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(err) => err.is_retryable(),
            _ => false,
        }
    }
}

pub type MetadataResult<T> = Result<T, MetadataError>;
