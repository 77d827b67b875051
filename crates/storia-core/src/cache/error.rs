use thiserror::Error;

use crate::error::ErrorKind;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("No cached record for key: {0}")]
    NotFound(String),

    #[error("Cache key must not be empty")]
    InvalidKey,

    #[error("Cache entry {0} is missing or has no story listing")]
    CacheMiss(String),

    #[error("Story {story_id} is not in cache entry {cache_key}")]
    ItemNotFound { cache_key: String, story_id: String },

    #[error("Cache storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache record {id}: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::InvalidRecord(_) => ErrorKind::InvalidRecord,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::InvalidKey => ErrorKind::InvalidKey,
            StoreError::CacheMiss(_) => ErrorKind::CacheMiss,
            StoreError::ItemNotFound { .. } => ErrorKind::ItemNotFound,
            StoreError::Io(_) | StoreError::Corrupt { .. } => ErrorKind::Storage,
        }
    }
}
