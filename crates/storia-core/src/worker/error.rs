use thiserror::Error;

use super::WorkerState;
use crate::api::TransportError;
use crate::error::ErrorKind;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Cannot move worker from {from:?} to {to:?}")]
    InvalidStateTransition { from: WorkerState, to: WorkerState },

    #[error("Invalid cache namespace name: {0:?}")]
    InvalidNamespace(String),

    #[error("Invalid route pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Worker cache storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt worker cache entry {path}: {source}")]
    CorruptEntry {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Client window error: {0}")]
    Client(String),
}

impl WorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::InvalidStateTransition { .. } => ErrorKind::InvalidState,
            WorkerError::InvalidNamespace(_) | WorkerError::InvalidPattern(_) => {
                ErrorKind::InvalidInput
            }
            WorkerError::Io(_) | WorkerError::CorruptEntry { .. } => ErrorKind::Storage,
            WorkerError::Transport(_) | WorkerError::Client(_) => ErrorKind::NetworkFailure,
        }
    }
}
