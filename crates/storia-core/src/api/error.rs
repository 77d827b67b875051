use thiserror::Error;

use super::TransportError;
use crate::cache::StoreError;
use crate::error::ErrorKind;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("You are offline")]
    Offline,

    #[error("No cached data available for {0}")]
    NoCachedData(String),

    #[error("Cached data for {cache_key} expired ({age_hours}h old)")]
    CacheExpired { cache_key: String, age_hours: i64 },

    #[error("Cannot add a story while offline. Please connect to the internet.")]
    OfflineWriteRejected,

    #[error("{0}")]
    Rejected(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            429 => ApiError::RateLimited,
            _ => ApiError::Status {
                status,
                body: Self::truncate_body(body),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network(_) | ApiError::Status { .. } | ApiError::RateLimited => {
                ErrorKind::NetworkFailure
            }
            ApiError::Offline => ErrorKind::Offline,
            ApiError::NoCachedData(_) => ErrorKind::NoCachedData,
            ApiError::CacheExpired { .. } => ErrorKind::CacheExpired,
            ApiError::OfflineWriteRejected => ErrorKind::OfflineWriteRejected,
            ApiError::Rejected(_) => ErrorKind::Rejected,
            ApiError::InvalidResponse(_) => ErrorKind::InvalidResponse,
            ApiError::InvalidInput(_) => ErrorKind::InvalidInput,
            ApiError::Store(e) => e.kind(),
        }
    }

    /// Whether the failure came from having no connectivity at all
    pub fn is_offline(&self) -> bool {
        self.kind() == ErrorKind::Offline
    }
}
