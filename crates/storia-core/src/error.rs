/// Stable discriminant for every failure the core can report.
///
/// Callers match on this instead of on error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRecord,
    NotFound,
    InvalidKey,
    NetworkFailure,
    Offline,
    NoCachedData,
    CacheExpired,
    OfflineWriteRejected,
    CacheMiss,
    ItemNotFound,
    /// The API answered with its application-level error flag set
    Rejected,
    InvalidResponse,
    InvalidInput,
    /// A worker lifecycle step was attempted from the wrong state
    InvalidState,
    Storage,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidRecord => "invalid record",
            ErrorKind::NotFound => "not found",
            ErrorKind::InvalidKey => "invalid key",
            ErrorKind::NetworkFailure => "network failure",
            ErrorKind::Offline => "offline",
            ErrorKind::NoCachedData => "no cached data",
            ErrorKind::CacheExpired => "cache expired",
            ErrorKind::OfflineWriteRejected => "offline write rejected",
            ErrorKind::CacheMiss => "cache miss",
            ErrorKind::ItemNotFound => "item not found",
            ErrorKind::Rejected => "rejected",
            ErrorKind::InvalidResponse => "invalid response",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::Storage => "storage",
        };
        write!(f, "{}", name)
    }
}
