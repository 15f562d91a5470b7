//! Error types for the cache core.
//!
//! Write failures are recorded on the stored record, never returned to the
//! caller; these types exist so the failure can be classified and logged at
//! the `set` boundary.

use thiserror::Error;

/// Fault raised by an [`ArtifactStream`](crate::ArtifactStream) while
/// producing chunks.
///
/// Cloneable so a teed stream can surface the same fault on both handles.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("artifact stream fault: {message}")]
pub struct StreamError {
    message: String,
}

impl StreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a write was recorded as errored.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The draft carried no tags list. An empty list is valid; an absent
    /// one is not.
    #[error("cache entry must declare a tags list")]
    MissingTags,
    /// `expire` was absent, non-positive, or not a number.
    #[error("cache entry must declare a positive expire time")]
    NonPositiveExpire,
    /// `revalidate` was absent, non-positive, or not a number.
    #[error("cache entry must declare a positive revalidate time")]
    NonPositiveRevalidate,
    /// The payload stream faulted while being drained for accounting.
    #[error(transparent)]
    Stream(#[from] StreamError),
}
