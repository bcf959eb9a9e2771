//! Error types for config cache operations

use std::fmt;

use crate::item::{HostId, ItemId};

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur against the shared config cache
#[derive(Debug)]
pub enum CacheError {
    /// Item vanished from the cache (deleted by a config reload)
    ItemNotFound(ItemId),

    /// Host vanished from the cache
    HostNotFound(HostId),

    /// The cache lock was poisoned by a panicking writer
    Poisoned,

    /// Backend-specific error
    BackendError(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::ItemNotFound(id) => write!(f, "item {} not found in config cache", id),
            CacheError::HostNotFound(id) => write!(f, "host {} not found in config cache", id),
            CacheError::Poisoned => write!(f, "config cache lock poisoned"),
            CacheError::BackendError(msg) => write!(f, "config cache backend error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}
