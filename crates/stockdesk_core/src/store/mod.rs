//! Persistent key-value store behind every slot.
//!
//! # Responsibility
//! - Define the synchronous string-keyed store contract slots read and write.
//! - Report persistence failures explicitly so callers never diverge from
//!   what is actually stored.
//!
//! # Invariants
//! - Keys are non-empty after trimming; implementations store trimmed keys.
//! - Removing an absent key succeeds.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory_store;
pub mod sqlite_store;

pub use memory_store::MemoryKvStore;
pub use sqlite_store::SqliteKvStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failure reported by a `KvStore` implementation.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    InvalidKey(String),
    /// Host refused access (read-only store, poisoned lock, quota).
    Unavailable(String),
}

impl StoreError {
    /// Stable machine-readable code for logs and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Db(_) => "store_db_error",
            Self::InvalidKey(_) => "store_invalid_key",
            Self::Unavailable(_) => "store_unavailable",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidKey(key) => write!(f, "invalid store key: `{key}`"),
            Self::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidKey(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Client-local, restart-surviving string store.
///
/// All calls are synchronous and bounded; no implementation may suspend on
/// remote I/O.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Validates one store key and returns its trimmed form.
pub fn normalize_key(key: &str) -> StoreResult<&str> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::{normalize_key, StoreError};

    #[test]
    fn normalize_key_trims_surrounding_whitespace() {
        assert_eq!(normalize_key("  branch ").expect("valid key"), "branch");
    }

    #[test]
    fn normalize_key_rejects_blank_values() {
        let err = normalize_key("   ").expect_err("blank key must be rejected");
        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert_eq!(err.code(), "store_invalid_key");
    }
}
