//! Key-value store seam
//!
//! The host application owns the real persistence mechanism (shared preferences,
//! a keychain, a SQLite table...). The core only needs async get/set/remove by
//! string key, with values encoded as JSON strings.

use std::sync::{Arc, PoisonError};
use async_trait::async_trait;
use thiserror::Error;

mod in_memory;

pub use in_memory::InMemoryKeyValueStore;

/// Storage keys used by the repositories
pub mod keys {
    pub const CYCLE_SETTINGS: &str = "cycleSettings";
    pub const CYCLE_HISTORY: &str = "cycleHistory";
    pub const DAY_ENTRIES: &str = "dayEntries";
    pub const MEDICATIONS: &str = "medications";
    pub const MEDICATION_LOGS: &str = "medicationLogs";
    pub const NOTIFICATION_PREFERENCES: &str = "notificationPreferences";
}

/// Error type for key-value store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Lock error
    #[error("Lock error: {0}")]
    Lock(String),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(error: PoisonError<T>) -> Self {
        StoreError::Lock(error.to_string())
    }
}

/// Async key-value store consumed by the repositories
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove `key`; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key).await
    }
}
