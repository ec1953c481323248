use async_trait::async_trait;

use crate::models::NotificationPreferences;
use crate::store::{keys, KeyValueStore};
use super::errors::RepositoryError;
use super::json;

/// Repository trait for notification preferences
#[async_trait]
pub trait PreferencesRepositoryTrait: Send + Sync {
    /// Stored preferences, or the defaults when nothing usable is stored
    async fn get_preferences(&self) -> Result<NotificationPreferences, RepositoryError>;

    /// Replace the stored preferences
    async fn save_preferences(&self, preferences: &NotificationPreferences) -> Result<(), RepositoryError>;
}

/// Store-backed preferences repository
#[derive(Debug, Clone)]
pub struct PreferencesRepository<S> {
    store: S,
}

impl<S: KeyValueStore> PreferencesRepository<S> {
    /// Create a new repository over `store`
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: KeyValueStore> PreferencesRepositoryTrait for PreferencesRepository<S> {
    async fn get_preferences(&self) -> Result<NotificationPreferences, RepositoryError> {
        Ok(json::load_object(&self.store, keys::NOTIFICATION_PREFERENCES)
            .await?
            .unwrap_or_default())
    }

    async fn save_preferences(&self, preferences: &NotificationPreferences) -> Result<(), RepositoryError> {
        json::save(&self.store, keys::NOTIFICATION_PREFERENCES, preferences).await
    }
}
