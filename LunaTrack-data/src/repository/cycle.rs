use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{CycleRecord, CycleSettings, DayEntry};
use crate::store::{keys, KeyValueStore};
use super::errors::RepositoryError;
use super::json;

/// Number of completed cycles kept in the history
pub const MAX_CYCLE_HISTORY: usize = 12;

/// Repository trait for cycle settings, history and day entries
#[async_trait]
pub trait CycleRepositoryTrait: Send + Sync {
    /// Stored settings, or the defaults when nothing usable is stored
    async fn get_settings(&self) -> Result<CycleSettings, RepositoryError>;

    /// Replace the stored settings
    async fn save_settings(&self, settings: &CycleSettings) -> Result<(), RepositoryError>;

    /// Completed cycles, oldest first
    async fn get_history(&self) -> Result<Vec<CycleRecord>, RepositoryError>;

    /// Append a completed cycle, evicting the oldest beyond the cap.
    /// Returns the history as stored.
    async fn append_record(&self, record: CycleRecord) -> Result<Vec<CycleRecord>, RepositoryError>;

    /// All day entries
    async fn get_entries(&self) -> Result<Vec<DayEntry>, RepositoryError>;

    /// The entry for `date`, if one was logged
    async fn get_entry(&self, date: NaiveDate) -> Result<Option<DayEntry>, RepositoryError>;

    /// Insert or overwrite the entry for `entry.date`
    async fn upsert_entry(&self, entry: DayEntry) -> Result<DayEntry, RepositoryError>;

    /// Delete the entry for `date`; returns whether one existed
    async fn delete_entry(&self, date: NaiveDate) -> Result<bool, RepositoryError>;
}

/// Store-backed cycle repository
#[derive(Debug, Clone)]
pub struct CycleRepository<S> {
    store: S,
}

impl<S: KeyValueStore> CycleRepository<S> {
    /// Create a new repository over `store`
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: KeyValueStore> CycleRepositoryTrait for CycleRepository<S> {
    async fn get_settings(&self) -> Result<CycleSettings, RepositoryError> {
        let settings: Option<CycleSettings> = json::load_object(&self.store, keys::CYCLE_SETTINGS).await?;
        match settings {
            Some(settings) if settings.is_within_bounds() => Ok(settings),
            Some(settings) => {
                warn!(
                    "Ignoring stored cycle settings out of range: cycle={}, period={}, luteal={}",
                    settings.cycle_length, settings.period_length, settings.luteal_phase
                );
                Ok(CycleSettings::default())
            }
            None => Ok(CycleSettings::default()),
        }
    }

    async fn save_settings(&self, settings: &CycleSettings) -> Result<(), RepositoryError> {
        json::save(&self.store, keys::CYCLE_SETTINGS, settings).await
    }

    async fn get_history(&self) -> Result<Vec<CycleRecord>, RepositoryError> {
        Ok(json::load_list(&self.store, keys::CYCLE_HISTORY)
            .await?
            .unwrap_or_default())
    }

    async fn append_record(&self, record: CycleRecord) -> Result<Vec<CycleRecord>, RepositoryError> {
        let mut history = self.get_history().await?;
        history.push(record);

        if history.len() > MAX_CYCLE_HISTORY {
            let overflow = history.len() - MAX_CYCLE_HISTORY;
            debug!("Evicting {} oldest cycle record(s)", overflow);
            history.drain(..overflow);
        }

        json::save(&self.store, keys::CYCLE_HISTORY, &history).await?;
        Ok(history)
    }

    async fn get_entries(&self) -> Result<Vec<DayEntry>, RepositoryError> {
        Ok(json::load_list(&self.store, keys::DAY_ENTRIES)
            .await?
            .unwrap_or_default())
    }

    async fn get_entry(&self, date: NaiveDate) -> Result<Option<DayEntry>, RepositoryError> {
        let entries = self.get_entries().await?;
        Ok(entries.into_iter().find(|e| e.date == date))
    }

    async fn upsert_entry(&self, entry: DayEntry) -> Result<DayEntry, RepositoryError> {
        let mut entries = self.get_entries().await?;

        match entries.iter_mut().find(|e| e.date == entry.date) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }

        json::save(&self.store, keys::DAY_ENTRIES, &entries).await?;
        Ok(entry)
    }

    async fn delete_entry(&self, date: NaiveDate) -> Result<bool, RepositoryError> {
        let mut entries = self.get_entries().await?;
        let before = entries.len();
        entries.retain(|e| e.date != date);

        if entries.len() == before {
            return Ok(false);
        }

        json::save(&self.store, keys::DAY_ENTRIES, &entries).await?;
        Ok(true)
    }
}
