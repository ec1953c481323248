use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Medication, MedicationLog};
use crate::store::{keys, KeyValueStore};
use super::errors::RepositoryError;
use super::json;

/// Repository trait for medications and the adherence log
#[async_trait]
pub trait MedicationRepositoryTrait: Send + Sync {
    /// All medications, in insertion order
    async fn list_medications(&self) -> Result<Vec<Medication>, RepositoryError>;

    /// A medication by id
    async fn get_medication(&self, id: &str) -> Result<Option<Medication>, RepositoryError>;

    /// Insert or replace the medication with `medication.id`
    async fn upsert_medication(&self, medication: Medication) -> Result<Medication, RepositoryError>;

    /// Hard-delete a medication; returns whether one existed
    async fn remove_medication(&self, id: &str) -> Result<bool, RepositoryError>;

    /// All adherence logs
    async fn list_logs(&self) -> Result<Vec<MedicationLog>, RepositoryError>;

    /// Adherence logs for one date
    async fn logs_for_date(&self, date: NaiveDate) -> Result<Vec<MedicationLog>, RepositoryError>;

    /// Set `taken` for the (medication, date, time) slot, creating the log if needed.
    /// Calling it twice with the same arguments leaves a single log.
    async fn toggle_medication_log(
        &self,
        medication_id: &str,
        date: NaiveDate,
        time: &str,
        taken: bool,
    ) -> Result<MedicationLog, RepositoryError>;
}

/// Store-backed medication repository
#[derive(Debug, Clone)]
pub struct MedicationRepository<S> {
    store: S,
}

impl<S: KeyValueStore> MedicationRepository<S> {
    /// Create a new repository over `store`
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: KeyValueStore> MedicationRepositoryTrait for MedicationRepository<S> {
    async fn list_medications(&self) -> Result<Vec<Medication>, RepositoryError> {
        Ok(json::load_list(&self.store, keys::MEDICATIONS)
            .await?
            .unwrap_or_default())
    }

    async fn get_medication(&self, id: &str) -> Result<Option<Medication>, RepositoryError> {
        let medications = self.list_medications().await?;
        Ok(medications.into_iter().find(|m| m.id == id))
    }

    async fn upsert_medication(&self, medication: Medication) -> Result<Medication, RepositoryError> {
        if medication.id.is_empty() {
            return Err(RepositoryError::Validation("Medication id must not be empty".to_string()));
        }

        let mut medications = self.list_medications().await?;
        match medications.iter_mut().find(|m| m.id == medication.id) {
            Some(existing) => *existing = medication.clone(),
            None => medications.push(medication.clone()),
        }

        json::save(&self.store, keys::MEDICATIONS, &medications).await?;
        Ok(medication)
    }

    async fn remove_medication(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut medications = self.list_medications().await?;
        let before = medications.len();
        medications.retain(|m| m.id != id);

        if medications.len() == before {
            return Ok(false);
        }

        json::save(&self.store, keys::MEDICATIONS, &medications).await?;
        Ok(true)
    }

    async fn list_logs(&self) -> Result<Vec<MedicationLog>, RepositoryError> {
        Ok(json::load_list(&self.store, keys::MEDICATION_LOGS)
            .await?
            .unwrap_or_default())
    }

    async fn logs_for_date(&self, date: NaiveDate) -> Result<Vec<MedicationLog>, RepositoryError> {
        let logs = self.list_logs().await?;
        Ok(logs.into_iter().filter(|l| l.date == date).collect())
    }

    async fn toggle_medication_log(
        &self,
        medication_id: &str,
        date: NaiveDate,
        time: &str,
        taken: bool,
    ) -> Result<MedicationLog, RepositoryError> {
        let mut logs = self.list_logs().await?;

        let log = match logs.iter_mut().find(|l| l.is_slot(medication_id, date, time)) {
            Some(existing) => {
                existing.taken = taken;
                existing.clone()
            }
            None => {
                let log = MedicationLog {
                    id: Uuid::new_v4().to_string(),
                    medication_id: medication_id.to_string(),
                    date,
                    time: time.to_string(),
                    taken,
                };
                logs.push(log.clone());
                log
            }
        };

        debug!("Medication log {} {} {} -> taken={}", medication_id, date, time, taken);
        json::save(&self.store, keys::MEDICATION_LOGS, &logs).await?;
        Ok(log)
    }
}
