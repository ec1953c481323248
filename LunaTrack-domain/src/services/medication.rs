//! Medication service

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use validator::Validate;

use luna_track_data::repository::{MedicationRepositoryTrait, RepositoryError};

use crate::clock::Clock;
use crate::entities::conversions;
use crate::entities::requests::describe_validation_errors;
use crate::entities::{Medication, MedicationLog, SaveMedicationRequest};
use crate::notifications::{
    MedicationNotificationScheduler, NotificationDispatcherTrait, ScheduleOutcome, SchedulingError,
};

/// Medication service errors
#[derive(Debug, Error)]
pub enum MedicationServiceError {
    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Not found error
    #[error("Medication not found: {0}")]
    NotFound(String),

    /// Repository error
    #[error("Repository error: {0}")]
    RepositoryError(String),
}

/// Trait for medication operations
#[async_trait]
pub trait MedicationServiceTrait: Send + Sync {
    /// Create or edit a medication and refresh its reminders
    async fn save_medication(&self, request: SaveMedicationRequest) -> Result<Medication, MedicationServiceError>;

    /// Delete a medication and its pending reminders
    async fn remove_medication(&self, id: &str) -> Result<(), MedicationServiceError>;

    /// Pause or resume a medication's reminders
    async fn set_active(&self, id: &str, active: bool) -> Result<Medication, MedicationServiceError>;

    /// Record whether a reminder slot was taken
    async fn toggle_medication_log(
        &self,
        medication_id: &str,
        date: NaiveDate,
        time: &str,
        taken: bool,
    ) -> Result<MedicationLog, MedicationServiceError>;

    /// Adherence logs for one date
    async fn logs_for_date(&self, date: NaiveDate) -> Result<Vec<MedicationLog>, MedicationServiceError>;

    /// Replace every pending medication reminder from the stored list
    async fn reschedule_all(&self) -> ScheduleOutcome;
}

/// Medication service keeping stored medications and their reminders in step
pub struct MedicationService<R: MedicationRepositoryTrait, D: NotificationDispatcherTrait> {
    repository: R,
    scheduler: Arc<MedicationNotificationScheduler<D>>,
    clock: Arc<dyn Clock>,
    // Serialises edits so a cancel and the following reschedule of one
    // medication never interleave with another edit
    edit_lock: Mutex<()>,
}

impl<R: MedicationRepositoryTrait, D: NotificationDispatcherTrait> MedicationService<R, D> {
    /// Create a new medication service
    pub fn new(repository: R, scheduler: Arc<MedicationNotificationScheduler<D>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            scheduler,
            clock,
            edit_lock: Mutex::new(()),
        }
    }

    /// Map repository errors to service errors
    fn map_repo_error(&self, err: RepositoryError) -> MedicationServiceError {
        match err {
            RepositoryError::NotFound(msg) => MedicationServiceError::NotFound(msg),
            RepositoryError::Validation(msg) => MedicationServiceError::ValidationError(msg),
            _ => MedicationServiceError::RepositoryError(err.to_string()),
        }
    }

    /// Cancel a medication's reminders and schedule them again when active
    async fn refresh_reminders(&self, medication: &Medication) {
        if let Err(e) = self.scheduler.cancel_for_medication(&medication.id).await {
            error!("Failed to cancel reminders of {}: {}", medication.id, e);
        }

        if medication.is_active {
            let outcome = self.scheduler.schedule_one(medication).await;
            for err in &outcome.errors {
                warn!("Reminder for {} not scheduled: {}", medication.id, err);
            }
        }
    }
}

#[async_trait]
impl<R, D> MedicationServiceTrait for MedicationService<R, D>
where
    R: MedicationRepositoryTrait,
    D: NotificationDispatcherTrait,
{
    async fn save_medication(&self, request: SaveMedicationRequest) -> Result<Medication, MedicationServiceError> {
        if let Err(validation_errors) = request.validate() {
            return Err(MedicationServiceError::ValidationError(describe_validation_errors(
                &validation_errors,
            )));
        }

        let _guard = self.edit_lock.lock().await;

        let existing = match request.id.as_deref() {
            Some(id) => self
                .repository
                .get_medication(id)
                .await
                .map_err(|e| self.map_repo_error(e))?,
            None => None,
        };

        let medication =
            conversions::convert_to_data_medication(request, existing.as_ref(), self.clock.now().and_utc());
        let medication = self
            .repository
            .upsert_medication(medication)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        self.refresh_reminders(&medication).await;
        info!("Saved medication {}", medication.id);
        Ok(medication)
    }

    async fn remove_medication(&self, id: &str) -> Result<(), MedicationServiceError> {
        let _guard = self.edit_lock.lock().await;

        let existed = self
            .repository
            .remove_medication(id)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        if let Err(e) = self.scheduler.cancel_for_medication(id).await {
            error!("Failed to cancel reminders of {}: {}", id, e);
        }

        if !existed {
            return Err(MedicationServiceError::NotFound(id.to_string()));
        }
        info!("Removed medication {}", id);
        Ok(())
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<Medication, MedicationServiceError> {
        let _guard = self.edit_lock.lock().await;

        let mut medication = self
            .repository
            .get_medication(id)
            .await
            .map_err(|e| self.map_repo_error(e))?
            .ok_or_else(|| MedicationServiceError::NotFound(id.to_string()))?;

        medication.is_active = active;
        let medication = self
            .repository
            .upsert_medication(medication)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        self.refresh_reminders(&medication).await;
        Ok(medication)
    }

    async fn toggle_medication_log(
        &self,
        medication_id: &str,
        date: NaiveDate,
        time: &str,
        taken: bool,
    ) -> Result<MedicationLog, MedicationServiceError> {
        self.repository
            .toggle_medication_log(medication_id, date, time, taken)
            .await
            .map_err(|e| self.map_repo_error(e))
    }

    async fn logs_for_date(&self, date: NaiveDate) -> Result<Vec<MedicationLog>, MedicationServiceError> {
        self.repository
            .logs_for_date(date)
            .await
            .map_err(|e| self.map_repo_error(e))
    }

    async fn reschedule_all(&self) -> ScheduleOutcome {
        let medications = match self.repository.list_medications().await {
            Ok(medications) => medications,
            Err(e) => {
                error!("Failed to read medications, reminders left as they are: {}", e);
                return ScheduleOutcome::failed(SchedulingError::Storage(e.to_string()));
            }
        };
        self.scheduler.schedule_all(&medications).await
    }
}
