//! Cycle tracking service
//!
//! Settings edits, day logging with period detection, and the prediction,
//! phase and statistics views over the stored data.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use thiserror::Error;
use tracing::{debug, error, info};
use validator::Validate;

use luna_track_data::repository::{CycleRepositoryTrait, RepositoryError};

use crate::entities::conversions;
use crate::entities::requests::describe_validation_errors;
use crate::entities::{
    CyclePhase, CyclePrediction, CycleRecord, CycleSettings, CycleStatistics, DayEntry, FlowLevel,
    UpdateCycleSettingsRequest,
};
use crate::services::phase::classify;
use crate::services::prediction::{cycle_statistics, parse_calendar_date, predict_at};

/// Shortest gap between two period starts recorded as a cycle
pub const MIN_RECORDED_CYCLE_DAYS: i64 = 15;

/// Longest gap between two period starts recorded as a cycle
pub const MAX_RECORDED_CYCLE_DAYS: i64 = 60;

/// Cycle tracking service errors
#[derive(Debug, Error)]
pub enum CycleServiceError {
    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Repository error
    #[error("Repository error: {0}")]
    RepositoryError(String),
}

/// Trait for cycle tracking operations
#[async_trait]
pub trait CycleTrackingServiceTrait: Send + Sync {
    /// Stored settings; defaults when they cannot be read
    async fn load_settings(&self) -> CycleSettings;

    /// Prediction from the stored settings and history
    async fn current_prediction(&self, today: NaiveDate) -> CyclePrediction;

    /// Phase of `today`
    async fn current_phase(&self, today: NaiveDate) -> CyclePhase;

    /// Statistics over the recorded history
    async fn statistics(&self) -> CycleStatistics;

    /// Validate and store new settings
    async fn update_settings(&self, request: UpdateCycleSettingsRequest) -> Result<CycleSettings, CycleServiceError>;

    /// Store a day entry and update the period bookkeeping
    async fn log_day(&self, entry: DayEntry) -> Result<DayEntry, CycleServiceError>;

    /// Delete the entry for `date`
    async fn delete_day(&self, date: NaiveDate) -> Result<(), CycleServiceError>;
}

/// Cycle tracking service over a cycle repository
pub struct CycleTrackingService<R: CycleRepositoryTrait> {
    repository: R,
}

impl<R: CycleRepositoryTrait> CycleTrackingService<R> {
    /// Create a new cycle tracking service
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    /// Map repository errors to service errors
    fn map_repo_error(&self, err: RepositoryError) -> CycleServiceError {
        match err {
            RepositoryError::NotFound(msg) => CycleServiceError::NotFound(msg),
            RepositoryError::Validation(msg) => CycleServiceError::ValidationError(msg),
            _ => CycleServiceError::RepositoryError(err.to_string()),
        }
    }

    async fn load_history(&self) -> Vec<CycleRecord> {
        self.repository.get_history().await.unwrap_or_else(|e| {
            error!("Failed to read cycle history: {}", e);
            Vec::new()
        })
    }

    async fn load_entries(&self) -> Vec<DayEntry> {
        self.repository.get_entries().await.unwrap_or_else(|e| {
            error!("Failed to read day entries: {}", e);
            Vec::new()
        })
    }

    /// Whether `date` had bleeding logged. Read failures count as no entry.
    async fn had_flow_on(&self, date: NaiveDate) -> bool {
        match self.repository.get_entry(date).await {
            Ok(entry) => entry.map(|e| is_bleeding(e.flow)).unwrap_or(false),
            Err(e) => {
                error!("Failed to read entry for {}: {}", date, e);
                false
            }
        }
    }

    /// Start a new period or extend the current one after a flow entry on `date`
    async fn track_period(&self, date: NaiveDate, previous_day_flow: bool) -> Result<(), CycleServiceError> {
        let mut settings = self.repository.get_settings().await.map_err(|e| self.map_repo_error(e))?;
        let start = parse_calendar_date(&settings.last_period_start);
        let end = settings.last_period_end.as_deref().and_then(parse_calendar_date);

        let starts_new_period = !previous_day_flow
            && start.map_or(true, |s| (date - s).num_days() >= i64::from(settings.period_length));

        if starts_new_period {
            if let Some(start) = start {
                let length = (date - start).num_days();
                if (MIN_RECORDED_CYCLE_DAYS..=MAX_RECORDED_CYCLE_DAYS).contains(&length) {
                    self.repository
                        .append_record(CycleRecord {
                            start_date: start,
                            end_date: date - Duration::days(1),
                            length: length as u32,
                        })
                        .await
                        .map_err(|e| self.map_repo_error(e))?;
                    info!("Recorded a {}-day cycle starting {}", length, start);
                } else {
                    debug!("Not recording a {}-day cycle starting {}", length, start);
                }
            }

            let label = format_date(date);
            settings.last_period_start = label.clone();
            settings.last_period_end = Some(label);
        } else {
            match start {
                Some(start) if date >= start && end.map_or(true, |e| date > e) => {
                    settings.last_period_end = Some(format_date(date));
                }
                _ => return Ok(()),
            }
        }

        self.repository
            .save_settings(&settings)
            .await
            .map_err(|e| self.map_repo_error(e))
    }
}

fn is_bleeding(flow: FlowLevel) -> bool {
    flow.is_flow() && flow != FlowLevel::Spotting
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[async_trait]
impl<R: CycleRepositoryTrait> CycleTrackingServiceTrait for CycleTrackingService<R> {
    async fn load_settings(&self) -> CycleSettings {
        self.repository.get_settings().await.unwrap_or_else(|e| {
            error!("Failed to read cycle settings: {}", e);
            CycleSettings::default()
        })
    }

    async fn current_prediction(&self, today: NaiveDate) -> CyclePrediction {
        let settings = self.load_settings().await;
        let history = self.load_history().await;
        predict_at(&settings, &history, today)
    }

    async fn current_phase(&self, today: NaiveDate) -> CyclePhase {
        let settings = self.load_settings().await;
        let history = self.load_history().await;
        let entries = self.load_entries().await;

        let prediction = predict_at(&settings, &history, today);
        classify(today, &settings, &prediction, &entries)
    }

    async fn statistics(&self) -> CycleStatistics {
        cycle_statistics(&self.load_history().await)
    }

    async fn update_settings(&self, request: UpdateCycleSettingsRequest) -> Result<CycleSettings, CycleServiceError> {
        if let Err(validation_errors) = request.validate() {
            return Err(CycleServiceError::ValidationError(describe_validation_errors(
                &validation_errors,
            )));
        }

        let settings = conversions::convert_to_data_settings(&request);
        self.repository
            .save_settings(&settings)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        info!(
            "Cycle settings updated: {} day cycle, {} day period",
            settings.cycle_length, settings.period_length
        );
        Ok(settings)
    }

    async fn log_day(&self, entry: DayEntry) -> Result<DayEntry, CycleServiceError> {
        let date = entry.date;
        let previous_day_flow = self.had_flow_on(date - Duration::days(1)).await;

        let entry = self
            .repository
            .upsert_entry(entry)
            .await
            .map_err(|e| self.map_repo_error(e))?;

        if is_bleeding(entry.flow) {
            self.track_period(date, previous_day_flow).await?;
        }
        Ok(entry)
    }

    async fn delete_day(&self, date: NaiveDate) -> Result<(), CycleServiceError> {
        let existed = self
            .repository
            .delete_entry(date)
            .await
            .map_err(|e| self.map_repo_error(e))?;
        if !existed {
            return Err(CycleServiceError::NotFound(format!("No entry for {}", date)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PhaseType;
    use crate::testing::UnreliableStore;
    use luna_track_data::repository::CycleRepository;
    use luna_track_data::store::{keys, InMemoryKeyValueStore};

    fn date(text: &str) -> NaiveDate {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
    }

    async fn service_with_start(start: &str) -> CycleTrackingService<CycleRepository<InMemoryKeyValueStore>> {
        let repository = CycleRepository::new(InMemoryKeyValueStore::new());
        repository
            .save_settings(&CycleSettings {
                last_period_start: start.to_string(),
                ..CycleSettings::default()
            })
            .await
            .unwrap();
        CycleTrackingService::new(repository)
    }

    fn flow(day: &str, level: FlowLevel) -> DayEntry {
        DayEntry::new(date(day)).with_flow(level)
    }

    #[tokio::test]
    async fn test_new_period_records_finished_cycle() {
        let service = service_with_start("2024-01-01").await;

        service.log_day(flow("2024-01-29", FlowLevel::Medium)).await.unwrap();

        let settings = service.load_settings().await;
        assert_eq!(settings.last_period_start, "2024-01-29");
        assert_eq!(settings.last_period_end.as_deref(), Some("2024-01-29"));

        let history = service.repository.get_history().await.unwrap();
        assert_eq!(
            history,
            vec![CycleRecord {
                start_date: date("2024-01-01"),
                end_date: date("2024-01-28"),
                length: 28,
            }]
        );
    }

    #[tokio::test]
    async fn test_consecutive_flow_extends_period() {
        let service = service_with_start("2024-01-01").await;

        service.log_day(flow("2024-01-29", FlowLevel::Heavy)).await.unwrap();
        service.log_day(flow("2024-01-30", FlowLevel::Medium)).await.unwrap();
        service.log_day(flow("2024-01-31", FlowLevel::Light)).await.unwrap();

        let settings = service.load_settings().await;
        assert_eq!(settings.last_period_start, "2024-01-29");
        assert_eq!(settings.last_period_end.as_deref(), Some("2024-01-31"));
        assert_eq!(service.repository.get_history().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_gap_inside_period_is_not_new_period() {
        let service = service_with_start("2024-01-01").await;

        service.log_day(flow("2024-01-03", FlowLevel::Light)).await.unwrap();

        let settings = service.load_settings().await;
        assert_eq!(settings.last_period_start, "2024-01-01");
        assert_eq!(settings.last_period_end.as_deref(), Some("2024-01-03"));
        assert!(service.repository.get_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_spotting_and_none_do_not_start_period() {
        let service = service_with_start("2024-01-01").await;

        service.log_day(flow("2024-01-20", FlowLevel::Spotting)).await.unwrap();
        service.log_day(flow("2024-01-21", FlowLevel::None)).await.unwrap();

        assert_eq!(service.load_settings().await.last_period_start, "2024-01-01");
        assert_eq!(service.repository.get_entries().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_implausible_cycle_not_recorded() {
        let service = service_with_start("2024-01-01").await;

        service.log_day(flow("2024-01-10", FlowLevel::Medium)).await.unwrap();

        assert_eq!(service.load_settings().await.last_period_start, "2024-01-10");
        assert!(service.repository.get_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_period_without_recorded_start() {
        let service = service_with_start("").await;

        service.log_day(flow("2024-03-05", FlowLevel::Medium)).await.unwrap();

        assert_eq!(service.load_settings().await.last_period_start, "2024-03-05");
        assert!(service.repository.get_history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_phase_reflects_logged_flow() {
        let service = service_with_start("2024-01-01").await;
        // Fertile day by prediction, but bleeding is logged
        service
            .repository
            .upsert_entry(flow("2024-01-12", FlowLevel::Light))
            .await
            .unwrap();

        let phase = service.current_phase(date("2024-01-12")).await;
        assert_eq!(phase.phase_type, PhaseType::Period);
        assert_eq!(service.current_phase(date("2024-01-13")).await.phase_type, PhaseType::Fertile);
    }

    #[tokio::test]
    async fn test_update_settings_validation() {
        let service = service_with_start("").await;
        let mut request = UpdateCycleSettingsRequest {
            cycle_length: 45,
            period_length: 5,
            luteal_phase: 14,
            last_period_start: "2024-01-01".to_string(),
            last_period_end: None,
        };

        let err = service.update_settings(request.clone()).await.unwrap_err();
        assert!(matches!(err, CycleServiceError::ValidationError(ref msg) if msg.contains("cycle_length")));

        request.cycle_length = 30;
        let saved = service.update_settings(request).await.unwrap();
        assert_eq!(saved.cycle_length, 30);
        assert_eq!(service.load_settings().await.cycle_length, 30);
        assert_eq!(
            service.current_prediction(date("2024-01-02")).await.next_period_start,
            date("2024-01-31")
        );
    }

    #[tokio::test]
    async fn test_read_failures_fall_back_to_defaults() {
        let store = UnreliableStore::new();
        let service = CycleTrackingService::new(CycleRepository::new(store.clone()));
        store.fail_reads(true);

        assert_eq!(service.load_settings().await, CycleSettings::default());
        let today = date("2024-06-20");
        assert_eq!(
            service.current_prediction(today).await,
            predict_at(&CycleSettings::default(), &[], today)
        );
        assert_eq!(service.statistics().await, CycleStatistics::default());
    }

    #[tokio::test]
    async fn test_out_of_range_stored_length_predicts_from_defaults() {
        let store = InMemoryKeyValueStore::with_entries([(
            keys::CYCLE_SETTINGS,
            r#"{"cycleLength":4000000000,"lastPeriodStart":"2024-01-01"}"#,
        )]);
        let service = CycleTrackingService::new(CycleRepository::new(store));
        let today = date("2024-06-01");

        assert_eq!(service.load_settings().await, CycleSettings::default());
        assert_eq!(
            service.current_prediction(today).await,
            predict_at(&CycleSettings::default(), &[], today)
        );
    }

    #[tokio::test]
    async fn test_write_failure_surfaces() {
        let store = UnreliableStore::new();
        store.fail_writes(true);
        let service = CycleTrackingService::new(CycleRepository::new(store));

        let err = service.log_day(flow("2024-01-02", FlowLevel::Light)).await.unwrap_err();
        assert!(matches!(err, CycleServiceError::RepositoryError(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_day() {
        let service = service_with_start("").await;
        let err = service.delete_day(date("2024-01-01")).await.unwrap_err();
        assert!(matches!(err, CycleServiceError::NotFound(_)));
    }
}
