//! Medication reminder scheduler
//!
//! Each active medication gets one notification per reminder time per day for
//! the scheduling horizon. Ids come from the medication grid in `ids`, so a
//! medication's reminders can be cancelled without tracking what was sent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, error, info, warn};

use luna_track_data::models::Medication;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::time_window::{format_hhmm, parse_hhmm};

use super::copy::{medication_copy, test_copy, Language};
use super::cycle_scheduler::submit_batch;
use super::dispatch::{
    ChannelSpec, DispatchError, NotificationDispatcherTrait, NotificationRequest, MEDICATION_REMINDER_CATEGORY,
};
use super::ids::{
    is_medication_id, medication_schedule_ids, schedule_id, snooze_range, MAX_REMINDER_TIMES, MEDICATION_TEST_ID,
};
use super::outcome::{ScheduleOutcome, SchedulingError};
use super::payload::{MedicationReminderPayload, NotificationPayload};

/// Schedules the medication notification family
pub struct MedicationNotificationScheduler<D> {
    dispatcher: D,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    scheduled_this_session: AtomicBool,
}

impl<D: NotificationDispatcherTrait> MedicationNotificationScheduler<D> {
    pub fn new(dispatcher: D, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            dispatcher,
            clock,
            config,
            scheduled_this_session: AtomicBool::new(false),
        }
    }

    /// Channel all medication reminders are delivered on
    pub fn channel(&self) -> ChannelSpec {
        ChannelSpec {
            id: self.config.medication_channel.clone(),
            name: "Medication reminders".to_string(),
            description: "Reminders to take your medications".to_string(),
        }
    }

    fn language(&self) -> Language {
        Language::from_tag(&self.config.language)
    }

    /// Descriptors for the upcoming reminders of one medication
    pub fn build_requests(&self, medication: &Medication) -> Vec<NotificationRequest> {
        if !medication.is_active || medication.reminder_times.is_empty() {
            return Vec::new();
        }

        let now = self.clock.now();
        let today = now.date();
        let (title, body) = medication_copy(&medication.name, &medication.dosage, self.language());

        let mut requests = Vec::new();
        for day in 0..self.config.schedule_days {
            let date = today + Duration::days(i64::from(day));

            for (index, label) in medication.reminder_times.iter().take(MAX_REMINDER_TIMES).enumerate() {
                let Some(time) = parse_hhmm(label) else {
                    debug!("Skipping malformed reminder time {:?} for {}", label, medication.id);
                    continue;
                };

                let deliver_at = date.and_time(time);
                if deliver_at <= now {
                    continue;
                }

                requests.push(NotificationRequest {
                    id: schedule_id(&medication.id, day, index),
                    title: title.clone(),
                    body: body.clone(),
                    deliver_at,
                    channel: self.config.medication_channel.clone(),
                    action_category: Some(MEDICATION_REMINDER_CATEGORY.to_string()),
                    payload: Some(NotificationPayload::MedicationReminder(MedicationReminderPayload::new(
                        &medication.id,
                        &medication.name,
                        &format_hhmm(time),
                    ))),
                });
            }
        }
        requests
    }

    /// Schedule the reminders of one medication in a single batch
    pub async fn schedule_one(&self, medication: &Medication) -> ScheduleOutcome {
        let requests = self.build_requests(medication);
        if requests.is_empty() {
            debug!("No upcoming reminders for medication {}", medication.id);
            return ScheduleOutcome::empty();
        }
        submit_batch(&self.dispatcher, requests).await
    }

    /// Replace every pending medication reminder
    pub async fn schedule_all(&self, medications: &[Medication]) -> ScheduleOutcome {
        let mut outcome = ScheduleOutcome::empty();

        if let Err(e) = self.cancel_pending(medications).await {
            error!("Failed to cancel previous medication reminders: {}", e);
            outcome.errors.push(e.into());
        }

        if let Err(e) = self.dispatcher.create_channel(self.channel()).await {
            warn!("Failed to create medication channel: {}", e);
        }

        match self.dispatcher.check_permission().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Notification permission not granted, medication reminders not scheduled");
                outcome.errors.push(SchedulingError::PermissionDenied);
                return outcome;
            }
            Err(e) => {
                error!("Failed to check notification permission: {}", e);
                outcome.errors.push(e.into());
                return outcome;
            }
        }

        for medication in medications.iter().filter(|m| m.is_active) {
            outcome.merge(self.schedule_one(medication).await);
        }

        info!(
            "Scheduled {} medication reminders for {} medications ({} errors)",
            outcome.scheduled_count,
            medications.iter().filter(|m| m.is_active).count(),
            outcome.errors.len()
        );
        outcome
    }

    /// Run `schedule_all` once per session; later calls return `None` until
    /// `reset_session`
    pub async fn schedule_all_once(&self, medications: &[Medication]) -> Option<ScheduleOutcome> {
        if self
            .scheduled_this_session
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Medication reminders already scheduled this session");
            return None;
        }
        Some(self.schedule_all(medications).await)
    }

    /// Allow the next `schedule_all_once` to run again
    pub fn reset_session(&self) {
        self.scheduled_this_session.store(false, Ordering::Release);
    }

    /// Cancel every pending medication notification
    pub async fn cancel_all(&self) -> Result<usize, DispatchError> {
        self.cancel_pending(&[]).await
    }

    /// Cancel a medication's reminder grid and its pending snoozes
    pub async fn cancel_for_medication(&self, medication_id: &str) -> Result<usize, DispatchError> {
        let mut ids = medication_schedule_ids(medication_id);

        let snoozes = snooze_range(medication_id);
        match self.dispatcher.list_pending().await {
            Ok(pending) => ids.extend(pending.into_iter().filter(|id| snoozes.contains(id))),
            Err(e) => warn!("Could not list pending snoozes for {}: {}", medication_id, e),
        }

        let count = ids.len();
        self.dispatcher.cancel(ids).await?;
        debug!("Cancelled {} notifications for medication {}", count, medication_id);
        Ok(count)
    }

    /// Schedule the diagnostic medication notification
    pub async fn send_test_notification(&self) -> ScheduleOutcome {
        match self.dispatcher.check_permission().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Notification permission not granted, test reminder not sent");
                return ScheduleOutcome::failed(SchedulingError::PermissionDenied);
            }
            Err(e) => return ScheduleOutcome::failed(e.into()),
        }

        if let Err(e) = self.dispatcher.create_channel(self.channel()).await {
            warn!("Failed to create medication channel: {}", e);
        }

        let text = test_copy(self.language());
        submit_batch(
            &self.dispatcher,
            vec![NotificationRequest {
                id: MEDICATION_TEST_ID,
                title: text.title.to_string(),
                body: text.body.to_string(),
                deliver_at: self.clock.now() + Duration::seconds(self.config.test_delay_seconds),
                channel: self.config.medication_channel.clone(),
                action_category: Some(MEDICATION_REMINDER_CATEGORY.to_string()),
                payload: Some(NotificationPayload::Test),
            }],
        )
        .await
    }

    /// Cancel pending ids in the medication band. When the pending list is
    /// unavailable, fall back to the grids of `known` medications.
    async fn cancel_pending(&self, known: &[Medication]) -> Result<usize, DispatchError> {
        let ids = match self.dispatcher.list_pending().await {
            Ok(pending) => pending.into_iter().filter(|id| is_medication_id(*id)).collect::<Vec<_>>(),
            Err(e) => {
                warn!("Could not list pending notifications, cancelling known reminder grids: {}", e);
                known
                    .iter()
                    .flat_map(|m| medication_schedule_ids(&m.id))
                    .chain(std::iter::once(MEDICATION_TEST_ID))
                    .collect()
            }
        };

        let count = ids.len();
        self.dispatcher.cancel(ids).await?;
        debug!("Cancelled {} medication notifications", count);
        Ok(count)
    }
}
