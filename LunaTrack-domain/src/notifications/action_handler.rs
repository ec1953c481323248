//! Handling of "take" and "snooze" taps on medication reminders
//!
//! Platforms may deliver the same action more than once. Taking is an upsert
//! on the adherence slot followed by cancels, so repeated deliveries converge
//! on the same state. Every platform call is best-effort: a failure is logged
//! and the remaining calls still run.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use luna_track_data::repository::MedicationRepositoryTrait;

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::time_window::format_hhmm;

use super::copy::{snooze_copy, Language};
use super::dispatch::{NotificationDispatcherTrait, NotificationRequest, MEDICATION_REMINDER_CATEGORY};
use super::ids::{snooze_range, MedicationIdAllocator};
use super::payload::{MedicationReminderPayload, NotificationPayload};

/// Button pressed on a medication reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MedicationAction {
    Take,
    Snooze,
    /// Tap on the notification body
    Open,
}

impl MedicationAction {
    pub fn parse(action_id: &str) -> Self {
        match action_id.trim().to_ascii_lowercase().as_str() {
            "take" => MedicationAction::Take,
            "snooze" => MedicationAction::Snooze,
            _ => MedicationAction::Open,
        }
    }
}

/// An action reported by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationActionEvent {
    pub action_id: String,
    /// Id of the notification the action came from, when the platform knows it
    #[serde(default)]
    pub notification_id: Option<i32>,
    #[serde(default)]
    pub payload: Value,
}

/// What the handler did with an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Not a medication action, or not one this handler processes
    Ignored,
    Taken {
        medication_id: String,
        date: NaiveDate,
        time: String,
    },
    Snoozed {
        notification_id: i32,
        deliver_at: NaiveDateTime,
    },
    /// The snoozed reminder could not be scheduled
    SnoozeFailed { medication_id: String },
}

/// Processes medication reminder actions
pub struct MedicationActionHandler<R, D> {
    repository: R,
    dispatcher: D,
    clock: Arc<dyn Clock>,
    allocator: MedicationIdAllocator,
    config: SchedulerConfig,
}

impl<R, D> MedicationActionHandler<R, D>
where
    R: MedicationRepositoryTrait,
    D: NotificationDispatcherTrait,
{
    pub fn new(repository: R, dispatcher: D, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            repository,
            dispatcher,
            clock,
            allocator: MedicationIdAllocator::new(),
            config,
        }
    }

    /// Handle one action event
    pub async fn handle_action(&self, event: &NotificationActionEvent) -> ActionOutcome {
        let action = MedicationAction::parse(&event.action_id);
        if action == MedicationAction::Open {
            debug!("Leaving action {:?} to the host", event.action_id);
            return ActionOutcome::Ignored;
        }

        let Some(NotificationPayload::MedicationReminder(reminder)) = NotificationPayload::from_value(&event.payload)
        else {
            debug!("Ignoring {:?} action without a medication payload", event.action_id);
            return ActionOutcome::Ignored;
        };

        match action {
            MedicationAction::Take => self.take(&reminder, event.notification_id).await,
            MedicationAction::Snooze => self.snooze(&reminder).await,
            MedicationAction::Open => ActionOutcome::Ignored,
        }
    }

    async fn take(&self, reminder: &MedicationReminderPayload, notification_id: Option<i32>) -> ActionOutcome {
        let date = self.clock.today();
        let time = reminder.slot_time().to_string();

        match self
            .repository
            .toggle_medication_log(&reminder.medication_id, date, &time, true)
            .await
        {
            Ok(_) => info!("Logged {} as taken at {} on {}", reminder.medication_id, time, date),
            Err(e) => error!("Failed to log medication {} as taken: {}", reminder.medication_id, e),
        }

        if let Some(id) = notification_id {
            if let Err(e) = self.dispatcher.cancel(vec![id]).await {
                warn!("Failed to cancel notification {}: {}", id, e);
            }
        }

        let snoozes = snooze_range(&reminder.medication_id);
        match self.dispatcher.list_pending().await {
            Ok(pending) => {
                let ids: Vec<i32> = pending.into_iter().filter(|id| snoozes.contains(id)).collect();
                if !ids.is_empty() {
                    if let Err(e) = self.dispatcher.cancel(ids).await {
                        warn!("Failed to cancel snoozes of {}: {}", reminder.medication_id, e);
                    }
                }
            }
            Err(e) => warn!("Could not list pending snoozes of {}: {}", reminder.medication_id, e),
        }

        ActionOutcome::Taken {
            medication_id: reminder.medication_id.clone(),
            date,
            time,
        }
    }

    async fn snooze(&self, reminder: &MedicationReminderPayload) -> ActionOutcome {
        let deliver_at = self.clock.now() + Duration::minutes(self.config.snooze_minutes);
        let id = self
            .allocator
            .allocate_snooze_id(&reminder.medication_id, self.clock.now_millis());
        let (title, body) = snooze_copy(&reminder.medication_name, Language::from_tag(&self.config.language));

        let request = NotificationRequest {
            id,
            title,
            body,
            deliver_at,
            channel: self.config.medication_channel.clone(),
            action_category: Some(MEDICATION_REMINDER_CATEGORY.to_string()),
            payload: Some(NotificationPayload::MedicationReminder(
                reminder.snoozed(&format_hhmm(deliver_at.time())),
            )),
        };

        match self.dispatcher.schedule_batch(vec![request]).await {
            Ok(report) if report.is_success() => {
                info!("Snoozed {} until {}", reminder.medication_id, deliver_at);
                ActionOutcome::Snoozed {
                    notification_id: id,
                    deliver_at,
                }
            }
            Ok(report) => {
                for failure in report.failed {
                    error!("Snooze {} rejected: {}", failure.id, failure.reason);
                }
                ActionOutcome::SnoozeFailed {
                    medication_id: reminder.medication_id.clone(),
                }
            }
            Err(e) => {
                error!("Failed to schedule snooze for {}: {}", reminder.medication_id, e);
                ActionOutcome::SnoozeFailed {
                    medication_id: reminder.medication_id.clone(),
                }
            }
        }
    }
}
