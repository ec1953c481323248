//! Cycle notification scheduler
//!
//! Turns a prediction and the user's preferences into dated notifications in
//! the cycle id bands. Every pass replaces the previous one: pending cycle
//! notifications are cancelled (and the cancel awaited) before the new batch is
//! submitted.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::{debug, error, info, warn};

use luna_track_data::models::{NotificationPreferences, NotificationType};

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::entities::CyclePrediction;
use crate::time_window::{next_valid_time, parse_hhmm, resolve_delivery_time, QuietHours};

use super::copy::{cycle_copy, test_copy, Language};
use super::dispatch::{ChannelSpec, DispatchError, NotificationDispatcherTrait, NotificationRequest};
use super::ids::{all_cycle_notification_ids, cycle_notification_id, is_cycle_notification_id, CYCLE_TEST_ID};
use super::outcome::{ScheduleOutcome, SchedulingError};
use super::payload::NotificationPayload;

const FALLBACK_PREFERRED_TIME: (u32, u32) = (9, 0);

/// Schedules the cycle notification family
pub struct CycleNotificationScheduler<D> {
    dispatcher: D,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl<D: NotificationDispatcherTrait> CycleNotificationScheduler<D> {
    pub fn new(dispatcher: D, clock: Arc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            dispatcher,
            clock,
            config,
        }
    }

    /// Channel all cycle notifications are delivered on
    pub fn channel(&self) -> ChannelSpec {
        ChannelSpec {
            id: self.config.cycle_channel.clone(),
            name: "Cycle reminders".to_string(),
            description: "Period, fertility and check-in reminders".to_string(),
        }
    }

    /// Replace all pending cycle notifications with those derived from
    /// `prediction` and `prefs`
    pub async fn schedule(
        &self,
        prediction: &CyclePrediction,
        prefs: &NotificationPreferences,
        language: Language,
    ) -> ScheduleOutcome {
        if !prefs.enabled {
            debug!("Cycle notifications disabled, clearing pending ones");
            if let Err(e) = self.cancel_all().await {
                error!("Failed to cancel cycle notifications: {}", e);
                return ScheduleOutcome::failed(e.into());
            }
            return ScheduleOutcome::empty();
        }

        match self.dispatcher.check_permission().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Notification permission not granted, cycle notifications not scheduled");
                return ScheduleOutcome::failed(SchedulingError::PermissionDenied);
            }
            Err(e) => {
                error!("Failed to check notification permission: {}", e);
                return ScheduleOutcome::failed(e.into());
            }
        }

        let mut outcome = ScheduleOutcome::empty();

        if let Err(e) = self.cancel_all().await {
            error!("Failed to cancel previous cycle notifications: {}", e);
            outcome.errors.push(e.into());
        }

        let requests = self.build_requests(prediction, prefs, language);
        if requests.is_empty() {
            info!("No upcoming cycle notifications to schedule");
            return outcome;
        }

        if let Err(e) = self.dispatcher.create_channel(self.channel()).await {
            warn!("Failed to create cycle notification channel: {}", e);
        }

        outcome.merge(submit_batch(&self.dispatcher, requests).await);
        info!(
            "Scheduled {} cycle notifications ({} errors)",
            outcome.scheduled_count,
            outcome.errors.len()
        );
        outcome
    }

    /// Descriptors for every cycle notification that should be pending now
    pub fn build_requests(
        &self,
        prediction: &CyclePrediction,
        prefs: &NotificationPreferences,
        language: Language,
    ) -> Vec<NotificationRequest> {
        let now = self.clock.now();
        let preferred = parse_hhmm(&prefs.preferred_time).unwrap_or_else(|| {
            debug!("Invalid preferred time {:?}, using 09:00", prefs.preferred_time);
            fallback_preferred_time()
        });
        let quiet = QuietHours::parse(&prefs.quiet_hours_start, &prefs.quiet_hours_end);

        let mut requests = Vec::new();
        for notification_type in NotificationType::ALL {
            if !prefs.is_type_enabled(notification_type) {
                continue;
            }

            let mut counter = 0;
            for date in self.event_dates(notification_type, prediction, now.date()) {
                let deliver_at = resolve_delivery_time(date, preferred, quiet.as_ref());
                if deliver_at <= now {
                    continue;
                }

                let text = cycle_copy(notification_type, prefs.privacy_mode, language);
                requests.push(NotificationRequest {
                    id: cycle_notification_id(notification_type, counter),
                    title: text.title.to_string(),
                    body: text.body.to_string(),
                    deliver_at,
                    channel: self.config.cycle_channel.clone(),
                    action_category: None,
                    payload: Some(NotificationPayload::CycleEvent {
                        notification_type,
                        date: date.format("%Y-%m-%d").to_string(),
                    }),
                });
                counter += 1;
            }
        }
        requests
    }

    /// Cancel every pending cycle notification. Returns how many ids were
    /// cancelled.
    pub async fn cancel_all(&self) -> Result<usize, DispatchError> {
        let ids = match self.dispatcher.list_pending().await {
            Ok(pending) => pending
                .into_iter()
                .filter(|id| is_cycle_notification_id(*id))
                .collect::<Vec<_>>(),
            Err(e) => {
                warn!("Could not list pending notifications, cancelling the whole cycle band: {}", e);
                all_cycle_notification_ids()
            }
        };

        let count = ids.len();
        self.dispatcher.cancel(ids).await?;
        debug!("Cancelled {} cycle notifications", count);
        Ok(count)
    }

    /// Schedule the diagnostic notification a few seconds from now
    pub async fn send_test_notification(&self, prefs: &NotificationPreferences) -> ScheduleOutcome {
        match self.dispatcher.check_permission().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("Notification permission not granted, test notification not sent");
                return ScheduleOutcome::failed(SchedulingError::PermissionDenied);
            }
            Err(e) => return ScheduleOutcome::failed(e.into()),
        }

        let quiet = QuietHours::parse(&prefs.quiet_hours_start, &prefs.quiet_hours_end);
        let deliver_at = next_valid_time(
            self.clock.now() + Duration::seconds(self.config.test_delay_seconds),
            quiet.as_ref(),
        );
        let text = test_copy(Language::from_tag(&self.config.language));

        if let Err(e) = self.dispatcher.create_channel(self.channel()).await {
            warn!("Failed to create cycle notification channel: {}", e);
        }

        submit_batch(
            &self.dispatcher,
            vec![NotificationRequest {
                id: CYCLE_TEST_ID,
                title: text.title.to_string(),
                body: text.body.to_string(),
                deliver_at,
                channel: self.config.cycle_channel.clone(),
                action_category: None,
                payload: Some(NotificationPayload::Test),
            }],
        )
        .await
    }

    fn event_dates(
        &self,
        notification_type: NotificationType,
        prediction: &CyclePrediction,
        today: NaiveDate,
    ) -> Vec<NaiveDate> {
        let shift = |date: NaiveDate, days: i64| date.checked_add_signed(Duration::days(days));
        let dates = match notification_type {
            NotificationType::PeriodApproaching => vec![shift(prediction.next_period_start, -2)],
            NotificationType::PeriodExpected => vec![Some(prediction.next_period_start)],
            NotificationType::PeriodLate => vec![shift(prediction.next_period_start, 1)],
            NotificationType::FertileStart => vec![Some(prediction.fertile_window_start)],
            NotificationType::OvulationDay => vec![Some(prediction.ovulation_date)],
            NotificationType::FertileEnding => vec![shift(prediction.fertile_window_end, -1)],
            NotificationType::PmsReminder => vec![Some(prediction.pms_start)],
            NotificationType::DailyCheckin => (0..i64::from(self.config.schedule_days))
                .map(|offset| shift(today, offset))
                .collect(),
        };
        dates.into_iter().flatten().collect()
    }
}

fn fallback_preferred_time() -> NaiveTime {
    let (hour, minute) = FALLBACK_PREFERRED_TIME;
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Submit one batch and turn the report into an outcome
pub(crate) async fn submit_batch<D: NotificationDispatcherTrait + ?Sized>(
    dispatcher: &D,
    requests: Vec<NotificationRequest>,
) -> ScheduleOutcome {
    let submitted = requests.len();
    match dispatcher.schedule_batch(requests).await {
        Ok(report) => {
            for failure in &report.failed {
                error!("Notification {} rejected: {}", failure.id, failure.reason);
            }
            ScheduleOutcome {
                scheduled_count: submitted.saturating_sub(report.failed.len()),
                errors: report
                    .failed
                    .into_iter()
                    .map(|f| SchedulingError::Rejected {
                        id: f.id,
                        reason: f.reason,
                    })
                    .collect(),
            }
        }
        Err(e) => {
            error!("Failed to schedule {} notifications: {}", submitted, e);
            ScheduleOutcome::failed(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use crate::clock::FixedClock;
    use crate::notifications::dispatch::MockNotificationDispatcherTrait;
    use crate::notifications::ids::BASE;
    use crate::services::prediction::predict_at;
    use crate::testing::{DispatchCall, RecordingDispatcher};
    use luna_track_data::models::{CycleSettings, PrivacyMode};

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M").unwrap()
    }

    fn nominal_prediction() -> CyclePrediction {
        let settings = CycleSettings {
            last_period_start: "2024-01-01".to_string(),
            ..CycleSettings::default()
        };
        predict_at(&settings, &[], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    fn scheduler_at(
        now: NaiveDateTime,
        dispatcher: Arc<RecordingDispatcher>,
    ) -> CycleNotificationScheduler<Arc<RecordingDispatcher>> {
        CycleNotificationScheduler::new(dispatcher, Arc::new(FixedClock::new(now)), SchedulerConfig::default())
    }

    fn visible_prefs() -> NotificationPreferences {
        NotificationPreferences {
            privacy_mode: PrivacyMode::Off,
            ..NotificationPreferences::default()
        }
    }

    #[tokio::test]
    async fn test_schedules_every_enabled_event() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let scheduler = scheduler_at(at("2024-01-01", "00:00"), dispatcher.clone());

        let outcome = scheduler
            .schedule(&nominal_prediction(), &visible_prefs(), Language::English)
            .await;

        assert_eq!(outcome.scheduled_count, 7);
        assert!(outcome.is_clean());
        assert_eq!(
            dispatcher.pending_ids(),
            vec![1000, 2000, 3000, 4000, 5000, 6000, 7000]
        );

        let ovulation = dispatcher.pending_request(5000).unwrap();
        assert_eq!(ovulation.deliver_at, at("2024-01-15", "09:00"));
        assert_eq!(ovulation.title, "Ovulation day");
        assert_eq!(ovulation.channel, "cycle-reminders");

        let fertile_ending = dispatcher.pending_request(6000).unwrap();
        assert_eq!(fertile_ending.deliver_at, at("2024-01-15", "09:00"));
        let approaching = dispatcher.pending_request(1000).unwrap();
        assert_eq!(approaching.deliver_at, at("2024-01-27", "09:00"));
    }

    #[tokio::test]
    async fn test_quiet_hours_defer_to_end_on_same_date() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let scheduler = scheduler_at(at("2024-01-01", "00:00"), dispatcher.clone());
        let prefs = NotificationPreferences {
            preferred_time: "23:00".to_string(),
            quiet_hours_start: "22:00".to_string(),
            quiet_hours_end: "08:00".to_string(),
            ..visible_prefs()
        };

        scheduler.schedule(&nominal_prediction(), &prefs, Language::English).await;

        let expected = dispatcher.pending_request(2000).unwrap();
        assert_eq!(expected.deliver_at, at("2024-01-29", "08:00"));
    }

    #[tokio::test]
    async fn test_past_events_are_dropped() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let scheduler = scheduler_at(at("2024-01-15", "10:00"), dispatcher.clone());

        let outcome = scheduler
            .schedule(&nominal_prediction(), &visible_prefs(), Language::English)
            .await;

        assert_eq!(outcome.scheduled_count, 4);
        assert_eq!(dispatcher.pending_ids(), vec![1000, 2000, 3000, 7000]);
    }

    #[tokio::test]
    async fn test_daily_checkin_skips_today_once_past() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let scheduler = scheduler_at(at("2024-01-20", "10:00"), dispatcher.clone());
        let mut prefs = visible_prefs();
        for notification_type in NotificationType::ALL {
            prefs.set_type_enabled(notification_type, false);
        }
        prefs.set_type_enabled(NotificationType::DailyCheckin, true);

        let outcome = scheduler.schedule(&nominal_prediction(), &prefs, Language::English).await;

        assert_eq!(outcome.scheduled_count, 29);
        let pending = dispatcher.pending();
        assert_eq!(pending.first().map(|r| r.id), Some(8000));
        assert_eq!(pending.first().map(|r| r.deliver_at), Some(at("2024-01-21", "09:00")));
        assert_eq!(pending.last().map(|r| r.id), Some(8028));
    }

    #[tokio::test]
    async fn test_disabled_toggle_skips_type() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let scheduler = scheduler_at(at("2024-01-01", "00:00"), dispatcher.clone());
        let mut prefs = visible_prefs();
        prefs.set_type_enabled(NotificationType::PmsReminder, false);
        prefs.toggles_by_type.remove(&NotificationType::PeriodLate);

        scheduler.schedule(&nominal_prediction(), &prefs, Language::English).await;

        let ids = dispatcher.pending_ids();
        assert!(!ids.contains(&7000));
        // A missing toggle counts as enabled
        assert!(ids.contains(&3000));
    }

    #[tokio::test]
    async fn test_privacy_modes_hide_details() {
        for (mode, body) in [(PrivacyMode::Full, ""), (PrivacyMode::Partial, "You have a new reminder")] {
            let dispatcher = Arc::new(RecordingDispatcher::new());
            let scheduler = scheduler_at(at("2024-01-01", "00:00"), dispatcher.clone());
            let prefs = NotificationPreferences {
                privacy_mode: mode,
                ..NotificationPreferences::default()
            };

            scheduler.schedule(&nominal_prediction(), &prefs, Language::English).await;

            for request in dispatcher.pending() {
                assert_eq!(request.title, "LunaTrack");
                assert_eq!(request.body, body);
            }
        }
    }

    #[tokio::test]
    async fn test_cancel_completes_before_new_batch() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        dispatcher.seed_pending(&[1003, 8011, BASE + 12_345]);
        let scheduler = scheduler_at(at("2024-01-01", "00:00"), dispatcher.clone());

        scheduler
            .schedule(&nominal_prediction(), &visible_prefs(), Language::English)
            .await;

        let calls = dispatcher.calls();
        let cancel_at = calls
            .iter()
            .position(|c| *c == DispatchCall::Cancel(vec![1003, 8011]))
            .expect("stale cycle ids cancelled");
        let batch_at = calls
            .iter()
            .position(|c| matches!(c, DispatchCall::ScheduleBatch(_)))
            .expect("batch submitted");
        assert!(cancel_at < batch_at);

        // Medication notifications are untouched
        assert!(dispatcher.pending_ids().contains(&(BASE + 12_345)));
        assert!(!dispatcher.pending_ids().contains(&8011));
    }

    #[tokio::test]
    async fn test_master_toggle_off_only_cancels() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        dispatcher.seed_pending(&[2000, 99_999, BASE + 1]);
        let scheduler = scheduler_at(at("2024-01-01", "00:00"), dispatcher.clone());
        let prefs = NotificationPreferences {
            enabled: false,
            ..visible_prefs()
        };

        let outcome = scheduler.schedule(&nominal_prediction(), &prefs, Language::English).await;

        assert_eq!(outcome, ScheduleOutcome::empty());
        assert_eq!(dispatcher.pending_ids(), vec![BASE + 1]);
        assert!(!dispatcher
            .calls()
            .iter()
            .any(|c| matches!(c, DispatchCall::ScheduleBatch(_) | DispatchCall::CheckPermission)));
    }

    #[tokio::test]
    async fn test_rejected_descriptors_are_collected() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        dispatcher.reject_id(2000);
        let scheduler = scheduler_at(at("2024-01-01", "00:00"), dispatcher.clone());

        let outcome = scheduler
            .schedule(&nominal_prediction(), &visible_prefs(), Language::English)
            .await;

        assert_eq!(outcome.scheduled_count, 6);
        assert_eq!(outcome.errors.len(), 1);
        assert!(matches!(outcome.errors[0], SchedulingError::Rejected { id: 2000, .. }));
    }

    #[tokio::test]
    async fn test_list_failure_cancels_whole_band() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        dispatcher.seed_pending(&[4000, BASE + 7]);
        dispatcher.fail_list_pending(true);
        let scheduler = scheduler_at(at("2024-01-01", "00:00"), dispatcher.clone());

        let cancelled = scheduler.cancel_all().await.unwrap();

        assert_eq!(cancelled, 8001);
        assert_eq!(dispatcher.pending_ids(), vec![BASE + 7]);
    }

    #[tokio::test]
    async fn test_permission_denied_touches_nothing() {
        let mut mock = MockNotificationDispatcherTrait::new();
        mock.expect_check_permission().times(1).returning(|| Ok(false));

        let scheduler = CycleNotificationScheduler::new(
            mock,
            Arc::new(FixedClock::new(at("2024-01-01", "00:00"))),
            SchedulerConfig::default(),
        );
        let outcome = scheduler
            .schedule(&nominal_prediction(), &visible_prefs(), Language::English)
            .await;

        assert_eq!(outcome, ScheduleOutcome::failed(SchedulingError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_batch_failure_becomes_single_error() {
        let mut mock = MockNotificationDispatcherTrait::new();
        mock.expect_check_permission().returning(|| Ok(true));
        mock.expect_list_pending().returning(|| Ok(vec![]));
        mock.expect_cancel()
            .withf(|ids: &Vec<i32>| ids.is_empty())
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_create_channel().returning(|_| Ok(()));
        mock.expect_schedule_batch()
            .times(1)
            .returning(|_| Err(DispatchError::Failed("platform busy".to_string())));

        let scheduler = CycleNotificationScheduler::new(
            mock,
            Arc::new(FixedClock::new(at("2024-01-01", "00:00"))),
            SchedulerConfig::default(),
        );
        let outcome = scheduler
            .schedule(&nominal_prediction(), &visible_prefs(), Language::English)
            .await;

        assert_eq!(outcome.scheduled_count, 0);
        assert_eq!(
            outcome.errors,
            vec![SchedulingError::Dispatch(DispatchError::Failed("platform busy".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_test_notification_skips_quiet_hours() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let scheduler = scheduler_at(at("2024-03-10", "23:30"), dispatcher.clone());

        let outcome = scheduler.send_test_notification(&NotificationPreferences::default()).await;

        assert_eq!(outcome.scheduled_count, 1);
        let request = dispatcher.pending_request(CYCLE_TEST_ID).unwrap();
        assert_eq!(request.deliver_at, at("2024-03-11", "08:00"));
        assert_eq!(request.payload, Some(NotificationPayload::Test));
    }

    #[tokio::test]
    async fn test_spanish_copy() {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let scheduler = scheduler_at(at("2024-01-01", "00:00"), dispatcher.clone());

        scheduler
            .schedule(&nominal_prediction(), &visible_prefs(), Language::Spanish)
            .await;

        assert_eq!(dispatcher.pending_request(5000).unwrap().title, "Día de ovulación");
    }
}
