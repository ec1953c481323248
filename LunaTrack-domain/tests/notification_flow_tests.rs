use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use luna_track_domain::clock::{Clock, FixedClock};
use luna_track_domain::config::SchedulerConfig;
use luna_track_domain::data::repository::{
    CycleRepository, MedicationRepository, MedicationRepositoryTrait, PreferencesRepository,
    PreferencesRepositoryTrait,
};
use luna_track_domain::data::store::{keys, InMemoryKeyValueStore, KeyValueStore};
use luna_track_domain::entities::{
    DayEntry, FlowLevel, NotificationPreferences, NotificationType, PrivacyMode, SaveMedicationRequest,
    UpdateCycleSettingsRequest,
};
use luna_track_domain::health::{get_system_health, SystemStatus};
use luna_track_domain::notifications::ids::{is_cycle_notification_id, is_medication_id, schedule_id};
use luna_track_domain::notifications::{
    ActionOutcome, CycleNotificationScheduler, Language, MedicationActionHandler, MedicationNotificationScheduler,
    NotificationActionEvent, NotificationPayload,
};
use luna_track_domain::services::{
    CycleTrackingService, CycleTrackingServiceTrait, MedicationService, MedicationServiceTrait,
};
use luna_track_domain::testing::RecordingDispatcher;

// Initialize tracing once for all tests
static INIT: std::sync::Once = std::sync::Once::new();
fn initialize() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

fn at(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M").unwrap()
}

fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn test_logged_period_moves_cycle_notifications() {
    initialize();

    let store = InMemoryKeyValueStore::new();
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let clock = Arc::new(FixedClock::new(at("2024-01-02 07:00")));
    let cycles = CycleTrackingService::new(CycleRepository::new(store.clone()));
    let scheduler = CycleNotificationScheduler::new(dispatcher.clone(), clock.clone(), SchedulerConfig::default());
    let prefs = NotificationPreferences {
        privacy_mode: PrivacyMode::Off,
        ..NotificationPreferences::default()
    };

    cycles
        .update_settings(UpdateCycleSettingsRequest {
            cycle_length: 28,
            period_length: 5,
            luteal_phase: 14,
            last_period_start: "2024-01-01".to_string(),
            last_period_end: None,
        })
        .await
        .unwrap();

    let prediction = cycles.current_prediction(clock.today()).await;
    let outcome = scheduler.schedule(&prediction, &prefs, Language::English).await;
    assert_eq!(outcome.scheduled_count, 7);
    assert_eq!(
        dispatcher.pending_request(2000).unwrap().deliver_at,
        at("2024-01-29 09:00")
    );

    // Period arrives three days late
    clock.set(at("2024-02-01 07:00"));
    cycles
        .log_day(DayEntry::new(date("2024-02-01")).with_flow(FlowLevel::Heavy))
        .await
        .unwrap();
    assert_eq!(cycles.statistics().await.cycle_count, 1);

    let prediction = cycles.current_prediction(clock.today()).await;
    assert_eq!(prediction.next_period_start, date("2024-02-29"));

    let outcome = scheduler.schedule(&prediction, &prefs, Language::English).await;
    assert_eq!(outcome.scheduled_count, 7);
    assert_eq!(
        dispatcher.pending_request(2000).unwrap().deliver_at,
        at("2024-02-29 09:00")
    );
    assert!(dispatcher.pending_ids().iter().all(|id| is_cycle_notification_id(*id)));
}

#[tokio::test]
async fn test_preferences_drive_cycle_scheduling() {
    initialize();

    let store = InMemoryKeyValueStore::new();
    let preferences = PreferencesRepository::new(store.clone());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let clock = Arc::new(FixedClock::new(at("2024-01-01 07:00")));
    let cycles = CycleTrackingService::new(CycleRepository::new(store.clone()));
    let scheduler = CycleNotificationScheduler::new(dispatcher.clone(), clock.clone(), SchedulerConfig::default());

    let mut prefs = preferences.get_preferences().await.unwrap();
    prefs.set_type_enabled(NotificationType::DailyCheckin, true);
    preferences.save_preferences(&prefs).await.unwrap();

    // The store holds no cycle settings, so the prediction falls back to today - 14 days
    let prediction = cycles.current_prediction(clock.today()).await;
    let prefs = preferences.get_preferences().await.unwrap();
    let outcome = scheduler.schedule(&prediction, &prefs, Language::Spanish).await;

    assert!(outcome.is_clean());
    assert_eq!(dispatcher.pending_ids().iter().filter(|id| (8000..9000).contains(*id)).count(), 30);

    prefs_disabled(&preferences).await;
    let prefs = preferences.get_preferences().await.unwrap();
    scheduler.schedule(&prediction, &prefs, Language::Spanish).await;
    assert!(dispatcher.pending_ids().is_empty());
}

async fn prefs_disabled(preferences: &PreferencesRepository<InMemoryKeyValueStore>) {
    let mut prefs = preferences.get_preferences().await.unwrap();
    prefs.enabled = false;
    preferences.save_preferences(&prefs).await.unwrap();
}

#[tokio::test]
async fn test_medication_reminder_round_trip() {
    initialize();

    let store = InMemoryKeyValueStore::new();
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let clock = Arc::new(FixedClock::new(at("2024-05-10 07:00")));
    let config = SchedulerConfig::default();
    let scheduler = Arc::new(MedicationNotificationScheduler::new(
        dispatcher.clone(),
        clock.clone(),
        config.clone(),
    ));
    let medications = MedicationService::new(MedicationRepository::new(store.clone()), scheduler.clone(), clock.clone());
    let handler = MedicationActionHandler::new(
        MedicationRepository::new(store.clone()),
        dispatcher.clone(),
        clock.clone(),
        config,
    );

    dispatcher.seed_pending(&[2000]);
    let medication = medications
        .save_medication(SaveMedicationRequest {
            id: Some("med-1".to_string()),
            name: "Folic acid".to_string(),
            category: "supplement".to_string(),
            dosage: "400 mcg".to_string(),
            frequency: "daily".to_string(),
            reminder_times: vec!["08:00".to_string()],
            notes: String::new(),
            color: "#ffcc00".to_string(),
            icon: "pill".to_string(),
            is_active: true,
        })
        .await
        .unwrap();
    assert_eq!(dispatcher.pending_ids().iter().filter(|id| is_medication_id(**id)).count(), 30);

    // The 08:00 reminder fires and the user snoozes it
    clock.set(at("2024-05-10 08:00"));
    let fired = dispatcher.pending_request(schedule_id(&medication.id, 0, 0)).unwrap();
    let snooze = NotificationActionEvent {
        action_id: "snooze".to_string(),
        notification_id: Some(fired.id),
        payload: serde_json::to_value(fired.payload.clone().unwrap()).unwrap(),
    };
    let ActionOutcome::Snoozed { notification_id, deliver_at } = handler.handle_action(&snooze).await else {
        panic!("snooze expected");
    };
    assert_eq!(deliver_at, at("2024-05-10 08:15"));

    // The snoozed copy fires and is taken, twice (duplicate delivery)
    clock.set(at("2024-05-10 08:15"));
    let snoozed = dispatcher.pending_request(notification_id).unwrap();
    let take = NotificationActionEvent {
        action_id: "take".to_string(),
        notification_id: Some(notification_id),
        payload: serde_json::to_value(snoozed.payload.unwrap()).unwrap(),
    };
    handler.handle_action(&take).await;
    handler.handle_action(&take).await;

    let logs = medications.logs_for_date(date("2024-05-10")).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].time, "08:00");
    assert!(logs[0].taken);
    assert!(dispatcher.pending_request(notification_id).is_none());

    // A fresh session reschedules from the store without touching cycle ids
    scheduler.reset_session();
    let stored = MedicationRepository::new(store.clone()).list_medications().await.unwrap();
    let outcome = scheduler.schedule_all_once(&stored).await.unwrap();
    assert_eq!(outcome.scheduled_count, 29);
    assert!(dispatcher.pending_ids().contains(&2000));
}

#[tokio::test]
async fn test_malformed_store_values_read_as_defaults() {
    initialize();

    let store = InMemoryKeyValueStore::new();
    store.set(keys::CYCLE_SETTINGS, "{not json".to_string()).await.unwrap();
    store.set(keys::NOTIFICATION_PREFERENCES, "[]".to_string()).await.unwrap();

    let cycles = CycleTrackingService::new(CycleRepository::new(store.clone()));
    let preferences = PreferencesRepository::new(store.clone());

    assert_eq!(cycles.load_settings().await.cycle_length, 28);
    assert_eq!(
        preferences.get_preferences().await.unwrap(),
        NotificationPreferences::default()
    );
}

#[tokio::test]
async fn test_health_reports_permission_state() {
    initialize();

    let store = InMemoryKeyValueStore::new();
    let dispatcher = RecordingDispatcher::new();
    assert_eq!(get_system_health(&store, &dispatcher).await.status, SystemStatus::Healthy);

    dispatcher.set_permission(false);
    assert_eq!(get_system_health(&store, &dispatcher).await.status, SystemStatus::Degraded);
}

#[test]
fn test_config_feeds_schedulers() {
    let config = SchedulerConfig::from_lookup(|key| match key {
        "LUNA_SCHEDULE_DAYS" => Some("7".to_string()),
        "LUNA_SNOOZE_MINUTES" => Some("10".to_string()),
        _ => None,
    })
    .unwrap();

    let dispatcher = Arc::new(RecordingDispatcher::new());
    let clock = Arc::new(FixedClock::new(at("2024-05-10 07:00")));
    let scheduler = MedicationNotificationScheduler::new(dispatcher.clone(), clock, config);
    let medication = luna_track_domain::entities::Medication {
        id: "med-1".to_string(),
        name: "Iron".to_string(),
        category: String::new(),
        dosage: String::new(),
        frequency: String::new(),
        reminder_times: vec!["08:00".to_string()],
        notes: String::new(),
        color: String::new(),
        icon: String::new(),
        is_active: true,
        created_at: chrono::Utc::now(),
    };

    let outcome = tokio_test::block_on(scheduler.schedule_one(&medication));

    assert_eq!(outcome.scheduled_count, 7);
    assert!(dispatcher
        .pending()
        .iter()
        .all(|r| matches!(r.payload, Some(NotificationPayload::MedicationReminder(_)))));
}
