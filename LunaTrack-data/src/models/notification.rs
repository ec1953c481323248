use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// Cycle notification families the user can toggle individually
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PeriodApproaching,
    PeriodExpected,
    PeriodLate,
    FertileStart,
    OvulationDay,
    FertileEnding,
    PmsReminder,
    DailyCheckin,
}

impl NotificationType {
    /// Every type, in scheduling order
    pub const ALL: [NotificationType; 8] = [
        NotificationType::PeriodApproaching,
        NotificationType::PeriodExpected,
        NotificationType::PeriodLate,
        NotificationType::FertileStart,
        NotificationType::OvulationDay,
        NotificationType::FertileEnding,
        NotificationType::PmsReminder,
        NotificationType::DailyCheckin,
    ];

    /// Wire tag of the type
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::PeriodApproaching => "period_approaching",
            NotificationType::PeriodExpected => "period_expected",
            NotificationType::PeriodLate => "period_late",
            NotificationType::FertileStart => "fertile_start",
            NotificationType::OvulationDay => "ovulation_day",
            NotificationType::FertileEnding => "fertile_ending",
            NotificationType::PmsReminder => "pms_reminder",
            NotificationType::DailyCheckin => "daily_checkin",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much health detail a delivered notification may show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyMode {
    /// Type-specific title and body
    Off,
    /// Generic title and generic body
    #[default]
    Partial,
    /// Generic title, empty body
    Full,
}

/// User preferences for cycle notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPreferences {
    /// Master switch
    pub enabled: bool,

    /// Per-type switches; a missing entry counts as enabled
    pub toggles_by_type: BTreeMap<NotificationType, bool>,

    /// Delivery time of day as `HH:mm`
    pub preferred_time: String,

    /// Quiet hours as `HH:mm`; the interval may wrap past midnight
    pub quiet_hours_start: String,
    pub quiet_hours_end: String,

    pub privacy_mode: PrivacyMode,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        let toggles_by_type = NotificationType::ALL
            .iter()
            .map(|t| (*t, *t != NotificationType::DailyCheckin))
            .collect();

        Self {
            enabled: true,
            toggles_by_type,
            preferred_time: "09:00".to_string(),
            quiet_hours_start: "22:00".to_string(),
            quiet_hours_end: "08:00".to_string(),
            privacy_mode: PrivacyMode::default(),
        }
    }
}

impl NotificationPreferences {
    /// Whether notifications of `notification_type` should be produced
    pub fn is_type_enabled(&self, notification_type: NotificationType) -> bool {
        self.toggles_by_type
            .get(&notification_type)
            .copied()
            .unwrap_or(true)
    }

    /// Set one per-type switch
    pub fn set_type_enabled(&mut self, notification_type: NotificationType, enabled: bool) {
        self.toggles_by_type.insert(notification_type, enabled);
    }
}
