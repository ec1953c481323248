//! Notification copy in the supported languages

use std::collections::HashMap;

use once_cell::sync::Lazy;

use luna_track_data::models::{NotificationType, PrivacyMode};

/// Languages with translated copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    English,
    Spanish,
}

impl Language {
    /// Resolve a language tag such as `es` or `es-MX`; unknown tags are English
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag.trim().split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "es" => Language::Spanish,
            _ => Language::English,
        }
    }
}

/// Title and body of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationText {
    pub title: &'static str,
    pub body: &'static str,
}

struct LanguageTable {
    generic: NotificationText,
    cycle: HashMap<NotificationType, NotificationText>,
    medication_title: &'static str,
    medication_body_prefix: &'static str,
    snooze_title: &'static str,
    test: NotificationText,
}

static ENGLISH: Lazy<LanguageTable> = Lazy::new(|| LanguageTable {
    generic: NotificationText {
        title: "LunaTrack",
        body: "You have a new reminder",
    },
    cycle: HashMap::from([
        (
            NotificationType::PeriodApproaching,
            NotificationText {
                title: "Period coming soon",
                body: "Your period is expected in 2 days",
            },
        ),
        (
            NotificationType::PeriodExpected,
            NotificationText {
                title: "Period expected today",
                body: "Your period is expected to start today",
            },
        ),
        (
            NotificationType::PeriodLate,
            NotificationText {
                title: "Period late",
                body: "Your period hasn't been logged yet. Tap to update",
            },
        ),
        (
            NotificationType::FertileStart,
            NotificationText {
                title: "Fertile window",
                body: "Your fertile window starts today",
            },
        ),
        (
            NotificationType::OvulationDay,
            NotificationText {
                title: "Ovulation day",
                body: "Today is your estimated ovulation day",
            },
        ),
        (
            NotificationType::FertileEnding,
            NotificationText {
                title: "Fertile window ending",
                body: "Your fertile window ends tomorrow",
            },
        ),
        (
            NotificationType::PmsReminder,
            NotificationText {
                title: "PMS may begin",
                body: "Premenstrual symptoms may start around now",
            },
        ),
        (
            NotificationType::DailyCheckin,
            NotificationText {
                title: "Daily check-in",
                body: "How are you feeling today?",
            },
        ),
    ]),
    medication_title: "Medication reminder",
    medication_body_prefix: "Time to take",
    snooze_title: "Snoozed reminder",
    test: NotificationText {
        title: "Test notification",
        body: "Notifications are working",
    },
});

static SPANISH: Lazy<LanguageTable> = Lazy::new(|| LanguageTable {
    generic: NotificationText {
        title: "LunaTrack",
        body: "Tienes un nuevo recordatorio",
    },
    cycle: HashMap::from([
        (
            NotificationType::PeriodApproaching,
            NotificationText {
                title: "Tu periodo se acerca",
                body: "Se espera tu periodo en 2 días",
            },
        ),
        (
            NotificationType::PeriodExpected,
            NotificationText {
                title: "Periodo esperado hoy",
                body: "Se espera que tu periodo empiece hoy",
            },
        ),
        (
            NotificationType::PeriodLate,
            NotificationText {
                title: "Periodo retrasado",
                body: "Aún no has registrado tu periodo. Toca para actualizar",
            },
        ),
        (
            NotificationType::FertileStart,
            NotificationText {
                title: "Ventana fértil",
                body: "Tu ventana fértil empieza hoy",
            },
        ),
        (
            NotificationType::OvulationDay,
            NotificationText {
                title: "Día de ovulación",
                body: "Hoy es tu día estimado de ovulación",
            },
        ),
        (
            NotificationType::FertileEnding,
            NotificationText {
                title: "Fin de la ventana fértil",
                body: "Tu ventana fértil termina mañana",
            },
        ),
        (
            NotificationType::PmsReminder,
            NotificationText {
                title: "Posible SPM",
                body: "Los síntomas premenstruales pueden empezar ahora",
            },
        ),
        (
            NotificationType::DailyCheckin,
            NotificationText {
                title: "Registro diario",
                body: "¿Cómo te sientes hoy?",
            },
        ),
    ]),
    medication_title: "Recordatorio de medicación",
    medication_body_prefix: "Es hora de tomar",
    snooze_title: "Recordatorio pospuesto",
    test: NotificationText {
        title: "Notificación de prueba",
        body: "Las notificaciones funcionan",
    },
});

fn table(language: Language) -> &'static LanguageTable {
    match language {
        Language::English => &ENGLISH,
        Language::Spanish => &SPANISH,
    }
}

/// Title and body for a cycle notification under the privacy mode
pub fn cycle_copy(notification_type: NotificationType, privacy: PrivacyMode, language: Language) -> NotificationText {
    let table = table(language);
    match privacy {
        PrivacyMode::Full => NotificationText {
            title: table.generic.title,
            body: "",
        },
        PrivacyMode::Partial => table.generic,
        PrivacyMode::Off => table
            .cycle
            .get(&notification_type)
            .copied()
            .unwrap_or(table.generic),
    }
}

/// Title and body for a medication reminder
pub fn medication_copy(name: &str, dosage: &str, language: Language) -> (String, String) {
    let table = table(language);
    let dosage = dosage.trim();
    let body = if dosage.is_empty() {
        format!("{} {}", table.medication_body_prefix, name)
    } else {
        format!("{} {} ({})", table.medication_body_prefix, name, dosage)
    };
    (table.medication_title.to_string(), body)
}

/// Title and body for a snoozed medication reminder
pub fn snooze_copy(name: &str, language: Language) -> (String, String) {
    let table = table(language);
    (
        table.snooze_title.to_string(),
        format!("{} {}", table.medication_body_prefix, name),
    )
}

/// Title and body for diagnostic notifications
pub fn test_copy(language: Language) -> NotificationText {
    table(language).test
}
