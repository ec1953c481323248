use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A medication the user wants reminders for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    /// Caller-assigned opaque identifier
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub dosage: String,

    #[serde(default)]
    pub frequency: String,

    /// Reminder times as `HH:mm`; only the first eight are scheduled
    #[serde(default)]
    pub reminder_times: Vec<String>,

    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub color: String,

    #[serde(default)]
    pub icon: String,

    #[serde(default = "default_active")]
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

/// Adherence record for one (medication, date, time) slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationLog {
    pub id: String,
    pub medication_id: String,
    pub date: NaiveDate,
    /// Slot label as `HH:mm`
    pub time: String,
    pub taken: bool,
}

impl MedicationLog {
    /// Whether this log occupies the given slot
    pub fn is_slot(&self, medication_id: &str, date: NaiveDate, time: &str) -> bool {
        self.medication_id == medication_id && self.date == date && self.time == time
    }
}
