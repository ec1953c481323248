//! Data attached to dispatched notifications and handed back on user action

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use luna_track_data::models::NotificationType;

/// Payload carried by a notification, tagged by `"type"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    MedicationReminder(MedicationReminderPayload),
    CycleEvent {
        #[serde(rename = "notificationType")]
        notification_type: NotificationType,
        date: String,
    },
    Test,
}

/// Medication reminder payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationReminderPayload {
    pub medication_id: String,
    pub medication_name: String,
    /// Time label of this delivery; a snoozed reminder carries the snooze time
    pub scheduled_time: String,
    /// Slot the reminder was originally scheduled for, set on the first snooze
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_scheduled_time: Option<String>,
}

impl MedicationReminderPayload {
    pub fn new(medication_id: &str, medication_name: &str, scheduled_time: &str) -> Self {
        Self {
            medication_id: medication_id.to_string(),
            medication_name: medication_name.to_string(),
            scheduled_time: scheduled_time.to_string(),
            original_scheduled_time: None,
        }
    }

    /// The adherence slot this reminder belongs to
    pub fn slot_time(&self) -> &str {
        self.original_scheduled_time
            .as_deref()
            .unwrap_or(&self.scheduled_time)
    }

    /// The payload of a snoozed copy delivered at `new_time`
    pub fn snoozed(&self, new_time: &str) -> Self {
        Self {
            medication_id: self.medication_id.clone(),
            medication_name: self.medication_name.clone(),
            scheduled_time: new_time.to_string(),
            original_scheduled_time: Some(self.slot_time().to_string()),
        }
    }
}

impl NotificationPayload {
    /// Decode a payload received from the platform. Foreign or malformed
    /// payloads yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match serde_json::from_value(value.clone()) {
            Ok(payload) => Some(payload),
            Err(err) => {
                debug!("Ignoring unrecognised notification payload: {}", err);
                None
            }
        }
    }

    /// The medication reminder inside, if this is one
    pub fn as_medication_reminder(&self) -> Option<&MedicationReminderPayload> {
        match self {
            NotificationPayload::MedicationReminder(reminder) => Some(reminder),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_medication_payload_wire_format() {
        let payload = NotificationPayload::MedicationReminder(MedicationReminderPayload::new(
            "med-1", "Iron", "08:00",
        ));
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "medication_reminder",
                "medicationId": "med-1",
                "medicationName": "Iron",
                "scheduledTime": "08:00"
            })
        );
    }

    #[test]
    fn test_foreign_payloads_rejected() {
        assert!(NotificationPayload::from_value(&json!({"medicationId": "x"})).is_none());
        assert!(NotificationPayload::from_value(&json!({"type": "chat_message", "id": 3})).is_none());
        assert!(NotificationPayload::from_value(&json!(null)).is_none());
        assert!(NotificationPayload::from_value(&json!({
            "type": "medication_reminder",
            "medicationName": "Iron"
        }))
        .is_none());
    }

    #[test]
    fn test_cycle_payload_decodes() {
        let decoded = NotificationPayload::from_value(&json!({
            "type": "cycle_event",
            "notificationType": "ovulation_day",
            "date": "2024-01-15"
        }));
        assert_eq!(
            decoded,
            Some(NotificationPayload::CycleEvent {
                notification_type: NotificationType::OvulationDay,
                date: "2024-01-15".to_string(),
            })
        );
        assert!(decoded.unwrap().as_medication_reminder().is_none());
    }

    #[test]
    fn test_first_snooze_wins() {
        let original = MedicationReminderPayload::new("med-1", "Iron", "08:00");
        let once = original.snoozed("08:15");
        let twice = once.snoozed("08:30");

        assert_eq!(once.scheduled_time, "08:15");
        assert_eq!(once.original_scheduled_time.as_deref(), Some("08:00"));
        assert_eq!(twice.scheduled_time, "08:30");
        assert_eq!(twice.original_scheduled_time.as_deref(), Some("08:00"));
        assert_eq!(twice.slot_time(), "08:00");
    }
}
