use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::requests::{SaveMedicationRequest, UpdateCycleSettingsRequest};
use crate::time_window::{format_hhmm, parse_hhmm};
use luna_track_data::models::{CycleSettings, Medication};

/// Conversion functions between domain requests and data models.
/// They follow the pattern convert_to_[target_layer]_[model_name].

/// Convert a settings edit into the stored settings model
pub fn convert_to_data_settings(request: &UpdateCycleSettingsRequest) -> CycleSettings {
    CycleSettings {
        cycle_length: request.cycle_length,
        period_length: request.period_length,
        luteal_phase: request.luteal_phase,
        last_period_start: request.last_period_start.trim().to_string(),
        last_period_end: request
            .last_period_end
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    }
}

/// Convert a save request into the stored medication model.
///
/// Reminder times are stored as zero-padded `HH:mm` labels.
///
/// Editing keeps the id and creation time of `existing`; a new medication gets
/// a fresh UUID unless the caller supplied one.
pub fn convert_to_data_medication(
    request: SaveMedicationRequest,
    existing: Option<&Medication>,
    now: DateTime<Utc>,
) -> Medication {
    let id = existing
        .map(|m| m.id.clone())
        .or(request.id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    Medication {
        id,
        name: request.name.trim().to_string(),
        category: request.category,
        dosage: request.dosage,
        frequency: request.frequency,
        reminder_times: request
            .reminder_times
            .into_iter()
            .map(|t| parse_hhmm(&t).map(format_hhmm).unwrap_or_else(|| t.trim().to_string()))
            .collect(),
        notes: request.notes,
        color: request.color,
        icon: request.icon,
        is_active: request.is_active,
        created_at: existing.map(|m| m.created_at).unwrap_or(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: Option<&str>) -> SaveMedicationRequest {
        SaveMedicationRequest {
            id: id.map(String::from),
            name: "  Folic acid ".to_string(),
            category: "supplement".to_string(),
            dosage: "400mcg".to_string(),
            frequency: "daily".to_string(),
            reminder_times: vec![" 08:00".to_string(), "7:30".to_string()],
            notes: String::new(),
            color: String::new(),
            icon: String::new(),
            is_active: true,
        }
    }

    #[test]
    fn test_new_medication_gets_id() {
        let now = Utc::now();
        let medication = convert_to_data_medication(request(None), None, now);
        assert!(Uuid::parse_str(&medication.id).is_ok());
        assert_eq!(medication.name, "Folic acid");
        assert_eq!(medication.reminder_times, vec!["08:00".to_string(), "07:30".to_string()]);
        assert_eq!(medication.created_at, now);
    }

    #[test]
    fn test_edit_keeps_identity() {
        let created = Utc::now() - chrono::Duration::days(3);
        let existing = convert_to_data_medication(request(Some("med-1")), None, created);
        let edited = convert_to_data_medication(request(Some("other")), Some(&existing), Utc::now());
        assert_eq!(edited.id, "med-1");
        assert_eq!(edited.created_at, created);
    }

    #[test]
    fn test_blank_period_end_dropped() {
        let settings = convert_to_data_settings(&UpdateCycleSettingsRequest {
            cycle_length: 30,
            period_length: 4,
            luteal_phase: 13,
            last_period_start: " 2024-01-01 ".to_string(),
            last_period_end: Some(" ".to_string()),
        });
        assert_eq!(settings.last_period_start, "2024-01-01");
        assert_eq!(settings.last_period_end, None);
    }
}
