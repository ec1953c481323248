use std::borrow::Cow;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::services::prediction::parse_calendar_date;
use crate::time_window::parse_hhmm;

/// Request payload for editing the cycle baseline
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCycleSettingsRequest {
    #[validate(range(min = 21, max = 40, message = "Cycle length must be between 21 and 40 days"))]
    pub cycle_length: u32,

    #[validate(range(min = 2, max = 10, message = "Period length must be between 2 and 10 days"))]
    pub period_length: u32,

    #[validate(range(min = 7, max = 20, message = "Luteal phase must be between 7 and 20 days"))]
    pub luteal_phase: u32,

    /// Empty, or a `yyyy-MM-dd` date
    #[validate(custom = "validate_optional_date")]
    #[serde(default)]
    pub last_period_start: String,

    #[serde(default)]
    pub last_period_end: Option<String>,
}

/// Request payload for creating or editing a medication
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveMedicationRequest {
    /// Existing id when editing; a new id is assigned otherwise
    #[serde(default)]
    pub id: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub dosage: String,

    #[serde(default)]
    pub frequency: String,

    #[validate(
        length(max = 8, message = "At most 8 reminder times are supported"),
        custom = "validate_reminder_times"
    )]
    #[serde(default)]
    pub reminder_times: Vec<String>,

    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub color: String,

    #[serde(default)]
    pub icon: String,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn validate_optional_date(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || parse_calendar_date(value).is_some() {
        return Ok(());
    }
    let mut error = ValidationError::new("date_format");
    error.message = Some(Cow::from("Last period start must be a yyyy-MM-dd date"));
    Err(error)
}

fn validate_reminder_times(times: &[String]) -> Result<(), ValidationError> {
    if times.iter().all(|t| parse_hhmm(t).is_some()) {
        return Ok(());
    }
    let mut error = ValidationError::new("time_format");
    error.message = Some(Cow::from("Reminder times must be HH:mm"));
    Err(error)
}

/// Flatten validator errors into one readable message
pub fn describe_validation_errors(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let messages: Vec<String> = errors
                .iter()
                .map(|err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid {}", field),
                })
                .collect();
            format!("{}: {}", field, messages.join(", "))
        })
        .collect();
    fields.sort();
    fields.join("; ")
}
