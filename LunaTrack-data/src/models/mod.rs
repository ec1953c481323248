// Storage models, serialised as JSON into the key-value store
pub mod cycle;
pub mod medication;
pub mod notification;

// Re-export common types for easier imports
pub use cycle::{CycleRecord, CycleSettings, DayEntry, FlowLevel};
pub use medication::{Medication, MedicationLog};
pub use notification::{NotificationPreferences, NotificationType, PrivacyMode};
