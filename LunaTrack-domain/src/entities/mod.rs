// Domain entities and value objects
pub mod cycle;
pub mod requests;
pub mod conversions;

// Re-export common types for easier imports
pub use cycle::{CyclePhase, CyclePrediction, CycleStatistics, PhaseType};
pub use requests::{SaveMedicationRequest, UpdateCycleSettingsRequest};

// Persisted models are shared with the data layer as-is
pub use luna_track_data::models::{
    CycleRecord, CycleSettings, DayEntry, FlowLevel, Medication, MedicationLog,
    NotificationPreferences, NotificationType, PrivacyMode,
};
