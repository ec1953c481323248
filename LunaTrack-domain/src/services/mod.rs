pub mod cycle_tracking;
pub mod medication;
pub mod phase;
pub mod prediction;

// Domain services
// Pure engines (prediction, phase) and the store-backed workflows built on them.

pub use cycle_tracking::{CycleServiceError, CycleTrackingService, CycleTrackingServiceTrait};
pub use medication::{MedicationService, MedicationServiceError, MedicationServiceTrait};
pub use phase::classify;
pub use prediction::{cycle_statistics, predict, predict_at, resolve_last_period_start};
