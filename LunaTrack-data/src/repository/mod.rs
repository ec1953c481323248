// Repository module structure
pub mod errors;
mod cycle;
mod json;
mod medication;
mod preferences;

// Re-export commonly used types
pub use errors::RepositoryError;
pub use cycle::{CycleRepository, CycleRepositoryTrait, MAX_CYCLE_HISTORY};
pub use medication::{MedicationRepository, MedicationRepositoryTrait};
pub use preferences::{PreferencesRepository, PreferencesRepositoryTrait};
