//! Local notification scheduling
//!
//! Cycle and medication notifications share the platform's id space but use
//! disjoint bands (see `ids`), so the two families can be rescheduled
//! independently.

pub mod action_handler;
pub mod copy;
pub mod cycle_scheduler;
pub mod dispatch;
pub mod ids;
pub mod medication_scheduler;
pub mod outcome;
pub mod payload;

pub use action_handler::{ActionOutcome, MedicationAction, MedicationActionHandler, NotificationActionEvent};
pub use copy::Language;
pub use cycle_scheduler::CycleNotificationScheduler;
pub use dispatch::{
    BatchReport, ChannelSpec, DispatchError, FailedNotification, NotificationDispatcherTrait, NotificationRequest,
    MEDICATION_REMINDER_CATEGORY,
};
pub use ids::MedicationIdAllocator;
pub use medication_scheduler::MedicationNotificationScheduler;
pub use outcome::{ScheduleOutcome, SchedulingError};
pub use payload::{MedicationReminderPayload, NotificationPayload};
