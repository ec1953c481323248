use thiserror::Error;

use super::dispatch::DispatchError;

/// Advisory errors collected during a scheduling pass
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Notification permission not granted")]
    PermissionDenied,

    #[error("Notification {id} rejected: {reason}")]
    Rejected { id: i32, reason: String },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Could not read scheduling data: {0}")]
    Storage(String),
}

/// What a scheduling pass achieved. Never fatal; hosts may surface `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleOutcome {
    pub scheduled_count: usize,
    pub errors: Vec<SchedulingError>,
}

impl ScheduleOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn failed(error: SchedulingError) -> Self {
        Self {
            scheduled_count: 0,
            errors: vec![error],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold another pass into this one
    pub fn merge(&mut self, other: ScheduleOutcome) {
        self.scheduled_count += other.scheduled_count;
        self.errors.extend(other.errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let mut total = ScheduleOutcome {
            scheduled_count: 3,
            errors: vec![],
        };
        total.merge(ScheduleOutcome::failed(SchedulingError::PermissionDenied));
        total.merge(ScheduleOutcome {
            scheduled_count: 2,
            errors: vec![SchedulingError::Rejected {
                id: 1000,
                reason: "past".to_string(),
            }],
        });

        assert_eq!(total.scheduled_count, 5);
        assert_eq!(total.errors.len(), 2);
        assert!(!total.is_clean());
        assert!(ScheduleOutcome::empty().is_clean());
    }
}
