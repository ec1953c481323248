use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Predicted dates for the upcoming cycle.
///
/// Derived from settings and history on demand, never persisted. The intended
/// ordering is `fertile_window_start <= ovulation_date <= fertile_window_end <=
/// pms_start <= next_period_start`; pathological settings can break it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclePrediction {
    pub next_period_start: NaiveDate,
    pub next_period_end: NaiveDate,
    pub ovulation_date: NaiveDate,
    pub fertile_window_start: NaiveDate,
    pub fertile_window_end: NaiveDate,
    pub pms_start: NaiveDate,
    /// Spread of the estimate in days (1-5)
    pub uncertainty: u32,
}

impl CyclePrediction {
    /// Whether `date` falls inside the fertile window (both ends inclusive)
    pub fn in_fertile_window(&self, date: NaiveDate) -> bool {
        date >= self.fertile_window_start && date <= self.fertile_window_end
    }

    /// Whether `date` falls between PMS start and the next period
    pub fn in_pms_window(&self, date: NaiveDate) -> bool {
        date >= self.pms_start && date < self.next_period_start
    }
}

/// Phase of the cycle a day belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseType {
    Period,
    Follicular,
    Fertile,
    Ovulation,
    Luteal,
    Pms,
}

impl std::fmt::Display for PhaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PhaseType::Period => "period",
            PhaseType::Follicular => "follicular",
            PhaseType::Fertile => "fertile",
            PhaseType::Ovulation => "ovulation",
            PhaseType::Luteal => "luteal",
            PhaseType::Pms => "pms",
        };
        f.write_str(name)
    }
}

/// Where "today" sits in the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclePhase {
    #[serde(rename = "type")]
    pub phase_type: PhaseType,
    /// 1-based day of the current cycle
    pub day_number: i64,
    /// Days until the predicted period, never negative
    pub days_until_period: i64,
    pub is_late: bool,
    pub late_days: i64,
}

/// Summary of the recorded cycle history
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleStatistics {
    pub cycle_count: usize,
    pub average_length: Option<f64>,
    pub shortest: Option<u32>,
    pub longest: Option<u32>,
    /// Population standard deviation of the lengths
    pub std_deviation: Option<f64>,
}
