use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// User-declared cycle baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CycleSettings {
    /// Typical cycle length in days (21-40)
    pub cycle_length: u32,

    /// Typical period length in days (2-10)
    pub period_length: u32,

    /// Days between ovulation and the next period
    pub luteal_phase: u32,

    /// Start of the most recent period as `yyyy-MM-dd`.
    /// May be empty or garbage; readers fall back to a default.
    pub last_period_start: String,

    /// End of the most recent period, when known
    pub last_period_end: Option<String>,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            cycle_length: 28,
            period_length: 5,
            luteal_phase: 14,
            last_period_start: String::new(),
            last_period_end: None,
        }
    }
}

impl CycleSettings {
    /// Accepted cycle lengths in days
    pub const CYCLE_LENGTH_RANGE: RangeInclusive<u32> = 21..=40;

    /// Accepted period lengths in days
    pub const PERIOD_LENGTH_RANGE: RangeInclusive<u32> = 2..=10;

    /// Accepted luteal phase lengths in days
    pub const LUTEAL_PHASE_RANGE: RangeInclusive<u32> = 7..=20;

    /// Whether every length lies in its accepted range
    pub fn is_within_bounds(&self) -> bool {
        Self::CYCLE_LENGTH_RANGE.contains(&self.cycle_length)
            && Self::PERIOD_LENGTH_RANGE.contains(&self.period_length)
            && Self::LUTEAL_PHASE_RANGE.contains(&self.luteal_phase)
    }
}

/// One completed cycle in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleRecord {
    /// First day of the period that opened the cycle
    pub start_date: NaiveDate,

    /// Last day of the cycle
    pub end_date: NaiveDate,

    /// Cycle length in days
    pub length: u32,
}

/// Menstrual flow logged for a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowLevel {
    #[default]
    None,
    Spotting,
    Light,
    Medium,
    Heavy,
}

impl FlowLevel {
    /// Any logged flow other than `none` counts as a period day
    pub fn is_flow(self) -> bool {
        self != FlowLevel::None
    }
}

/// The user's log for one calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    /// Calendar date, unique across entries
    pub date: NaiveDate,

    #[serde(default)]
    pub flow: FlowLevel,

    #[serde(default)]
    pub symptoms: Vec<String>,

    #[serde(default)]
    pub mood: Option<String>,

    #[serde(default)]
    pub notes: String,

    /// Extended tracking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sexual_activity: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<String>>,
}

impl DayEntry {
    /// An empty entry for `date`
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            flow: FlowLevel::None,
            symptoms: Vec::new(),
            mood: None,
            notes: String::new(),
            discharge: None,
            sexual_activity: None,
            tests: None,
        }
    }

    /// Builder helper used when logging a period day
    pub fn with_flow(mut self, flow: FlowLevel) -> Self {
        self.flow = flow;
        self
    }
}
