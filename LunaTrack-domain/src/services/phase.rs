//! Phase classifier
//!
//! Classifies a day into exactly one phase. The order of the checks matters:
//! logged or expected bleeding always wins, and the fertile/ovulation window is
//! checked before PMS so that short cycles with overlapping windows still
//! report fertility.

use chrono::NaiveDate;

use crate::entities::{CyclePhase, CyclePrediction, CycleSettings, DayEntry, PhaseType};
use crate::services::prediction::resolve_last_period_start;

/// Classify `today` given settings, the current prediction and logged entries
pub fn classify(
    today: NaiveDate,
    settings: &CycleSettings,
    prediction: &CyclePrediction,
    entries: &[DayEntry],
) -> CyclePhase {
    let last_period_start = resolve_last_period_start(settings, today);

    let is_on_period = entries
        .iter()
        .find(|e| e.date == today)
        .map(|e| e.flow.is_flow())
        .unwrap_or(false);

    let day_number = cycle_day_number(today, last_period_start, settings.cycle_length);

    let days_until = (prediction.next_period_start - today).num_days();
    let is_late = days_until < 0;
    let late_days = if is_late { days_until.abs() } else { 0 };

    let in_expected_period = day_number >= 1 && day_number <= i64::from(settings.period_length);

    let phase_type = if is_on_period || in_expected_period {
        PhaseType::Period
    } else if prediction.in_fertile_window(today) {
        if today == prediction.ovulation_date {
            PhaseType::Ovulation
        } else {
            PhaseType::Fertile
        }
    } else if prediction.in_pms_window(today) {
        PhaseType::Pms
    } else if today <= prediction.fertile_window_start {
        PhaseType::Follicular
    } else {
        PhaseType::Luteal
    };

    CyclePhase {
        phase_type,
        day_number,
        days_until_period: days_until.max(0),
        is_late,
        late_days,
    }
}

/// 1-based day of the cycle, wrapped by the cycle length when `today`
/// precedes the recorded start
fn cycle_day_number(today: NaiveDate, last_period_start: NaiveDate, cycle_length: u32) -> i64 {
    let day_number = (today - last_period_start).num_days() + 1;
    if day_number > 0 {
        return day_number;
    }
    let cycle_length = i64::from(cycle_length.max(1));
    (day_number - 1).rem_euclid(cycle_length) + 1
}
