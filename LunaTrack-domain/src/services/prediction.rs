//! Cycle prediction engine
//!
//! Pure functions: the only clock dependency is the `today` argument, which is
//! used when the stored last period start is missing or unreadable.

use chrono::{DateTime, Duration, Local, NaiveDate};
use tracing::warn;

use crate::entities::{CyclePrediction, CycleRecord, CycleSettings, CycleStatistics};

/// Days before today assumed as the last period start when none is recorded
pub const FALLBACK_DAYS_BEFORE_TODAY: i64 = 14;

/// History size from which the recorded average replaces the declared length
pub const MIN_HISTORY_FOR_AVERAGE: usize = 3;

/// Number of most recent cycles averaged
pub const AVERAGE_WINDOW: usize = 6;

const DEFAULT_UNCERTAINTY: u32 = 2;
const MIN_UNCERTAINTY: u32 = 1;
const MAX_UNCERTAINTY: u32 = 5;

const FERTILE_DAYS_BEFORE_OVULATION: i64 = 5;
const FERTILE_DAYS_AFTER_OVULATION: i64 = 1;
const PMS_DAYS_AFTER_OVULATION: i64 = 2;

/// Parse a stored calendar date.
///
/// Accepts `yyyy-MM-dd` and full RFC 3339 timestamps (the date part is kept).
pub fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

/// The recorded last period start, or `today` minus 14 days when the setting
/// is empty or unreadable. Shared by the prediction engine and the phase
/// classifier so both agree on what "no recorded period" means.
pub fn resolve_last_period_start(settings: &CycleSettings, today: NaiveDate) -> NaiveDate {
    parse_calendar_date(&settings.last_period_start)
        .unwrap_or_else(|| today - Duration::days(FALLBACK_DAYS_BEFORE_TODAY))
}

/// Average cycle length and uncertainty from the declared length and history
pub fn average_cycle_length(settings: &CycleSettings, history: &[CycleRecord]) -> (i64, u32) {
    if history.len() < MIN_HISTORY_FOR_AVERAGE {
        return (i64::from(settings.cycle_length), DEFAULT_UNCERTAINTY);
    }

    let window = &history[history.len().saturating_sub(AVERAGE_WINDOW)..];
    let lengths: Vec<f64> = window.iter().map(|r| f64::from(r.length)).collect();

    let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
    let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / lengths.len() as f64;

    let uncertainty = (variance.sqrt().round() as u32).clamp(MIN_UNCERTAINTY, MAX_UNCERTAINTY);
    (mean.round() as i64, uncertainty)
}

/// Predict the next cycle relative to `today`.
///
/// `luteal_phase` is not checked against the average length; a luteal phase
/// longer than the cycle puts ovulation before the last period start.
///
/// Lengths that push a date outside the calendar fall back to the declared
/// cycle length, then to the default settings.
pub fn predict_at(settings: &CycleSettings, history: &[CycleRecord], today: NaiveDate) -> CyclePrediction {
    let last_period_start = resolve_last_period_start(settings, today);
    let (avg_cycle_length, uncertainty) = average_cycle_length(settings, history);
    let period_length = i64::from(settings.period_length);
    let luteal_phase = i64::from(settings.luteal_phase);

    if let Some(prediction) = project(last_period_start, avg_cycle_length, period_length, luteal_phase, uncertainty) {
        return prediction;
    }
    warn!("Average cycle length {} out of range, using declared length", avg_cycle_length);

    if let Some(prediction) = project(
        last_period_start,
        i64::from(settings.cycle_length),
        period_length,
        luteal_phase,
        DEFAULT_UNCERTAINTY,
    ) {
        return prediction;
    }
    warn!("Cycle settings out of range, predicting from defaults");

    let defaults = CycleSettings::default();
    project(
        last_period_start,
        i64::from(defaults.cycle_length),
        i64::from(defaults.period_length),
        i64::from(defaults.luteal_phase),
        DEFAULT_UNCERTAINTY,
    )
    .unwrap_or(CyclePrediction {
        next_period_start: last_period_start,
        next_period_end: last_period_start,
        ovulation_date: last_period_start,
        fertile_window_start: last_period_start,
        fertile_window_end: last_period_start,
        pms_start: last_period_start,
        uncertainty: DEFAULT_UNCERTAINTY,
    })
}

fn shift(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::days(days))
}

fn project(
    last_period_start: NaiveDate,
    cycle_length: i64,
    period_length: i64,
    luteal_phase: i64,
    uncertainty: u32,
) -> Option<CyclePrediction> {
    let next_period_start = shift(last_period_start, cycle_length)?;
    let ovulation_date = shift(next_period_start, -luteal_phase)?;

    Some(CyclePrediction {
        next_period_start,
        next_period_end: shift(next_period_start, period_length - 1)?,
        ovulation_date,
        fertile_window_start: shift(ovulation_date, -FERTILE_DAYS_BEFORE_OVULATION)?,
        fertile_window_end: shift(ovulation_date, FERTILE_DAYS_AFTER_OVULATION)?,
        pms_start: shift(ovulation_date, PMS_DAYS_AFTER_OVULATION)?,
        uncertainty,
    })
}

/// Predict the next cycle using the device's local date for the fallback
pub fn predict(settings: &CycleSettings, history: &[CycleRecord]) -> CyclePrediction {
    predict_at(settings, history, Local::now().date_naive())
}

/// Summary statistics over the whole recorded history
pub fn cycle_statistics(history: &[CycleRecord]) -> CycleStatistics {
    if history.is_empty() {
        return CycleStatistics::default();
    }

    let lengths: Vec<f64> = history.iter().map(|r| f64::from(r.length)).collect();
    let mean = lengths.iter().sum::<f64>() / lengths.len() as f64;
    let variance = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / lengths.len() as f64;

    CycleStatistics {
        cycle_count: history.len(),
        average_length: Some(mean),
        shortest: history.iter().map(|r| r.length).min(),
        longest: history.iter().map(|r| r.length).max(),
        std_deviation: Some(variance.sqrt()),
    }
}
