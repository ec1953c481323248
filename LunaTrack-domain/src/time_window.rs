//! Time-of-day helpers: `HH:mm` parsing, quiet-hour containment and
//! resolution of the instant a notification may actually be delivered.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Parse a `H:mm` / `HH:mm` label. Anything else is `None`.
pub fn parse_hhmm(text: &str) -> Option<NaiveTime> {
    let (hours, minutes) = text.trim().split_once(':')?;

    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !digits(hours) || hours.len() > 2 || !digits(minutes) || minutes.len() != 2 {
        return None;
    }

    let hour: u32 = hours.parse().ok()?;
    let minute: u32 = minutes.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Format a time as a `HH:mm` label
pub fn format_hhmm(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// A daily interval during which notifications must not fire.
///
/// `start > end` means the interval wraps past midnight (22:00-08:00).
/// `start == end` is an empty interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build from `HH:mm` labels; unparseable labels disable quiet hours
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        Some(Self::new(parse_hhmm(start)?, parse_hhmm(end)?))
    }

    /// Whether the interval crosses midnight
    pub fn wraps(&self) -> bool {
        self.start > self.end
    }

    /// Whether `time` falls inside quiet hours (start inclusive, end exclusive)
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start == self.end {
            return false;
        }

        if self.wraps() {
            time >= self.start || time < self.end
        } else {
            time >= self.start && time < self.end
        }
    }
}

/// Delivery instant for a notification targeted at `date` and `preferred` time.
///
/// Inside quiet hours the notification moves to the quiet-hours end on the same
/// calendar date, so a daily reminder never drifts onto the following day's slot.
pub fn resolve_delivery_time(
    date: NaiveDate,
    preferred: NaiveTime,
    quiet: Option<&QuietHours>,
) -> NaiveDateTime {
    match quiet {
        Some(quiet) if quiet.contains(preferred) => date.and_time(quiet.end),
        _ => date.and_time(preferred),
    }
}

/// Earliest instant at or after `instant` that lies outside quiet hours
pub fn next_valid_time(instant: NaiveDateTime, quiet: Option<&QuietHours>) -> NaiveDateTime {
    let Some(quiet) = quiet else {
        return instant;
    };

    let time = instant.time();
    if !quiet.contains(time) {
        return instant;
    }

    let date = instant.date();
    if quiet.wraps() && time >= quiet.start {
        (date + Duration::days(1)).and_time(quiet.end)
    } else {
        date.and_time(quiet.end)
    }
}
