//! Notification identifier bands
//!
//! All notifications share one flat `i32` id space. Cycle reminders live in
//! 1000..9000 plus the diagnostic id 99999; medication reminders live in
//! `[BASE, BASE + MEDICATION_ID_MAX)`. Ids are derived by pure functions so the
//! same reminder always gets the same id and can be cancelled later without
//! keeping a registry.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use luna_track_data::models::NotificationType;

/// Width of one cycle notification band
pub const CYCLE_BAND_WIDTH: i32 = 1000;

/// Diagnostic cycle notification id
pub const CYCLE_TEST_ID: i32 = 99_999;

/// Start of the medication band
pub const BASE: i32 = 100_000_000;

/// Size of the medication band
pub const MEDICATION_ID_MAX: i32 = 100_000_000;

/// Offset of the first schedule id inside the medication band
pub const SCHEDULE_OFFSET: i32 = 10_000_000;

/// Offset of the snooze sub-band inside the medication band
pub const SNOOZE_OFFSET: i32 = 90_000_000;

/// Number of schedule buckets
pub const SCHEDULE_MEDKEY_MOD: u32 = 8000;

/// Number of snooze buckets
pub const SNOOZE_MEDHASH_MOD: u32 = 900;

/// Ids reserved per medication bucket
pub const BUCKET_WIDTH: i32 = 10_000;

/// Days of reminders kept scheduled ahead
pub const SCHEDULE_DAYS: u32 = 30;

/// Reminder times per medication that get notifications
pub const MAX_REMINDER_TIMES: usize = 8;

/// Diagnostic medication notification id
pub const MEDICATION_TEST_ID: i32 = BASE + MEDICATION_ID_MAX - 1;

const SCHEDULE_KEY_OFFSET: u32 = 1000;
const DAY_STRIDE: i32 = 100;

/// First id of the band for a cycle notification type
pub fn cycle_band_base(notification_type: NotificationType) -> i32 {
    let index = match notification_type {
        NotificationType::PeriodApproaching => 1,
        NotificationType::PeriodExpected => 2,
        NotificationType::PeriodLate => 3,
        NotificationType::FertileStart => 4,
        NotificationType::OvulationDay => 5,
        NotificationType::FertileEnding => 6,
        NotificationType::PmsReminder => 7,
        NotificationType::DailyCheckin => 8,
    };
    index * CYCLE_BAND_WIDTH
}

/// Id of the `counter`-th notification of a type in one scheduling pass
pub fn cycle_notification_id(notification_type: NotificationType, counter: u32) -> i32 {
    let counter = counter.min(CYCLE_BAND_WIDTH as u32 - 1) as i32;
    cycle_band_base(notification_type) + counter
}

/// Whether `id` belongs to the cycle family (type bands or the test id)
pub fn is_cycle_notification_id(id: i32) -> bool {
    (CYCLE_BAND_WIDTH..9 * CYCLE_BAND_WIDTH).contains(&id) || id == CYCLE_TEST_ID
}

/// Every id the cycle family can ever use
pub fn all_cycle_notification_ids() -> Vec<i32> {
    (CYCLE_BAND_WIDTH..9 * CYCLE_BAND_WIDTH)
        .chain(std::iter::once(CYCLE_TEST_ID))
        .collect()
}

/// Sum of the UTF-16 code units of `medication_id`, modulo `modulus`.
///
/// Reduced at every step, so ids of any length stay in range.
pub fn char_code_sum(medication_id: &str, modulus: u32) -> u32 {
    let modulus = modulus.max(1);
    medication_id
        .encode_utf16()
        .fold(0, |acc, unit| (acc + u32::from(unit)) % modulus)
}

/// Schedule bucket of a medication, 1000..=8999
pub fn medication_key(medication_id: &str) -> u32 {
    char_code_sum(medication_id, SCHEDULE_MEDKEY_MOD) + SCHEDULE_KEY_OFFSET
}

/// Snooze bucket of a medication, 0..=899
pub fn medication_hash(medication_id: &str) -> u32 {
    char_code_sum(medication_id, SNOOZE_MEDHASH_MOD)
}

/// Id of the reminder for `medication_id` on `day_offset` at reminder slot
/// `time_index`. Out-of-grid arguments are clamped onto the grid.
pub fn schedule_id(medication_id: &str, day_offset: u32, time_index: usize) -> i32 {
    let day = day_offset.min(SCHEDULE_DAYS - 1) as i32;
    let slot = time_index.min(MAX_REMINDER_TIMES - 1) as i32;
    BASE + medication_key(medication_id) as i32 * BUCKET_WIDTH + day * DAY_STRIDE + slot
}

/// Every schedule id of one medication (the full 30 x 8 grid)
pub fn medication_schedule_ids(medication_id: &str) -> Vec<i32> {
    (0..SCHEDULE_DAYS)
        .flat_map(|day| (0..MAX_REMINDER_TIMES).map(move |slot| schedule_id(medication_id, day, slot)))
        .collect()
}

/// Snooze id for `medication_id` with a nonce already reduced below 10000
pub fn snooze_id(medication_id: &str, nonce: u32) -> i32 {
    snooze_range(medication_id).start + (nonce % BUCKET_WIDTH as u32) as i32
}

/// Range of snooze ids a medication can use
pub fn snooze_range(medication_id: &str) -> Range<i32> {
    let start = BASE + SNOOZE_OFFSET + medication_hash(medication_id) as i32 * BUCKET_WIDTH;
    start..start + BUCKET_WIDTH
}

/// Whether `id` belongs to the medication family
pub fn is_medication_id(id: i32) -> bool {
    (BASE..BASE + MEDICATION_ID_MAX).contains(&id)
}

/// Whether `id` is a medication schedule id
pub fn is_schedule_id(id: i32) -> bool {
    (BASE + SCHEDULE_OFFSET..BASE + SNOOZE_OFFSET).contains(&id)
}

/// Whether `id` is a medication snooze id (the test id excluded)
pub fn is_snooze_id(id: i32) -> bool {
    (BASE + SNOOZE_OFFSET..MEDICATION_TEST_ID).contains(&id)
}

/// Source of snooze nonces.
///
/// The counter belongs to the allocator instance and only increases, so two
/// snoozes allocated within the same millisecond still differ.
#[derive(Debug, Default)]
pub struct MedicationIdAllocator {
    counter: AtomicU64,
}

impl MedicationIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next nonce for a snooze allocated at `now_millis`
    pub fn next_nonce(&self, now_millis: i64) -> u32 {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed);
        let millis = now_millis.rem_euclid(i64::from(BUCKET_WIDTH)) as u64;
        ((millis + counter % BUCKET_WIDTH as u64) % BUCKET_WIDTH as u64) as u32
    }

    /// Fresh snooze id for `medication_id`
    pub fn allocate_snooze_id(&self, medication_id: &str, now_millis: i64) -> i32 {
        snooze_id(medication_id, self.next_nonce(now_millis))
    }
}
