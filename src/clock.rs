//! Time source and day boundaries
//!
//! Daily PnL rows are keyed by the start of the day in a fixed reference
//! offset of UTC−8. The offset is deliberately fixed: applying a named zone
//! would shift the day boundary twice a year and split one trading day
//! across two rows.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

/// Reference offset for day boundaries (UTC−8, no DST)
const REFERENCE_OFFSET_SECS: i32 = -8 * 3600;

/// Time source seam; production uses [`SystemClock`], tests pin the instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn reference_offset() -> FixedOffset {
    FixedOffset::east_opt(REFERENCE_OFFSET_SECS).expect("valid fixed offset")
}

/// Start of the day containing `instant`, in the reference offset
pub fn day_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    let offset = reference_offset();
    let local = instant.with_timezone(&offset);
    let midnight = local
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight exists");
    offset
        .from_local_datetime(&midnight)
        .single()
        .expect("fixed offset is unambiguous")
        .with_timezone(&Utc)
}

/// Last millisecond of the day containing `instant`
pub fn day_end(instant: DateTime<Utc>) -> DateTime<Utc> {
    day_start(instant) + Duration::days(1) - Duration::milliseconds(1)
}

/// Whether `instant` falls within the same reference-offset day as `today`
///
/// Inclusive on both ends, matching the PnL window `[day_start, day_end]`.
pub fn same_day(instant: DateTime<Utc>, today: DateTime<Utc>) -> bool {
    let start = day_start(today);
    let end = day_end(today);
    instant >= start && instant <= end
}
