//! Time-window selection over record collections
//!
//! "Local" always means the time zone of the reference instant passed in, so
//! callers choose `chrono::Local` for the user's wall clock and tests can pin
//! a fixed offset.

use chrono::{
    DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};

use crate::records::Record;

/// Records logged since local midnight `days` calendar days before `now`.
///
/// With `days = 1` this reaches back to yesterday's midnight; use
/// [`select_calendar_day`] for "today only". Input order is preserved.
pub fn select_window<R, Tz>(records: &[R], days: u32, now: &DateTime<Tz>) -> Vec<R>
where
    R: Record + Clone,
    Tz: TimeZone,
{
    let cutoff = window_start(days, now);
    records
        .iter()
        .filter(|r| r.timestamp() >= cutoff)
        .cloned()
        .collect()
}

/// Records inside the local calendar day of `reference`, both ends inclusive
pub fn select_calendar_day<R, Tz>(records: &[R], reference: &DateTime<Tz>) -> Vec<R>
where
    R: Record + Clone,
    Tz: TimeZone,
{
    let (start, end) = day_bounds(reference);
    records
        .iter()
        .filter(|r| {
            let ts = r.timestamp();
            ts >= start && ts <= end
        })
        .cloned()
        .collect()
}

/// Cutoff instant for a trailing window of `days` calendar days
pub fn window_start<Tz: TimeZone>(days: u32, now: &DateTime<Tz>) -> DateTime<Utc> {
    let today = now.date_naive();
    let first_day = today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    local_to_utc(&now.timezone(), first_day.and_time(NaiveTime::MIN), false)
}

/// `[00:00:00.000, 23:59:59.999]` of the reference's local date
pub fn day_bounds<Tz: TimeZone>(reference: &DateTime<Tz>) -> (DateTime<Utc>, DateTime<Utc>) {
    let tz = reference.timezone();
    let date = reference.date_naive();
    let start = local_to_utc(&tz, date.and_time(NaiveTime::MIN), false);
    let end = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .map(|end| local_to_utc(&tz, end, true))
        .unwrap_or(start);
    (start, end)
}

/// Resolve a local wall-clock time. Ambiguous times pick the earlier or later
/// instant. A time skipped by a DST jump uses the offset in force before the
/// jump, which lands on the first instant after the gap. Times outside the
/// representable range clamp to `MIN_UTC`/`MAX_UTC`.
fn local_to_utc<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime, latest: bool) -> DateTime<Utc> {
    let resolved = tz.from_local_datetime(&local);
    let picked = if latest { resolved.latest() } else { resolved.earliest() };
    if let Some(dt) = picked {
        return dt.with_timezone(&Utc);
    }

    // Gaps are shorter than a day, so one day earlier is still before the jump
    let before = local.checked_sub_days(Days::new(1)).unwrap_or(local);
    let offset = tz.offset_from_utc_datetime(&before).fix();
    let shift = Duration::seconds(i64::from(offset.local_minus_utc()));
    match local.checked_sub_signed(shift) {
        Some(utc) => Utc.from_utc_datetime(&utc),
        None if shift > Duration::zero() => DateTime::<Utc>::MIN_UTC,
        None => DateTime::<Utc>::MAX_UTC,
    }
}
