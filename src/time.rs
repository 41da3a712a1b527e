//! US Eastern daylight-saving math.
//!
//! The sheet stores two named offset cells (standard and daylight time); which one
//! a row's column C formula subtracts from the UTC timestamp depends on whether
//! the race starts during DST. Computed from the post-2007 rule: DST begins at
//! 2:00 AM Eastern on the second Sunday of March and ends at 2:00 AM Eastern on
//! the first Sunday of November.

use {
    chrono::Days,
    crate::prelude::*,
};

/// Rolls forward 0–6 days to the next Sunday, counting the date itself.
fn first_sunday_on_or_after(date: NaiveDate) -> NaiveDate {
    date + Days::new(u64::from((7 - date.weekday().num_days_from_sunday()) % 7))
}

fn at_utc(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).expect("valid wall-clock time"))
}

/// The instant DST begins in the given year: 2:00 AM EST on the second Sunday of
/// March, i.e. 07:00 UTC.
pub(crate) fn dst_start(year: i32) -> DateTime<Utc> {
    let march_1 = NaiveDate::from_ymd_opt(year, 3, 1).expect("March 1 exists in every year");
    at_utc(first_sunday_on_or_after(march_1) + Days::new(7), 7)
}

/// The instant DST ends in the given year: 2:00 AM EDT on the first Sunday of
/// November, i.e. 06:00 UTC.
pub(crate) fn dst_end(year: i32) -> DateTime<Utc> {
    let november_1 = NaiveDate::from_ymd_opt(year, 11, 1).expect("November 1 exists in every year");
    at_utc(first_sunday_on_or_after(november_1), 6)
}

/// Whether the given instant falls within US Eastern daylight-saving time.
///
/// Half-open interval: the start boundary counts as DST, the end boundary does
/// not. Boundaries are taken from the instant's own UTC calendar year, which is
/// only ever wrong within a few hours of New Year — transitions happen in March
/// and November.
pub(crate) fn is_us_eastern_dst(at: DateTime<Utc>) -> bool {
    dst_start(at.year()) <= at && at < dst_end(at.year())
}
