//! Hourly slot enumeration for a Sunday..Saturday week in the working timezone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::ops::RangeInclusive;

pub const DAYS_PER_WEEK: i64 = 7;

/// Years bookings and blocks may fall in. Stored timestamps only sort
/// correctly as text inside this range.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1970..=9999;

/// Daily opening window. Slots start at every full hour in `opening..closing`,
/// so the last slot ends at `closing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    opening: u32,
    closing: u32,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            opening: 8,
            closing: 17,
        }
    }
}

impl WorkingHours {
    pub fn new(opening: u32, closing: u32) -> Result<Self, String> {
        if opening >= closing || closing > 24 {
            return Err(format!(
                "Invalid working hours {opening}:00-{closing}:00, opening must be before closing"
            ));
        }
        Ok(Self { opening, closing })
    }

    pub fn opening(&self) -> u32 {
        self.opening
    }

    pub fn closing(&self) -> u32 {
        self.closing
    }

    pub fn hours(&self) -> impl Iterator<Item = u32> + Clone {
        self.opening..self.closing
    }

    pub fn contains(&self, hour: u32) -> bool {
        (self.opening..self.closing).contains(&hour)
    }
}

/// A candidate one hour booking unit. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub date: NaiveDate,
    pub hour: u32,
    pub start: DateTime<Utc>,
}

impl Slot {
    pub fn new(date: NaiveDate, hour: u32, timezone: &Tz) -> Self {
        Self {
            date,
            hour,
            start: local_instant(timezone, date, hour),
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::hours(1)
    }
}

/// Sunday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// The instant of `date` at `hour`:00 local time. Hours skipped by a DST
/// transition resolve to the first valid instant after the gap.
pub fn local_instant(timezone: &Tz, date: NaiveDate, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let mut naive = date.and_time(time);
    if hour >= 24 {
        naive += Duration::hours((hour - 23) as i64);
    }

    loop {
        if let Some(instant) = timezone.from_local_datetime(&naive).earliest() {
            return instant.with_timezone(&Utc);
        }
        naive += Duration::minutes(30);
    }
}

/// The first day of the week `week_offset` weeks away from the one holding `now`.
pub fn week_start_for_offset(now: DateTime<Utc>, week_offset: i64, timezone: &Tz) -> NaiveDate {
    let today = now.with_timezone(timezone).date_naive();
    week_start(today) + Duration::days(week_offset * DAYS_PER_WEEK)
}

/// Candidate slots for one week, Sunday first, hours ascending within each day.
pub fn enumerate_slots(
    now: DateTime<Utc>,
    week_offset: i64,
    working_hours: WorkingHours,
    timezone: Tz,
) -> impl Iterator<Item = Slot> {
    let first_day = week_start_for_offset(now, week_offset, &timezone);
    (0..DAYS_PER_WEEK).flat_map(move |day| {
        let date = first_day + Duration::days(day);
        working_hours
            .hours()
            .map(move |hour| Slot::new(date, hour, &timezone))
    })
}

pub fn is_supported_date(date: NaiveDate) -> bool {
    SUPPORTED_YEARS.contains(&date.year())
}

pub fn is_supported_instant(instant: DateTime<Utc>) -> bool {
    is_supported_date(instant.date_naive())
}

/// Whether `instant` falls exactly on a slot boundary inside working hours.
pub fn is_slot_start(instant: DateTime<Utc>, working_hours: WorkingHours, timezone: &Tz) -> bool {
    let local = instant.with_timezone(timezone);
    local.minute() == 0
        && local.second() == 0
        && local.nanosecond() == 0
        && working_hours.contains(local.hour())
}
