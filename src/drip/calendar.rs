use chrono::{Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc};

use crate::time::Timestamp;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Decides where one drip day ends and the next begins.
///
/// A module unlocks at midnight of its unlock date, and "midnight" is taken at a
/// fixed UTC offset. The default is UTC itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DripCalendar {
    offset: FixedOffset,
}

impl Default for DripCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl DripCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The calendar date `instant` falls on.
    pub fn date_of(&self, instant: Timestamp) -> NaiveDate {
        self.wall_clock(instant).date()
    }

    /// The date a module with `unlock_day` unlocks for a member who joined at `joined_at`.
    ///
    /// The time of day of `joined_at` is ignored. Offsets beyond the range of the
    /// calendar saturate at its first or last day.
    pub fn unlock_date(&self, joined_at: Timestamp, unlock_day: i64) -> NaiveDate {
        shift(self.date_of(joined_at), unlock_day)
    }

    /// Whether midnight of `unlock_date` has been reached at `now`, inclusive.
    pub fn is_unlocked(&self, unlock_date: NaiveDate, now: Timestamp) -> bool {
        self.wall_clock(now) >= midnight(unlock_date)
    }

    /// Whole days left until `unlock_date`, rounded up, or `None` once it is unlocked.
    pub fn days_until(&self, unlock_date: NaiveDate, now: Timestamp) -> Option<i64> {
        let remaining = midnight(unlock_date).signed_duration_since(self.wall_clock(now));
        let ms = remaining.num_milliseconds();

        (ms > 0).then(|| (ms - 1) / DAY_MS + 1)
    }

    /// The instant `unlock_date` begins, if it can be represented.
    pub fn unlocks_at(&self, unlock_date: NaiveDate) -> Option<Timestamp> {
        let offset = TimeDelta::try_seconds(self.offset.local_minus_utc().into())?;
        let utc = midnight(unlock_date).checked_sub_signed(offset)?;
        Some(Utc.from_utc_datetime(&utc))
    }

    fn wall_clock(&self, instant: Timestamp) -> NaiveDateTime {
        instant.with_timezone(&self.offset).naive_local()
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    let magnitude = Days::new(days.unsigned_abs());

    if days >= 0 {
        date.checked_add_days(magnitude).unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(magnitude).unwrap_or(NaiveDate::MIN)
    }
}
