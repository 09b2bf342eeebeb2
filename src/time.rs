use std::time::Duration;

use chrono::format::{self, Parsed, StrftimeItems};
use chrono::{FixedOffset, NaiveTime, Offset, TimeZone, Utc};
use snafu::{OptionExt, Snafu};
use tracing::instrument;

pub type Timestamp = chrono::DateTime<Utc>;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// A timer that ticks once a day at `run_at` (UTC), starting with the next occurrence after `now`.
#[instrument]
pub fn daily_timer(run_at: NaiveTime, now: Timestamp) -> tokio::time::Interval {
    let start = tokio::time::Instant::now() + duration_to_next_run(run_at, now);

    let mut timer = tokio::time::interval_at(start, DAY);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    timer
}

/// compute the time until the clock next shows `run_at`.
/// a run that is due exactly now fires immediately.
fn duration_to_next_run(run_at: NaiveTime, now: Timestamp) -> Duration {
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(run_at));
    let next = if today >= now {
        today
    } else {
        today + chrono::Duration::days(1)
    };

    (next - now).to_std().unwrap_or_default()
}

/// Time of day for the daily run, written as `HH:MM` or `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunAt(pub NaiveTime);

impl std::str::FromStr for RunAt {
    type Err = ParseTimeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(input, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M:%S"))
            .map(RunAt)
            .ok()
            .context(TimeOfDaySnafu { text: input })
    }
}

impl std::fmt::Display for RunAt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

/// A fixed UTC offset written as `+HH:MM`, `-HH:MM` or `Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcOffset(pub FixedOffset);

impl std::str::FromStr for UtcOffset {
    type Err = ParseTimeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.eq_ignore_ascii_case("z") {
            return Ok(UtcOffset(Utc.fix()));
        }

        let mut parsed = Parsed::new();
        format::parse(&mut parsed, input, StrftimeItems::new("%:z"))
            .and_then(|_| parsed.to_fixed_offset())
            .map(UtcOffset)
            .ok()
            .context(UtcOffsetSnafu { text: input })
    }
}

impl std::fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Snafu, PartialEq)]
pub enum ParseTimeError {
    #[snafu(display("`{text}` is not a time of day, expected HH:MM"))]
    TimeOfDay { text: String },

    #[snafu(display("`{text}` is not a UTC offset, expected +HH:MM or -HH:MM"))]
    UtcOffset { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> Timestamp {
        text.parse().unwrap()
    }

    fn nine() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn run_later_today() {
        let result = duration_to_next_run(nine(), at("2026-02-01T07:30:00Z"));
        assert_eq!(
            result,
            Duration::from_secs(90 * 60),
            "a run later today should wait until then"
        );
    }

    #[test]
    fn run_already_passed_today() {
        let result = duration_to_next_run(nine(), at("2026-02-01T09:15:00Z"));
        assert_eq!(
            result,
            Duration::from_secs(23 * 3600 + 45 * 60),
            "a run that already happened today should wait for tomorrow"
        );
    }

    #[test]
    fn run_due_right_now() {
        let result = duration_to_next_run(nine(), at("2026-02-01T09:00:00Z"));
        assert_eq!(result, Duration::ZERO);
    }

    #[test]
    fn parse_run_at() {
        assert_eq!("09:00".parse(), Ok(RunAt(nine())));
        assert_eq!(
            "23:59:30".parse(),
            Ok(RunAt(NaiveTime::from_hms_opt(23, 59, 30).unwrap()))
        );
        assert!("9 o'clock".parse::<RunAt>().is_err());
    }

    #[test]
    fn parse_utc_offset() {
        assert_eq!(
            "+09:00".parse(),
            Ok(UtcOffset(FixedOffset::east_opt(9 * 3600).unwrap()))
        );
        assert_eq!(
            "-05:30".parse(),
            Ok(UtcOffset(FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap()))
        );
        assert_eq!("Z".parse(), Ok(UtcOffset(FixedOffset::east_opt(0).unwrap())));
    }

    #[test]
    fn reject_malformed_utc_offset() {
        for text in ["09:00", "+9", "+09:75", "+25:00", "+09:00 tokyo", ""] {
            assert_eq!(
                text.parse::<UtcOffset>(),
                Err(ParseTimeError::UtcOffset {
                    text: text.to_string()
                }),
                "`{text}` should be rejected"
            );
        }
    }
}
