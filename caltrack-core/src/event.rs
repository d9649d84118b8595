//! Calendar event types as read from a feed.
//!
//! Events are immutable once fetched. Only the handful of properties the
//! reconciliation needs are kept; everything else in the VEVENT is dropped.

use std::fmt;

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A calendar event from the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub uid: String,
    pub summary: String,
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    /// RRULE of a recurring master event. Recurrences are never expanded.
    pub recurrence: Option<String>,
    /// Revision sequence number (SEQUENCE)
    pub sequence: Option<i64>,
}

impl Event {
    /// Full-day events carry a date without a time of day on either end.
    pub fn is_all_day(&self) -> bool {
        self.start.is_date() || self.end.is_date()
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' starting {}", self.summary, self.start)
    }
}

/// Start or end of an event, preserving how the feed expressed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventTime {
    /// All-day value (VALUE=DATE)
    Date(NaiveDate),
    /// UTC datetime (trailing `Z`)
    DateTimeUtc(DateTime<Utc>),
    /// Floating datetime, interpreted in the local timezone
    DateTimeFloating(NaiveDateTime),
    /// Datetime with a TZID parameter
    DateTimeZoned {
        datetime: NaiveDateTime,
        tzid: String,
    },
}

impl EventTime {
    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Absolute instant of this time. `None` for all-day values.
    ///
    /// Zoned times with an unknown TZID are treated as floating. Wall times
    /// repeated by a DST fold take the earlier instant; wall times skipped by
    /// a DST gap take the offset in force before the gap.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::Date(_) => None,
            EventTime::DateTimeUtc(dt) => Some(*dt),
            EventTime::DateTimeFloating(naive) => wall_to_utc(&Local, naive),
            EventTime::DateTimeZoned { datetime, tzid } => match tzid.parse::<chrono_tz::Tz>() {
                Ok(tz) => wall_to_utc(&tz, datetime),
                Err(_) => wall_to_utc(&Local, datetime),
            },
        }
    }

    /// Calendar date as the attendee sees it on their wall clock.
    pub fn wall_date(&self) -> NaiveDate {
        match self {
            EventTime::Date(d) => *d,
            EventTime::DateTimeUtc(dt) => dt.date_naive(),
            EventTime::DateTimeFloating(naive) => naive.date(),
            EventTime::DateTimeZoned { datetime, .. } => datetime.date(),
        }
    }
}

fn wall_to_utc<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        LocalResult::None => {
            // Gaps never span a day, so the day before carries the pre-gap offset.
            let before = tz
                .from_local_datetime(&(*naive - Duration::days(1)))
                .earliest()?;
            let offset = before.offset().fix().local_minus_utc();
            Some((*naive - Duration::seconds(i64::from(offset))).and_utc())
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

/// A VEVENT that lacked DTSTART or DTEND.
///
/// These are kept apart from [`Event`] so they never reach the resolver but
/// can still be reported when their summary matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MalformedEvent {
    pub uid: String,
    pub summary: String,
    pub missing: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoned_time_converts_through_timezone() {
        let time = EventTime::DateTimeZoned {
            datetime: NaiveDate::from_ymd_opt(2024, 1, 10)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            tzid: "Europe/Copenhagen".to_string(),
        };

        assert_eq!(
            time.to_utc(),
            Some(Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap())
        );
        assert_eq!(time.wall_date(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[test]
    fn test_time_in_dst_gap_uses_offset_before_gap() {
        let time = EventTime::DateTimeZoned {
            datetime: NaiveDate::from_ymd_opt(2024, 3, 31)
                .unwrap()
                .and_hms_opt(2, 30, 0)
                .unwrap(),
            tzid: "Europe/Copenhagen".to_string(),
        };

        assert_eq!(
            time.to_utc(),
            Some(Utc.with_ymd_and_hms(2024, 3, 31, 1, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_time_in_dst_fold_takes_earlier_instant() {
        let time = EventTime::DateTimeZoned {
            datetime: NaiveDate::from_ymd_opt(2024, 10, 27)
                .unwrap()
                .and_hms_opt(2, 30, 0)
                .unwrap(),
            tzid: "Europe/Copenhagen".to_string(),
        };

        assert_eq!(
            time.to_utc(),
            Some(Utc.with_ymd_and_hms(2024, 10, 27, 0, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_date_has_no_instant() {
        let time = EventTime::Date(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert!(time.is_date());
        assert_eq!(time.to_utc(), None);
    }
}
