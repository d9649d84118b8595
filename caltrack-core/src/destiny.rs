//! Decides what should happen to the record behind a calendar event.
//!
//! A record is created when its event:
//! 1. is not represented in the record store yet,
//! 2. does not start before the create cutoff, and
//! 3. has already ended.
//!
//! A record is updated when it is not frozen, its event is still valid, the
//! projected fields differ, the event start is within the update cutoff and
//! the record date is within the update cutoff.
//!
//! A record is deleted when it is not too old to delete and its event has
//! either been moved out of the valid window (before the create cutoff or
//! into the future) or disappeared from the feed.
//!
//! Frozen records, too old for both update and delete, are never touched.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::change;
use crate::event::Event;
use crate::record::TrackedRecord;
use crate::threshold::{Operation, ThresholdPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destiny {
    Skip,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Destiny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destiny::Skip => write!(f, "skipped"),
            Destiny::Create => write!(f, "created"),
            Destiny::Update => write!(f, "updated"),
            Destiny::Delete => write!(f, "deleted"),
        }
    }
}

/// Pure decision function over one event and its record, if any.
#[derive(Debug, Clone, Copy)]
pub struct DestinyResolver {
    policy: ThresholdPolicy,
}

impl DestinyResolver {
    pub fn new(policy: ThresholdPolicy) -> Self {
        DestinyResolver { policy }
    }

    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    pub fn resolve(
        &self,
        event: &Event,
        existing: Option<&TrackedRecord>,
        issue_id: &str,
        now: DateTime<Utc>,
    ) -> Destiny {
        if event.is_all_day() {
            warn!(uid = %event.uid, "skipping full-day event, it cannot become a time record");
            return Destiny::Skip;
        }

        // Timed values resolve to an instant even inside DST gaps.
        let (Some(start), Some(end)) = (event.start.to_utc(), event.end.to_utc()) else {
            warn!(uid = %event.uid, start = %event.start, "skipping event whose time cannot be placed");
            return Destiny::Skip;
        };

        let in_future = end > now;
        let too_old_to_create = self.policy.events.too_old(Operation::Create, start, now);

        let Some(record) = existing else {
            if in_future {
                debug!(uid = %event.uid, "event has not ended yet");
                return Destiny::Skip;
            }
            if too_old_to_create {
                debug!(uid = %event.uid, "event is too old to be created");
                return Destiny::Skip;
            }
            return Destiny::Create;
        };

        if self.is_frozen(record, now) {
            debug!(uid = %event.uid, record = record.id, "record is frozen");
            return Destiny::Skip;
        }

        if in_future || too_old_to_create {
            debug!(
                uid = %event.uid,
                in_future,
                too_old_to_create,
                "event moved out of the valid window"
            );
            return self.resolve_cleanup(record, now);
        }

        let shape = change::shape_between(event, issue_id, start, end);
        let changed = change::changed_fields(record, &shape);
        if changed.is_empty() {
            return Destiny::Skip;
        }
        debug!(uid = %event.uid, fields = ?changed, "event has changed");

        if self.policy.events.too_old(Operation::Update, start, now) {
            debug!(uid = %event.uid, "event is too old to be updated");
            return Destiny::Skip;
        }
        if self
            .policy
            .records
            .date_too_old(Operation::Update, record.spent_on, now)
        {
            debug!(uid = %event.uid, record = record.id, "record is too old to be updated");
            return Destiny::Skip;
        }

        Destiny::Update
    }

    /// Destiny of a record whose event is no longer in the feed.
    pub fn resolve_missing(&self, record: &TrackedRecord, now: DateTime<Utc>) -> Destiny {
        if self.is_frozen(record, now) {
            debug!(uid = %record.uid, record = record.id, "record of a removed event is frozen");
            return Destiny::Skip;
        }
        self.resolve_cleanup(record, now)
    }

    /// A frozen record is too old for both update and delete.
    pub fn is_frozen(&self, record: &TrackedRecord, now: DateTime<Utc>) -> bool {
        let records = &self.policy.records;
        records.date_too_old(Operation::Delete, record.spent_on, now)
            && records.date_too_old(Operation::Update, record.spent_on, now)
    }

    fn resolve_cleanup(&self, record: &TrackedRecord, now: DateTime<Utc>) -> Destiny {
        if self
            .policy
            .records
            .date_too_old(Operation::Delete, record.spent_on, now)
        {
            debug!(uid = %record.uid, record = record.id, "record is too old to be deleted");
            Destiny::Skip
        } else {
            Destiny::Delete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventTime;
    use crate::threshold::{OperationThresholds, Threshold};
    use chrono::{NaiveDate, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn make_event(uid: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event {
            uid: uid.to_string(),
            summary: "#42 Review".to_string(),
            description: Some("Code review".to_string()),
            start: EventTime::DateTimeUtc(start),
            end: EventTime::DateTimeUtc(end),
            recurrence: None,
            sequence: None,
        }
    }

    fn record_for(event: &Event) -> TrackedRecord {
        let shape = change::project(event, "42").unwrap();
        TrackedRecord {
            id: 1,
            uid: shape.uid,
            spent_on: shape.spent_on,
            hours: shape.hours,
            comment: shape.comment,
            issue_id: shape.issue_id,
        }
    }

    fn resolver_with(events: OperationThresholds, records: OperationThresholds) -> DestinyResolver {
        DestinyResolver::new(ThresholdPolicy { events, records })
    }

    fn permissive() -> DestinyResolver {
        DestinyResolver::new(ThresholdPolicy::permissive())
    }

    fn cutoff(y: i32, m: u32, d: u32) -> Threshold {
        Threshold::Since(utc(y, m, d, 0))
    }

    fn now() -> DateTime<Utc> {
        utc(2024, 3, 1, 12)
    }

    fn e1() -> Event {
        make_event("E1", utc(2024, 1, 10, 9), utc(2024, 1, 10, 10))
    }

    #[test]
    fn test_scenario_a_concluded_event_is_created() {
        assert_eq!(permissive().resolve(&e1(), None, "42", now()), Destiny::Create);
    }

    #[test]
    fn test_scenario_b_future_event_is_skipped() {
        let event = make_event("E1", utc(2024, 1, 10, 9), utc(2030, 1, 10, 10));
        assert_eq!(permissive().resolve(&event, None, "42", now()), Destiny::Skip);
    }

    #[test]
    fn test_scenario_c_frozen_record_is_skipped() {
        let resolver = resolver_with(
            OperationThresholds::uniform(Threshold::Always),
            OperationThresholds {
                create: Threshold::Always,
                update: cutoff(2024, 6, 1),
                delete: cutoff(2024, 6, 1),
            },
        );
        let event = e1();
        let mut record = record_for(&event);
        record.hours = 5.0;

        assert_eq!(resolver.resolve(&event, Some(&record), "42", now()), Destiny::Skip);

        let moved = make_event("E1", utc(2024, 1, 10, 9), utc(2030, 1, 10, 10));
        assert_eq!(resolver.resolve(&moved, Some(&record), "42", now()), Destiny::Skip);
        assert_eq!(resolver.resolve_missing(&record, now()), Destiny::Skip);
    }

    #[test]
    fn test_scenario_d_missing_event_is_deleted() {
        let record = TrackedRecord {
            id: 2,
            uid: "E2".to_string(),
            spent_on: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            hours: 1.0,
            comment: "no comment".to_string(),
            issue_id: "42".to_string(),
        };
        assert_eq!(permissive().resolve_missing(&record, now()), Destiny::Delete);
    }

    #[test]
    fn test_all_day_events_are_always_skipped() {
        let mut event = e1();
        event.start = EventTime::Date(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let record = TrackedRecord {
            id: 3,
            uid: "E1".to_string(),
            spent_on: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            hours: 8.0,
            comment: "no comment".to_string(),
            issue_id: "42".to_string(),
        };

        assert_eq!(permissive().resolve(&event, None, "42", now()), Destiny::Skip);
        assert_eq!(permissive().resolve(&event, Some(&record), "42", now()), Destiny::Skip);
    }

    #[test]
    fn test_event_starting_in_dst_gap_is_created() {
        let wall = |h, m| {
            NaiveDate::from_ymd_opt(2024, 3, 31)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap()
        };
        let mut event = e1();
        event.start = EventTime::DateTimeZoned {
            datetime: wall(2, 30),
            tzid: "Europe/Copenhagen".to_string(),
        };
        event.end = EventTime::DateTimeZoned {
            datetime: wall(4, 0),
            tzid: "Europe/Copenhagen".to_string(),
        };

        assert!(!event.is_all_day());
        assert_eq!(
            permissive().resolve(&event, None, "42", utc(2024, 4, 10, 12)),
            Destiny::Create
        );
    }

    #[test]
    fn test_event_before_create_cutoff_is_not_created() {
        let resolver = resolver_with(
            OperationThresholds::uniform(cutoff(2024, 2, 1)),
            OperationThresholds::uniform(Threshold::Always),
        );
        assert_eq!(resolver.resolve(&e1(), None, "42", now()), Destiny::Skip);

        let recent = make_event("E3", utc(2024, 2, 1, 9), utc(2024, 2, 1, 10));
        assert_eq!(resolver.resolve(&recent, None, "42", now()), Destiny::Create);
    }

    #[test]
    fn test_changed_event_within_cutoffs_is_updated() {
        let event = e1();
        let mut record = record_for(&event);
        record.comment = "stale".to_string();

        assert_eq!(permissive().resolve(&event, Some(&record), "42", now()), Destiny::Update);
        assert_eq!(permissive().resolve(&event, Some(&record), "43", now()), Destiny::Update);
    }

    #[test]
    fn test_unchanged_event_is_skipped() {
        let event = e1();
        let record = record_for(&event);
        assert_eq!(permissive().resolve(&event, Some(&record), "42", now()), Destiny::Skip);
    }

    #[test]
    fn test_update_gated_by_both_sides() {
        let event = e1();
        let mut record = record_for(&event);
        record.hours = 3.0;

        let event_side = resolver_with(
            OperationThresholds {
                create: Threshold::Always,
                update: cutoff(2024, 2, 1),
                delete: Threshold::Always,
            },
            OperationThresholds::uniform(Threshold::Always),
        );
        assert_eq!(event_side.resolve(&event, Some(&record), "42", now()), Destiny::Skip);

        let record_side = resolver_with(
            OperationThresholds::uniform(Threshold::Always),
            OperationThresholds {
                create: Threshold::Always,
                update: cutoff(2024, 2, 1),
                delete: Threshold::Always,
            },
        );
        assert_eq!(record_side.resolve(&event, Some(&record), "42", now()), Destiny::Skip);
    }

    #[test]
    fn test_event_moved_out_of_window_is_deleted() {
        let event = e1();
        let record = record_for(&event);

        let moved_to_future = make_event("E1", utc(2024, 1, 10, 9), utc(2030, 1, 10, 10));
        assert_eq!(
            permissive().resolve(&moved_to_future, Some(&record), "42", now()),
            Destiny::Delete
        );

        let resolver = resolver_with(
            OperationThresholds {
                create: cutoff(2024, 2, 1),
                update: Threshold::Always,
                delete: Threshold::Always,
            },
            OperationThresholds::uniform(Threshold::Always),
        );
        assert_eq!(resolver.resolve(&event, Some(&record), "42", now()), Destiny::Delete);
    }

    #[test]
    fn test_delete_needs_record_within_delete_cutoff() {
        let resolver = resolver_with(
            OperationThresholds::uniform(Threshold::Always),
            OperationThresholds {
                create: Threshold::Always,
                update: Threshold::Always,
                delete: Threshold::Never,
            },
        );
        let record = record_for(&e1());
        let moved = make_event("E1", utc(2024, 1, 10, 9), utc(2030, 1, 10, 10));

        assert!(!resolver.is_frozen(&record, now()));
        assert_eq!(resolver.resolve(&moved, Some(&record), "42", now()), Destiny::Skip);
        assert_eq!(resolver.resolve_missing(&record, now()), Destiny::Skip);
    }

    #[test]
    fn test_days_ago_thresholds_follow_now() {
        let resolver = resolver_with(
            OperationThresholds::uniform(Threshold::DaysAgo(30)),
            OperationThresholds::uniform(Threshold::DaysAgo(30)),
        );
        let event = e1();

        assert_eq!(resolver.resolve(&event, None, "42", utc(2024, 1, 20, 0)), Destiny::Create);
        assert_eq!(resolver.resolve(&event, None, "42", utc(2024, 3, 20, 0)), Destiny::Skip);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let event = e1();
        let mut record = record_for(&event);
        record.hours = 2.5;
        let resolver = permissive();

        let first = resolver.resolve(&event, Some(&record), "42", now());
        let second = resolver.resolve(&event, Some(&record), "42", now());
        assert_eq!(first, second);
    }
}
