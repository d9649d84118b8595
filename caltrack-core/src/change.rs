//! Projection of events into record shape and change detection.

use chrono::{DateTime, Utc};

use crate::event::Event;
use crate::record::{RecordShape, TrackedRecord};

/// Comment stored when an event has no description.
pub const EMPTY_COMMENT: &str = "no comment";

/// Project an event into the record it would produce.
///
/// Returns `None` for all-day events, which never become records.
pub fn project(event: &Event, issue_id: &str) -> Option<RecordShape> {
    Some(shape_between(
        event,
        issue_id,
        event.start.to_utc()?,
        event.end.to_utc()?,
    ))
}

/// Record shape of an event already placed at `start`..`end`.
pub fn shape_between(
    event: &Event,
    issue_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> RecordShape {
    let minutes = (end - start).num_minutes() as f64;
    let hours = (minutes / 60.0 * 10.0).round() / 10.0;

    let comment = match event.description.as_deref().map(str::trim) {
        Some(description) if !description.is_empty() => description.to_string(),
        _ => EMPTY_COMMENT.to_string(),
    };

    RecordShape {
        uid: event.uid.clone(),
        spent_on: event.start.wall_date(),
        hours,
        comment,
        issue_id: issue_id.to_string(),
    }
}

/// Names of the fields that differ between a record and a projection.
pub fn changed_fields(record: &TrackedRecord, shape: &RecordShape) -> Vec<&'static str> {
    let mut fields = Vec::new();

    if record.spent_on != shape.spent_on {
        fields.push("spent_on");
    }
    if record.hours != shape.hours {
        fields.push("hours");
    }
    if record.comment != shape.comment {
        fields.push("comment");
    }
    if record.issue_id != shape.issue_id {
        fields.push("issue_id");
    }

    fields
}

pub fn has_changed(record: &TrackedRecord, shape: &RecordShape) -> bool {
    !changed_fields(record, shape).is_empty()
}
