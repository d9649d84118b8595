//! Per-principal outcome of a batch run.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::destiny::Destiny;

/// A recurring event that was counted but not expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringEvent {
    pub uid: String,
    pub summary: String,
    pub start: String,
    pub rrule: String,
}

/// An event that could not be acted upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventError {
    pub uid: String,
    pub summary: String,
    /// Human-readable start, empty when the event had none
    pub start: String,
    pub issue_id: String,
    /// The action that failed. `None` when the event was malformed.
    pub destiny: Option<Destiny>,
    pub detail: String,
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: entry for event '{}'", self.detail, self.summary)?;
        if !self.start.is_empty() {
            write!(f, " starting {}", self.start)?;
        }
        write!(f, " referencing issue #{}", self.issue_id)?;
        match self.destiny {
            Some(destiny) => write!(f, " couldn't be {destiny}"),
            None => write!(f, " is malformed"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub skipped: usize,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub recurring: Vec<RecurringEvent>,
    pub errors: Vec<EventError>,
}

impl Report {
    pub fn tally(&mut self, destiny: Destiny) {
        match destiny {
            Destiny::Skip => self.skipped += 1,
            Destiny::Create => self.created += 1,
            Destiny::Update => self.updated += 1,
            Destiny::Delete => self.deleted += 1,
        }
    }

    pub fn count(&self, destiny: Destiny) -> usize {
        match destiny {
            Destiny::Skip => self.skipped,
            Destiny::Create => self.created,
            Destiny::Update => self.updated,
            Destiny::Delete => self.deleted,
        }
    }

    pub fn changes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    /// Only reports with writes or errors are worth telling the user about.
    pub fn needs_notification(&self) -> bool {
        self.changes() > 0 || !self.errors.is_empty()
    }

    /// Fold another report into this one (for run totals).
    pub fn merge(&mut self, other: &Report) {
        self.skipped += other.skipped;
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.recurring.extend(other.recurring.iter().cloned());
        self.errors.extend(other.errors.iter().cloned());
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} skipped",
            self.created, self.updated, self.deleted, self.skipped
        )?;
        if !self.recurring.is_empty() {
            write!(f, ", {} recurring (unsupported)", self.recurring.len())?;
        }
        if !self.errors.is_empty() {
            write!(f, ", {} errors", self.errors.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_notification() {
        let mut report = Report::default();
        report.tally(Destiny::Skip);
        assert!(!report.needs_notification());

        report.tally(Destiny::Delete);
        assert!(report.needs_notification());
        assert_eq!(report.count(Destiny::Delete), 1);
    }

    #[test]
    fn test_merge_and_display() {
        let mut total = Report::default();
        let mut one = Report::default();
        one.tally(Destiny::Create);
        one.tally(Destiny::Create);
        one.recurring.push(RecurringEvent {
            uid: "r".to_string(),
            summary: "#1 Weekly".to_string(),
            start: "2024-01-08 09:00 UTC".to_string(),
            rrule: "FREQ=WEEKLY".to_string(),
        });

        total.merge(&one);
        total.merge(&one);

        assert_eq!(total.created, 4);
        assert_eq!(
            total.to_string(),
            "4 created, 0 updated, 0 deleted, 0 skipped, 2 recurring (unsupported)"
        );
    }

    #[test]
    fn test_event_error_message() {
        let error = EventError {
            uid: "E1".to_string(),
            summary: "#42 Review".to_string(),
            start: "2024-01-10 09:00 UTC".to_string(),
            issue_id: "42".to_string(),
            destiny: Some(Destiny::Create),
            detail: "Record store error: 422".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Record store error: 422: entry for event '#42 Review' starting 2024-01-10 09:00 UTC referencing issue #42 couldn't be created"
        );
    }
}
