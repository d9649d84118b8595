//! Tracked records as held by the record store, and the principals owning them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A time record created from a calendar event.
///
/// The `uid` back-reference is what makes re-runs idempotent: it is the only
/// link between a record and the event it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedRecord {
    pub id: u64,
    pub uid: String,
    pub spent_on: NaiveDate,
    pub hours: f64,
    pub comment: String,
    pub issue_id: String,
}

/// The fields a record would carry if it were written from an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordShape {
    pub uid: String,
    pub spent_on: NaiveDate,
    pub hours: f64,
    pub comment: String,
    pub issue_id: String,
}

/// The user whose feed and records are reconciled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: u64,
    pub login: String,
    pub mail: Option<String>,
    pub feed_url: String,
}
