//! Core of caltrack: decides the destiny of time records behind calendar events.
//!
//! - `threshold`: time-window policy ("too old" per operation)
//! - `change`: projection of events into record shape and change detection
//! - `destiny`: the pure per-event decision
//! - `batch`: per-principal reconciliation loop and report aggregation
//!
//! Feed retrieval, the record store seam and notifications live alongside.

pub mod batch;
pub mod change;
pub mod config;
pub mod destiny;
pub mod error;
pub mod event;
pub mod feed;
pub mod ics;
pub mod mail;
pub mod notify;
pub mod pattern;
pub mod record;
pub mod report;
pub mod store;
pub mod threshold;

pub use batch::BatchProcessor;
pub use destiny::{Destiny, DestinyResolver};
pub use error::{CalTrackError, CalTrackResult};
pub use event::{Event, EventTime, MalformedEvent};
pub use feed::{Feed, FeedClient};
pub use record::{Principal, RecordShape, TrackedRecord};
pub use report::{EventError, RecurringEvent, Report};
pub use store::RecordStore;
pub use threshold::{Operation, OperationThresholds, Threshold, ThresholdPolicy};
