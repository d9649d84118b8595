//! Redmine backend for caltrack.
//!
//! Users carry their feed URL in a custom field; time entries carry the uid of
//! the event they were created from in another. An administrator key reads the
//! users, then each user's entries are handled through a [`RedmineSession`]
//! that impersonates them.

pub mod client;
pub mod session;
pub mod types;

pub use client::RedmineClient;
pub use session::RedmineSession;
