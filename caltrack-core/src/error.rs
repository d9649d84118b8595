//! Error types for caltrack.

use thiserror::Error;

/// Errors that can occur while reconciling a feed against the record store.
#[derive(Error, Debug)]
pub enum CalTrackError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid summary pattern: {0}")]
    Pattern(String),

    #[error(
        "Records {first} and {second} both reference event uid '{uid}', fix this manually in the record store"
    )]
    DuplicateUid {
        uid: String,
        first: u64,
        second: u64,
    },

    #[error("Not authorized by the record store: {0}")]
    Unauthorized(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Record store error: {0}")]
    RecordStore(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notification error: {0}")]
    Notify(String),
}

impl CalTrackError {
    /// Errors that make it unsafe to continue with any further principal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CalTrackError::Config(_) | CalTrackError::Pattern(_) | CalTrackError::Unauthorized(_)
        )
    }
}

/// Result type alias for caltrack operations.
pub type CalTrackResult<T> = Result<T, CalTrackError>;
