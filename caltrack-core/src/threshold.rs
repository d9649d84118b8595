//! Time-window policy deciding whether a timestamp is too old for an operation.
//!
//! Two independent sets of thresholds exist: one gates event timestamps (the
//! feed side), the other gates record dates (the store side). Both use the
//! same representation and the same evaluation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{CalTrackError, CalTrackResult};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Operation a threshold gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// Cutoff policy for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    /// Never too old
    Always,
    /// Always too old
    Never,
    /// Too old when strictly before this instant
    Since(DateTime<Utc>),
    /// Too old when strictly before `now - n days`, evaluated per call
    DaysAgo(u32),
}

impl Threshold {
    pub fn too_old(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Threshold::Always => false,
            Threshold::Never => true,
            Threshold::Since(cutoff) => timestamp < *cutoff,
            Threshold::DaysAgo(days) => match days_before(now, *days) {
                Some(cutoff) => timestamp < cutoff,
                None => false,
            },
        }
    }

    /// Dates compare as midnight UTC of that day.
    pub fn date_too_old(&self, date: NaiveDate, now: DateTime<Utc>) -> bool {
        self.too_old(date.and_time(chrono::NaiveTime::MIN).and_utc(), now)
    }
}

impl FromStr for Threshold {
    type Err = CalTrackError;

    /// Accepts `always`, `never`, `YYYY-MM-DD`, an RFC 3339 datetime,
    /// `N days`, or a whole-day humantime duration such as `2weeks`.
    fn from_str(s: &str) -> CalTrackResult<Self> {
        let value = s.trim();
        let lower = value.to_ascii_lowercase();

        match lower.as_str() {
            "always" => return Ok(Threshold::Always),
            "never" => return Ok(Threshold::Never),
            _ => {}
        }

        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Ok(Threshold::Since(
                date.and_time(chrono::NaiveTime::MIN).and_utc(),
            ));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(Threshold::Since(dt.with_timezone(&Utc)));
        }

        if let Some(days) = parse_days(&lower) {
            return days_ago(value, days);
        }

        let duration = humantime::parse_duration(value).map_err(|_| {
            CalTrackError::Config(format!(
                "Invalid threshold '{value}'. Expected \"always\", \"never\", a date (YYYY-MM-DD) or \"N days\""
            ))
        })?;

        let secs = duration.as_secs();
        if secs % SECONDS_PER_DAY != 0 || duration.subsec_nanos() != 0 {
            return Err(CalTrackError::Config(format!(
                "Threshold '{value}' is not a whole number of days"
            )));
        }

        let days = u32::try_from(secs / SECONDS_PER_DAY)
            .map_err(|_| CalTrackError::Config(format!("Threshold '{value}' is out of range")))?;
        days_ago(value, days)
    }
}

/// `now - days`, or `None` when that falls before the earliest representable instant.
fn days_before(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    Duration::try_days(i64::from(days)).and_then(|span| now.checked_sub_signed(span))
}

/// A day count must yield a representable cutoff for any current date.
fn days_ago(value: &str, days: u32) -> CalTrackResult<Threshold> {
    if days_before(Utc::now(), days).is_none() {
        return Err(CalTrackError::Config(format!(
            "Threshold '{value}' reaches past the earliest supported date"
        )));
    }
    Ok(Threshold::DaysAgo(days))
}

/// Parse `N day` / `N days` / `Nd`.
fn parse_days(s: &str) -> Option<u32> {
    let number = s
        .strip_suffix("days")
        .or_else(|| s.strip_suffix("day"))
        .or_else(|| s.strip_suffix('d'))?;
    number.trim().parse().ok()
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Always => write!(f, "always"),
            Threshold::Never => write!(f, "never"),
            Threshold::Since(cutoff) => write!(f, "{}", cutoff.to_rfc3339()),
            Threshold::DaysAgo(days) => write!(f, "{days} days"),
        }
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn default_threshold() -> Threshold {
    Threshold::DaysAgo(30)
}

/// One threshold per operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OperationThresholds {
    #[serde(default = "default_threshold")]
    pub create: Threshold,
    #[serde(default = "default_threshold")]
    pub update: Threshold,
    #[serde(default = "default_threshold")]
    pub delete: Threshold,
}

impl Default for OperationThresholds {
    fn default() -> Self {
        OperationThresholds {
            create: default_threshold(),
            update: default_threshold(),
            delete: default_threshold(),
        }
    }
}

impl OperationThresholds {
    pub fn uniform(threshold: Threshold) -> Self {
        OperationThresholds {
            create: threshold,
            update: threshold,
            delete: threshold,
        }
    }

    pub fn get(&self, operation: Operation) -> Threshold {
        match operation {
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }

    pub fn too_old(&self, operation: Operation, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.get(operation).too_old(timestamp, now)
    }

    pub fn date_too_old(&self, operation: Operation, date: NaiveDate, now: DateTime<Utc>) -> bool {
        self.get(operation).date_too_old(date, now)
    }
}

/// Both sides of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ThresholdPolicy {
    /// Gates event start times from the feed
    #[serde(default)]
    pub events: OperationThresholds,
    /// Gates `spent_on` dates of existing records
    #[serde(default)]
    pub records: OperationThresholds,
}

impl ThresholdPolicy {
    pub fn permissive() -> Self {
        ThresholdPolicy {
            events: OperationThresholds::uniform(Threshold::Always),
            records: OperationThresholds::uniform(Threshold::Always),
        }
    }
}
