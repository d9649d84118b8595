//! Summary pattern tagging events with an issue reference.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::{CalTrackError, CalTrackResult};

/// Name of the capture group holding the issue reference.
pub const ISSUE_GROUP: &str = "issue_id";

/// A compiled summary pattern with a mandatory `issue_id` capture group.
#[derive(Clone)]
pub struct SummaryPattern(Regex);

impl SummaryPattern {
    pub fn new(pattern: &str) -> CalTrackResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| CalTrackError::Pattern(e.to_string()))?;

        if !regex.capture_names().flatten().any(|name| name == ISSUE_GROUP) {
            return Err(CalTrackError::Pattern(format!(
                "'{pattern}' has no named capture group (?P<{ISSUE_GROUP}>...)"
            )));
        }

        Ok(SummaryPattern(regex))
    }

    /// Issue reference of a matching summary.
    ///
    /// Matching is anchored at the start of the summary.
    pub fn issue_id(&self, summary: &str) -> Option<String> {
        let captures = self.0.captures(summary)?;
        let whole = captures.get(0)?;
        if whole.start() != 0 {
            return None;
        }
        captures
            .name(ISSUE_GROUP)
            .map(|m| m.as_str().to_string())
            .filter(|id| !id.is_empty())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for SummaryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SummaryPattern").field(&self.0.as_str()).finish()
    }
}

impl<'de> Deserialize<'de> for SummaryPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SummaryPattern::new(&raw).map_err(serde::de::Error::custom)
    }
}
