//! Redmine REST API JSON shapes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CustomFieldValue {
    pub id: u64,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl CustomFieldValue {
    /// The value as a non-empty string, if it is one.
    pub fn as_text(&self) -> Option<&str> {
        self.value.as_str().map(str::trim).filter(|v| !v.is_empty())
    }
}

pub fn custom_field<'a>(fields: &'a [CustomFieldValue], id: u64) -> Option<&'a str> {
    fields.iter().find(|f| f.id == id).and_then(|f| f.as_text())
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldValue>,
}

#[derive(Debug, Deserialize)]
pub struct UserPage {
    pub users: Vec<User>,
    #[serde(default)]
    pub total_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeEntry {
    pub id: u64,
    #[serde(default)]
    pub issue: Option<IdRef>,
    pub spent_on: NaiveDate,
    pub hours: f64,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldValue>,
}

#[derive(Debug, Deserialize)]
pub struct TimeEntryPage {
    pub time_entries: Vec<TimeEntry>,
    #[serde(default)]
    pub total_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct TimeEntryEnvelope {
    pub time_entry: TimeEntry,
}

#[derive(Debug, Serialize)]
pub struct CustomFieldInput<'a> {
    pub id: u64,
    pub value: &'a str,
}

#[derive(Debug, Serialize)]
pub struct TimeEntryInput<'a> {
    pub issue_id: &'a str,
    pub spent_on: NaiveDate,
    pub hours: f64,
    pub comments: &'a str,
    pub custom_fields: Vec<CustomFieldInput<'a>>,
}

#[derive(Debug, Serialize)]
pub struct TimeEntryRequest<'a> {
    pub time_entry: TimeEntryInput<'a>,
}

/// Body of a 422 response.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errors: Vec<String>,
}
