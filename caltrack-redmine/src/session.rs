//! Time entries of one Redmine user, accessed by impersonation.

use async_trait::async_trait;
use caltrack_core::{
    CalTrackError, CalTrackResult, Principal, RecordShape, RecordStore, TrackedRecord,
};
use reqwest::Method;
use tracing::{debug, warn};

use crate::client::{PAGE_SIZE, RedmineClient};
use crate::types::{
    CustomFieldInput, TimeEntry, TimeEntryEnvelope, TimeEntryInput, TimeEntryPage,
    TimeEntryRequest, custom_field,
};

/// Record store bound to a single principal.
///
/// Every request carries `X-Redmine-Switch-User`, so entries are created and
/// listed as that user and never leak into another principal's run.
#[derive(Debug, Clone)]
pub struct RedmineSession {
    client: RedmineClient,
    principal: Principal,
    entry_uid_field_id: u64,
}

impl RedmineSession {
    pub(crate) fn new(client: RedmineClient, principal: Principal, entry_uid_field_id: u64) -> Self {
        Self {
            client,
            principal,
            entry_uid_field_id,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    fn login(&self) -> Option<&str> {
        Some(self.principal.login.as_str())
    }

    fn body<'a>(&self, shape: &'a RecordShape) -> TimeEntryRequest<'a> {
        TimeEntryRequest {
            time_entry: TimeEntryInput {
                issue_id: &shape.issue_id,
                spent_on: shape.spent_on,
                hours: shape.hours,
                comments: &shape.comment,
                custom_fields: vec![CustomFieldInput {
                    id: self.entry_uid_field_id,
                    value: &shape.uid,
                }],
            },
        }
    }

    /// Entries without a uid were not created by caltrack and are ignored.
    fn to_record(&self, entry: TimeEntry) -> Option<TrackedRecord> {
        let uid = custom_field(&entry.custom_fields, self.entry_uid_field_id)?.to_string();
        let Some(issue) = entry.issue else {
            warn!(entry = entry.id, %uid, "tracked entry has no issue, ignoring");
            return None;
        };

        Some(TrackedRecord {
            id: entry.id,
            uid,
            spent_on: entry.spent_on,
            hours: entry.hours,
            comment: entry.comments.unwrap_or_default(),
            issue_id: issue.id.to_string(),
        })
    }
}

#[async_trait]
impl RecordStore for RedmineSession {
    async fn fetch_records(&self) -> CalTrackResult<Vec<TrackedRecord>> {
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let page: TimeEntryPage = self
                .client
                .get_json(
                    &format!(
                        "/time_entries.json?user_id={}&limit={PAGE_SIZE}&offset={offset}",
                        self.principal.id
                    ),
                    self.login(),
                )
                .await?;

            let fetched = page.time_entries.len();
            offset += fetched;
            records.extend(page.time_entries.into_iter().filter_map(|e| self.to_record(e)));

            if fetched == 0 || offset >= page.total_count {
                break;
            }
        }

        debug!(user = %self.principal.login, count = records.len(), "fetched tracked entries");
        Ok(records)
    }

    async fn create_record(&self, shape: &RecordShape) -> CalTrackResult<TrackedRecord> {
        let request = self
            .client
            .request(Method::POST, "/time_entries.json", self.login())
            .json(&self.body(shape));
        let resp = self.client.send(request).await?;

        let created: TimeEntryEnvelope = resp
            .json()
            .await
            .map_err(|e| CalTrackError::RecordStore(format!("Unexpected Redmine response: {e}")))?;

        Ok(TrackedRecord {
            id: created.time_entry.id,
            uid: shape.uid.clone(),
            spent_on: shape.spent_on,
            hours: shape.hours,
            comment: shape.comment.clone(),
            issue_id: shape.issue_id.clone(),
        })
    }

    async fn update_record(
        &self,
        existing: &TrackedRecord,
        shape: &RecordShape,
    ) -> CalTrackResult<TrackedRecord> {
        let request = self
            .client
            .request(
                Method::PUT,
                &format!("/time_entries/{}.json", existing.id),
                self.login(),
            )
            .json(&self.body(shape));
        self.client.send(request).await?;

        Ok(TrackedRecord {
            id: existing.id,
            uid: shape.uid.clone(),
            spent_on: shape.spent_on,
            hours: shape.hours,
            comment: shape.comment.clone(),
            issue_id: shape.issue_id.clone(),
        })
    }

    async fn delete_record(&self, existing: &TrackedRecord) -> CalTrackResult<()> {
        let request = self.client.request(
            Method::DELETE,
            &format!("/time_entries/{}.json", existing.id),
            self.login(),
        );
        self.client.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::SWITCH_USER_HEADER;

    fn session(server: &MockServer) -> RedmineSession {
        let client = RedmineClient::new(&server.uri(), "admin-key", Duration::from_secs(5)).unwrap();
        let principal = Principal {
            id: 12,
            login: "alice".to_string(),
            mail: None,
            feed_url: "https://cal/alice.ics".to_string(),
        };
        client.session(&principal, 3)
    }

    fn shape() -> RecordShape {
        RecordShape {
            uid: "E1".to_string(),
            spent_on: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            hours: 1.5,
            comment: "no comment".to_string(),
            issue_id: "42".to_string(),
        }
    }

    #[tokio::test]
    async fn test_fetch_records_keeps_only_tracked_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time_entries.json"))
            .and(query_param("user_id", "12"))
            .and(header(SWITCH_USER_HEADER, "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "time_entries": [
                    {
                        "id": 1, "issue": { "id": 42 }, "spent_on": "2024-01-10",
                        "hours": 1.5, "comments": "Review",
                        "custom_fields": [{ "id": 3, "name": "uid", "value": "E1" }]
                    },
                    {
                        "id": 2, "issue": { "id": 42 }, "spent_on": "2024-01-10",
                        "hours": 2.0, "comments": "typed by hand",
                        "custom_fields": [{ "id": 3, "name": "uid", "value": "" }]
                    },
                    {
                        "id": 3, "issue": { "id": 43 }, "spent_on": "2024-01-11",
                        "hours": 0.5, "comments": "",
                        "custom_fields": []
                    }
                ],
                "total_count": 3, "offset": 0, "limit": 100
            })))
            .mount(&server)
            .await;

        let records = session(&server).fetch_records().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].uid, "E1");
        assert_eq!(records[0].issue_id, "42");
        assert_eq!(records[0].comment, "Review");
    }

    #[tokio::test]
    async fn test_create_record_posts_uid_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/time_entries.json"))
            .and(header(SWITCH_USER_HEADER, "alice"))
            .and(body_partial_json(json!({
                "time_entry": {
                    "issue_id": "42",
                    "spent_on": "2024-01-10",
                    "hours": 1.5,
                    "custom_fields": [{ "id": 3, "value": "E1" }]
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "time_entry": {
                    "id": 99, "issue": { "id": 42 }, "spent_on": "2024-01-10",
                    "hours": 1.5, "comments": "no comment",
                    "custom_fields": [{ "id": 3, "value": "E1" }]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = session(&server).create_record(&shape()).await.unwrap();

        assert_eq!(record.id, 99);
        assert_eq!(record.uid, "E1");
    }

    #[tokio::test]
    async fn test_update_and_delete_target_entry_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/time_entries/7.json"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/time_entries/7.json"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let session = session(&server);
        let existing = TrackedRecord {
            id: 7,
            uid: "E1".to_string(),
            spent_on: NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
            hours: 1.0,
            comment: "old".to_string(),
            issue_id: "42".to_string(),
        };

        let updated = session.update_record(&existing, &shape()).await.unwrap();
        assert_eq!(updated.id, 7);
        assert_eq!(updated.hours, 1.5);

        session.delete_record(&existing).await.unwrap();
    }

    #[tokio::test]
    async fn test_validation_failure_carries_redmine_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/time_entries.json"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({ "errors": ["Issue is invalid"] })),
            )
            .mount(&server)
            .await;

        let result = session(&server).create_record(&shape()).await;

        match result {
            Err(CalTrackError::RecordStore(msg)) => assert!(msg.contains("Issue is invalid")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
