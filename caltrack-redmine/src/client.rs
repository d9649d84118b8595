//! HTTP client for the Redmine REST API.

use std::time::Duration;

use caltrack_core::{CalTrackError, CalTrackResult, Principal};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::session::RedmineSession;
use crate::types::{ErrorBody, UserPage, custom_field};

pub const API_KEY_HEADER: &str = "X-Redmine-API-Key";
pub const SWITCH_USER_HEADER: &str = "X-Redmine-Switch-User";

/// Largest page Redmine hands out.
pub const PAGE_SIZE: usize = 100;

/// Administrator connection to a Redmine instance.
#[derive(Debug, Clone)]
pub struct RedmineClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RedmineClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> CalTrackResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("caltrack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A record store acting as `principal`.
    pub fn session(&self, principal: &Principal, entry_uid_field_id: u64) -> RedmineSession {
        RedmineSession::new(self.clone(), principal.clone(), entry_uid_field_id)
    }

    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        switch_user: Option<&str>,
    ) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header(API_KEY_HEADER, &self.api_key);

        match switch_user {
            Some(login) => builder.header(SWITCH_USER_HEADER, login),
            None => builder,
        }
    }

    /// Send a request, turning non-success statuses into errors.
    pub(crate) async fn send(&self, request: RequestBuilder) -> CalTrackResult<Response> {
        let resp = request.send().await?;
        let status = resp.status();
        debug!(url = %resp.url(), %status, "redmine response");

        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CalTrackError::Unauthorized(
                format!("Redmine refused the request ({status})"),
            )),
            StatusCode::UNPROCESSABLE_ENTITY => {
                let detail = serde_json::from_str::<ErrorBody>(&body)
                    .map(|b| b.errors.join(", "))
                    .unwrap_or(body);
                Err(CalTrackError::RecordStore(format!("Redmine rejected the entry: {detail}")))
            }
            _ => Err(CalTrackError::RecordStore(format!(
                "Redmine returned {status}: {}",
                body.trim()
            ))),
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        switch_user: Option<&str>,
    ) -> CalTrackResult<T> {
        let resp = self.send(self.request(Method::GET, path, switch_user)).await?;
        resp.json()
            .await
            .map_err(|e| CalTrackError::RecordStore(format!("Unexpected Redmine response: {e}")))
    }

    /// Active users with a non-empty feed URL in `feed_field_id`.
    pub async fn fetch_principals(&self, feed_field_id: u64) -> CalTrackResult<Vec<Principal>> {
        let mut principals = Vec::new();
        let mut offset = 0;

        loop {
            let page: UserPage = self
                .get_json(
                    &format!("/users.json?status=1&limit={PAGE_SIZE}&offset={offset}"),
                    None,
                )
                .await?;

            let fetched = page.users.len();
            offset += fetched;

            for user in page.users {
                let Some(feed_url) = custom_field(&user.custom_fields, feed_field_id) else {
                    continue;
                };
                principals.push(Principal {
                    id: user.id,
                    login: user.login,
                    mail: user.mail,
                    feed_url: feed_url.to_string(),
                });
            }

            if fetched == 0 || offset >= page.total_count {
                break;
            }
        }

        debug!(count = principals.len(), "fetched principals");
        Ok(principals)
    }
}
