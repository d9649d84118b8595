//! Calendar feed retrieval.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::error::{CalTrackError, CalTrackResult};
use crate::event::{Event, MalformedEvent};
use crate::ics::parse_feed;

/// Events of one feed pull, keyed by UID.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    /// X-WR-CALNAME, when the feed names itself
    pub name: Option<String>,
    pub events: BTreeMap<String, Event>,
    pub malformed: Vec<MalformedEvent>,
}

impl Feed {
    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        Feed {
            name: None,
            events: events.into_iter().map(|e| (e.uid.clone(), e)).collect(),
            malformed: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Fetches ICS feeds over HTTP.
#[derive(Clone)]
pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new(timeout: Duration) -> CalTrackResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("caltrack/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(FeedClient { client })
    }

    pub async fn fetch(&self, feed_url: &str) -> CalTrackResult<Feed> {
        let url = normalize_url(feed_url);
        debug!(url = %url, "fetching calendar feed");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CalTrackError::Feed(format!("Failed to fetch {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CalTrackError::Feed(format!("{url} responded with {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CalTrackError::Feed(format!("Failed to read {url}: {e}")))?;

        let feed = parse_feed(&body)?;
        match &feed.name {
            Some(name) => debug!(calendar = %name, events = feed.len(), "fetched calendar"),
            None => debug!(events = feed.len(), "fetched calendar"),
        }

        Ok(feed)
    }
}

/// `webcal://` is plain HTTPS for our purposes.
fn normalize_url(url: &str) -> String {
    match url.strip_prefix("webcal://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}
