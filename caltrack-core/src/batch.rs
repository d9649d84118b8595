//! Batch reconciliation of one principal's feed against their records.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::change;
use crate::destiny::{Destiny, DestinyResolver};
use crate::error::{CalTrackError, CalTrackResult};
use crate::event::Event;
use crate::feed::Feed;
use crate::pattern::SummaryPattern;
use crate::record::{Principal, TrackedRecord};
use crate::report::{EventError, RecurringEvent, Report};
use crate::store::RecordStore;

/// Drives the resolver over an entire feed for one principal.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    pattern: SummaryPattern,
    resolver: DestinyResolver,
    dry_run: bool,
}

impl BatchProcessor {
    pub fn new(pattern: SummaryPattern, resolver: DestinyResolver) -> Self {
        BatchProcessor {
            pattern,
            resolver,
            dry_run: false,
        }
    }

    /// Resolve and tally destinies without writing to the store.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reconcile `feed` against `records` through `store`.
    ///
    /// A duplicate uid among `records` aborts before any write. An
    /// authorization failure aborts mid-batch. Every other failing action is
    /// recorded in the report and the batch moves on.
    pub async fn run<S: RecordStore + ?Sized>(
        &self,
        principal: &Principal,
        feed: &Feed,
        records: Vec<TrackedRecord>,
        store: &S,
        now: DateTime<Utc>,
    ) -> CalTrackResult<Report> {
        let mut report = Report::default();

        let index = index_records(records)?;

        // Uids of tagged events still in the feed, whether or not they can be
        // resolved. A record whose event lost its tag counts as removed.
        let mut present: BTreeSet<&str> = BTreeSet::new();

        let mut matching = Vec::new();
        for (uid, event) in &feed.events {
            let Some(issue_id) = self.pattern.issue_id(&event.summary) else {
                continue;
            };
            debug!(uid = %uid, issue = %issue_id, summary = %event.summary, "event matches pattern");
            present.insert(uid.as_str());

            if let Some(rrule) = &event.recurrence {
                warn!(uid = %uid, "recurring events are not supported, skipping");
                report.recurring.push(RecurringEvent {
                    uid: uid.clone(),
                    summary: event.summary.clone(),
                    start: event.start.to_string(),
                    rrule: rrule.clone(),
                });
                continue;
            }

            matching.push((event, issue_id));
        }

        for malformed in &feed.malformed {
            let Some(issue_id) = self.pattern.issue_id(&malformed.summary) else {
                continue;
            };
            error!(uid = %malformed.uid, missing = %malformed.missing, "skipping malformed event");
            present.insert(malformed.uid.as_str());
            report.errors.push(EventError {
                uid: malformed.uid.clone(),
                summary: malformed.summary.clone(),
                start: String::new(),
                issue_id,
                destiny: None,
                detail: format!("Event has no {}", malformed.missing),
            });
        }

        info!(
            user = %principal.login,
            matching = matching.len(),
            recurring = report.recurring.len(),
            records = index.len(),
            "reconciling events"
        );

        for (event, issue_id) in &matching {
            let existing = index.get(&event.uid);
            let destiny = self.resolver.resolve(event, existing, issue_id, now);
            debug!(uid = %event.uid, %destiny, "resolved event");

            match self.execute(store, destiny, event, issue_id, existing).await {
                Ok(()) => report.tally(destiny),
                Err(e @ CalTrackError::Unauthorized(_)) => return Err(e),
                Err(e) => {
                    error!(uid = %event.uid, %destiny, error = %e, "action failed");
                    report.errors.push(EventError {
                        uid: event.uid.clone(),
                        summary: event.summary.clone(),
                        start: event.start.to_string(),
                        issue_id: issue_id.clone(),
                        destiny: Some(destiny),
                        detail: e.to_string(),
                    });
                }
            }
        }

        let mut orphans: Vec<&TrackedRecord> = index
            .values()
            .filter(|record| !present.contains(record.uid.as_str()))
            .collect();
        orphans.sort_by(|a, b| a.uid.cmp(&b.uid));

        for record in orphans {
            let destiny = self.resolver.resolve_missing(record, now);
            debug!(uid = %record.uid, record = record.id, %destiny, "resolved record of removed event");

            let result = match destiny {
                Destiny::Delete if !self.dry_run => store.delete_record(record).await,
                _ => Ok(()),
            };

            match result {
                Ok(()) => report.tally(destiny),
                Err(e @ CalTrackError::Unauthorized(_)) => return Err(e),
                Err(e) => {
                    error!(uid = %record.uid, record = record.id, error = %e, "delete failed");
                    report.errors.push(EventError {
                        uid: record.uid.clone(),
                        summary: format!("(removed event, record {})", record.id),
                        start: record.spent_on.to_string(),
                        issue_id: record.issue_id.clone(),
                        destiny: Some(destiny),
                        detail: e.to_string(),
                    });
                }
            }
        }

        info!(user = %principal.login, dry_run = self.dry_run, "{}", report);

        Ok(report)
    }

    async fn execute<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        destiny: Destiny,
        event: &Event,
        issue_id: &str,
        existing: Option<&TrackedRecord>,
    ) -> CalTrackResult<()> {
        if self.dry_run {
            return Ok(());
        }

        match (destiny, existing) {
            (Destiny::Skip, _) => Ok(()),
            (Destiny::Create, _) => {
                let shape = projection(event, issue_id)?;
                let created = store.create_record(&shape).await?;
                debug!(uid = %event.uid, record = created.id, "created record");
                Ok(())
            }
            (Destiny::Update, Some(record)) => {
                let shape = projection(event, issue_id)?;
                store.update_record(record, &shape).await?;
                debug!(uid = %event.uid, record = record.id, "updated record");
                Ok(())
            }
            (Destiny::Delete, Some(record)) => {
                store.delete_record(record).await?;
                debug!(uid = %event.uid, record = record.id, "deleted record");
                Ok(())
            }
            (destiny, None) => Err(CalTrackError::RecordStore(format!(
                "cannot apply {destiny:?} to a record that does not exist"
            ))),
        }
    }
}

fn projection(event: &Event, issue_id: &str) -> CalTrackResult<crate::record::RecordShape> {
    change::project(event, issue_id).ok_or_else(|| {
        CalTrackError::RecordStore(format!("event {} has no time of day", event.uid))
    })
}

/// Build the uid → record map, refusing duplicate back-references.
pub fn index_records(records: Vec<TrackedRecord>) -> CalTrackResult<HashMap<String, TrackedRecord>> {
    let mut index: HashMap<String, TrackedRecord> = HashMap::with_capacity(records.len());

    for record in records {
        if let Some(other) = index.get(&record.uid) {
            return Err(CalTrackError::DuplicateUid {
                uid: record.uid.clone(),
                first: other.id,
                second: record.id,
            });
        }
        index.insert(record.uid.clone(), record);
    }

    Ok(index)
}
