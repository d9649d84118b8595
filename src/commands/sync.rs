use anyhow::{Context, Result};
use caltrack_core::config::Settings;
use caltrack_core::mail::SmtpNotifier;
use caltrack_core::notify::{LogNotifier, Notifier, Summary};
use caltrack_core::{
    BatchProcessor, CalTrackResult, DestinyResolver, FeedClient, Principal, RecordStore, Report,
};
use caltrack_redmine::RedmineClient;
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use tracing::{error, info, warn};

use super::redmine_client;

pub struct SyncOptions {
    pub dry_run: bool,
    pub user: Option<String>,
}

/// Outcome of a run across all principals.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub synced: Vec<(String, Report)>,
    /// Principals skipped entirely, with the reason
    pub skipped: Vec<(String, String)>,
}

impl RunSummary {
    pub fn totals(&self) -> Report {
        let mut totals = Report::default();
        for (_, report) in &self.synced {
            totals.merge(report);
        }
        totals
    }
}

pub async fn run(settings: &Settings, options: &SyncOptions) -> Result<()> {
    let client = redmine_client(settings)?;
    let feeds = FeedClient::new(settings.request_timeout())?;

    if options.dry_run {
        println!("{}", "Dry run: nothing will be written to Redmine.".yellow());
    }

    let notifier = notifier(settings)?;

    let summary = sync_all(settings, &client, &feeds, notifier.as_ref(), options, Utc::now()).await?;

    for (login, report) in &summary.synced {
        println!("{}", login.bold());
        println!("   {report}");
        for event_error in &report.errors {
            println!("   {}", event_error.to_string().red());
        }
    }

    for (login, reason) in &summary.skipped {
        println!("{}", login.bold());
        println!("   {}", reason.red());
    }

    let totals = summary.totals();
    println!(
        "\nTotal: {} created, {} updated, {} deleted across {} users",
        totals.created,
        totals.updated,
        totals.deleted,
        summary.synced.len()
    );
    if !summary.skipped.is_empty() {
        println!("{}", format!("{} users skipped", summary.skipped.len()).red());
    }

    Ok(())
}

/// Email when a `[mail]` section is configured, the log otherwise.
pub fn notifier(settings: &Settings) -> Result<Box<dyn Notifier>> {
    let notifier: Box<dyn Notifier> = match &settings.mail {
        Some(mail) => {
            Box::new(SmtpNotifier::new(mail).context("Could not set up summary emails")?)
        }
        None => Box::new(LogNotifier),
    };
    Ok(notifier)
}

/// Reconcile every principal in turn.
///
/// Configuration and authorization failures abort the whole run. Anything
/// else that stops a principal is recorded and the run moves on.
pub async fn sync_all(
    settings: &Settings,
    client: &RedmineClient,
    feeds: &FeedClient,
    notifier: &dyn Notifier,
    options: &SyncOptions,
    now: DateTime<Utc>,
) -> Result<RunSummary> {
    let mut principals = client
        .fetch_principals(settings.user_feed_field_id)
        .await
        .context("Could not list Redmine users")?;

    if let Some(login) = &options.user {
        principals.retain(|p| &p.login == login);
        if principals.is_empty() {
            anyhow::bail!("No user '{login}' with a calendar feed");
        }
    }

    let processor = BatchProcessor::new(
        settings.pattern.clone(),
        DestinyResolver::new(settings.thresholds),
    )
    .dry_run(options.dry_run);

    let mut summary = RunSummary::default();

    for principal in &principals {
        match sync_principal(settings, client, feeds, &processor, principal, now).await {
            Ok(report) => {
                info!(user = %principal.login, %report, "user synchronized");

                if settings.notify && !options.dry_run && report.needs_notification() {
                    let message =
                        Summary::render(&report, client.base_url(), &settings.notify_subject);
                    if let Err(e) = notifier.notify(principal, &message).await {
                        warn!(user = %principal.login, error = %e, "could not notify user");
                    }
                }

                summary.synced.push((principal.login.clone(), report));
            }
            Err(e) if e.is_fatal() => {
                return Err(e).with_context(|| format!("Aborting at user {}", principal.login));
            }
            Err(e) => {
                error!(user = %principal.login, error = %e, "skipping user");
                summary.skipped.push((principal.login.clone(), e.to_string()));
            }
        }
    }

    Ok(summary)
}

async fn sync_principal(
    settings: &Settings,
    client: &RedmineClient,
    feeds: &FeedClient,
    processor: &BatchProcessor,
    principal: &Principal,
    now: DateTime<Utc>,
) -> CalTrackResult<Report> {
    let feed = feeds.fetch(&principal.feed_url).await?;
    let session = client.session(principal, settings.entry_uid_field_id);
    let records = session.fetch_records().await?;
    processor.run(principal, &feed, records, &session, now).await
}
