//! Summaries sent to a principal after their run.

use async_trait::async_trait;
use tracing::info;

use crate::error::CalTrackResult;
use crate::record::Principal;
use crate::report::Report;

/// Best-effort delivery of a run summary.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, principal: &Principal, summary: &Summary) -> CalTrackResult<()>;
}

/// A rendered report, in plain text and HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Summary {
    /// Render `report` for a store reachable at `origin`.
    pub fn render(report: &Report, origin: &str, subject: &str) -> Self {
        let mut text = Vec::new();
        let mut html = Vec::new();

        text.push(format!("A message from the caltrack robot at {origin}"));
        html.push(format!(
            "<p>A message from the caltrack robot at <a href='{0}'>{0}</a></p>",
            escape_html(origin)
        ));

        for (label, count) in [
            ("created", report.created),
            ("updated", report.updated),
            ("deleted", report.deleted),
        ] {
            if count > 0 {
                text.push(format!("Entries {label}: {count}"));
                html.push(format!("<p>Entries {label}: {count}</p>"));
            }
        }

        if !report.recurring.is_empty() {
            text.push(format!("Recurring events found: {}.", report.recurring.len()));
            html.push(format!("<p>Recurring events found: {}.</p>", report.recurring.len()));
            html.push("<ul>".to_string());
            for event in &report.recurring {
                let line = format!("'{}' starting {}", event.summary, event.start);
                html.push(format!("<li>{}</li>", escape_html(&line)));
                text.push(format!("- {line}"));
            }
            html.push("</ul>".to_string());
            text.push("Recurring events are not supported!".to_string());
            html.push("<p><b>Recurring events are not supported!</b></p>".to_string());
        }

        if !report.errors.is_empty() {
            text.push(format!("{} errors occurred:", report.errors.len()));
            html.push(format!("<p>{} errors occurred:</p>", report.errors.len()));
            html.push("<ul>".to_string());
            for error in &report.errors {
                text.push(format!("- {error}"));
                html.push(format!("<li>{}</li>", escape_html(&error.to_string())));
            }
            html.push("</ul>".to_string());
        }

        Summary {
            subject: subject.to_string(),
            text: text.join("\n"),
            html: format!("<html><body>\n{}\n</body></html>", html.join("\n")),
        }
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&#39;")
        .replace('"', "&quot;")
}

/// Writes summaries to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, principal: &Principal, summary: &Summary) -> CalTrackResult<()> {
        info!(
            user = %principal.login,
            mail = principal.mail.as_deref().unwrap_or("-"),
            subject = %summary.subject,
            "summary:\n{}",
            summary.text
        );
        Ok(())
    }
}
