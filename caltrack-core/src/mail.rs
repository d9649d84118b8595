//! Summary delivery by email.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{CalTrackError, CalTrackResult};
use crate::notify::{Notifier, Summary};
use crate::record::Principal;

/// `[mail]` section of the settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct MailSettings {
    /// Sender, e.g. `caltrack <robot@example.com>`
    pub from: String,
    pub smtp_host: String,
    /// Defaults to 465 (implicit TLS)
    #[serde(default)]
    pub smtp_port: Option<u16>,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
}

/// Sends each summary as a plain-text and HTML email over SMTPS.
pub struct SmtpNotifier {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    pub fn new(settings: &MailSettings) -> CalTrackResult<Self> {
        let from = settings.from.parse::<Mailbox>().map_err(|e| {
            CalTrackError::Config(format!("Invalid mail.from '{}': {e}", settings.from))
        })?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .map_err(|e| {
                CalTrackError::Config(format!("Invalid mail.smtp_host '{}': {e}", settings.smtp_host))
            })?;

        if let Some(port) = settings.smtp_port {
            builder = builder.port(port);
        }

        if let (Some(user), Some(password)) = (&settings.smtp_user, &settings.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(SmtpNotifier {
            from,
            transport: builder.build(),
        })
    }

    /// The email for `principal`, or `None` when they have no address.
    pub fn message(&self, principal: &Principal, summary: &Summary) -> CalTrackResult<Option<Message>> {
        let Some(address) = principal.mail.as_deref().filter(|m| !m.trim().is_empty()) else {
            return Ok(None);
        };

        let to = address.parse::<Mailbox>().map_err(|e| {
            CalTrackError::Notify(format!("Invalid address '{address}' for {}: {e}", principal.login))
        })?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(summary.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                summary.text.clone(),
                summary.html.clone(),
            ))
            .map(Some)
            .map_err(|e| CalTrackError::Notify(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, principal: &Principal, summary: &Summary) -> CalTrackResult<()> {
        let Some(message) = self.message(principal, summary)? else {
            warn!(user = %principal.login, "user has no email address, summary not sent");
            return Ok(());
        };

        self.transport
            .send(message)
            .await
            .map_err(|e| CalTrackError::Notify(format!("SMTP delivery failed: {e}")))?;

        info!(user = %principal.login, "summary sent");
        Ok(())
    }
}
