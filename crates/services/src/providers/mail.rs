use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    transport::smtp::authentication::Credentials,
};
use shiftdesk_config::MailSettings;
use tracing::{info, instrument};

use super::with_deadline;
use crate::error::ProviderError;

const PROVIDER: &str = "mail";

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ProviderError>;
}

/// Pooled STARTTLS SMTP relay.
pub struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
    timeout_secs: u64,
}

impl SmtpMailer {
    /// Builds the transport. With no SMTP host configured every send fails
    /// with `NotConfigured`.
    pub fn new(settings: &MailSettings) -> Result<Self, ProviderError> {
        let transport = if settings.host.is_empty() {
            None
        } else {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
                .map_err(|e| ProviderError::Unavailable(PROVIDER, e.to_string()))?
                .port(settings.port);
            if !settings.username.is_empty() {
                builder = builder.credentials(Credentials::new(
                    settings.username.clone(),
                    settings.password.clone(),
                ));
            }
            info!(host = %settings.host, port = settings.port, "Created SMTP transport");
            Some(builder.build())
        };

        Ok(Self {
            transport,
            from: settings.from.clone(),
            timeout_secs: settings.timeout_secs,
        })
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> Result<Message, ProviderError> {
        let from = self
            .from
            .parse()
            .map_err(|e| ProviderError::Rejected(PROVIDER, format!("From: {e}")))?;
        let to = to
            .parse()
            .map_err(|e| ProviderError::Rejected(PROVIDER, format!("To '{to}': {e}")))?;
        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| ProviderError::Rejected(PROVIDER, e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    #[instrument(skip(self, body))]
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ProviderError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or(ProviderError::NotConfigured(PROVIDER))?;
        let message = self.build_message(to, subject, body)?;

        with_deadline(PROVIDER, self.timeout_secs, async {
            transport
                .send(message)
                .await
                .map_err(|e| ProviderError::Unavailable(PROVIDER, e.to_string()))
        })
        .await?;

        info!("Email sent");
        Ok(())
    }
}
