//! Outbound email. The recovery flow treats dispatch as fire-and-forget but
//! a failed dispatch fails the request.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::config::MailRelayConfig;
use crate::errors::{DomainError, InfraErrorKind};
use crate::logging::pii::Redacted;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), DomainError>;
}

const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Posts JSON to an HTTP mail relay.
pub struct HttpRelayMailer {
    client: reqwest::Client,
    config: MailRelayConfig,
}

impl HttpRelayMailer {
    pub fn new(config: MailRelayConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(RELAY_TIMEOUT)
            .build()
            .map_err(|e| DomainError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), DomainError> {
        let payload = RelayPayload {
            from: &self.config.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html_body,
        };
        let mut request = self.client.post(&self.config.url).json(&payload);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| DomainError::unavailable(InfraErrorKind::MailDispatch, e.to_string()))?;
        info!(to = %Redacted(&email.to), subject = %email.subject, "email dispatched");
        Ok(())
    }
}

/// Logs instead of sending. Used when no relay is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), DomainError> {
        info!(
            to = %Redacted(&email.to),
            subject = %email.subject,
            "email relay not configured; message logged only"
        );
        Ok(())
    }
}
