use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

/// Outbound message delivery. Best-effort: callers log failures and move on.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Dev fallback when no provider is configured: the message (OTP included)
/// lands in the server log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(to = %to, subject = %subject, body = %body, "email (log delivery)");
        Ok(())
    }
}

pub struct SendgridMailer {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
}

impl SendgridMailer {
    pub fn new(api_key: String, from_email: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from_email,
        }
    }
}

#[async_trait]
impl Mailer for SendgridMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from_email },
            "subject": subject,
            "content": [{ "type": "text/plain", "value": body }],
        });
        self.client
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .context("sendgrid request")?
            .error_for_status()
            .context("sendgrid response")?;
        Ok(())
    }
}

/// Fire-and-forget delivery; a failed send is logged, never surfaced.
pub fn deliver(mailer: Arc<dyn Mailer>, to: String, subject: String, body: String) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&to, &subject, &body).await {
            warn!(error = %e, to = %to, "email delivery failed");
        }
    });
}
