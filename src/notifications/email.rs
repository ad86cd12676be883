use super::{ChannelKind, NotificationChannel, NotificationContent, NotificationError};
use crate::config::NotificationConfig;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: String,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Delivers mail through an HTTP relay; without one configured the message is logged only.
pub struct EmailChannel {
    http: reqwest::Client,
    relay_url: Option<String>,
    from: String,
    enabled: bool,
    dry_run: bool,
}

impl EmailChannel {
    pub fn from_config(config: &NotificationConfig) -> Self {
        Self {
            http: super::http_client(),
            relay_url: config
                .email_relay_url
                .clone()
                .filter(|u| !u.trim().is_empty()),
            from: format!("{} <{}>", config.from_name, config.from_email),
            enabled: config.email_enabled,
            dry_run: config.dry_run,
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[instrument(skip(self, content), fields(subject = %content.subject))]
    async fn send(&self, to: &str, content: &NotificationContent) -> Result<(), NotificationError> {
        let relay = match (&self.relay_url, self.dry_run) {
            (Some(url), false) => url,
            _ => {
                info!(to, "email not relayed, logged only");
                return Ok(());
            }
        };

        let response = self
            .http
            .post(relay)
            .json(&RelayMessage {
                from: self.from.clone(),
                to,
                subject: &content.subject,
                text: &content.message,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::EmailRelay(format!("{}: {}", status, body)));
        }

        Ok(())
    }
}
