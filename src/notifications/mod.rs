//! Outbound customer notification channels.
//!
//! Each channel implements [`NotificationChannel`]; the dispatcher in
//! `services::notifications` decides which channels to call for a recipient.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use utoipa::ToSchema;

pub mod email;
pub mod line;
pub mod sms;
pub mod templates;

pub use email::EmailChannel;
pub use line::{verify_line_signature, LineChannel, LineClient};
pub use sms::SmsChannel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Line,
    Email,
    Sms,
}

/// Rendered message, shared by every channel of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NotificationContent {
    pub subject: String,
    pub message: String,
}

impl NotificationContent {
    /// Body used by channels without a subject line.
    pub fn as_text(&self) -> String {
        format!("{}\n\n{}", self.subject, self.message)
    }
}

/// Addresses a customer can be reached at. Absent fields skip the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipient {
    pub name: Option<String>,
    pub line_user_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Recipient {
    pub fn address(&self, kind: ChannelKind) -> Option<&str> {
        let field = match kind {
            ChannelKind::Line => &self.line_user_id,
            ChannelKind::Email => &self.email,
            ChannelKind::Sms => &self.phone,
        };
        field.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Outcome of one channel attempt, persisted in the notification log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChannelResult {
    pub channel: ChannelKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChannelResult {
    pub fn ok(channel: ChannelKind) -> Self {
        Self {
            channel,
            success: true,
            error: None,
        }
    }

    pub fn failed(channel: ChannelKind, error: impl ToString) -> Self {
        Self {
            channel,
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("LINE Access Token が設定されていません")]
    MissingLineToken,
    #[error("LINE API Error: {0}")]
    LineApi(String),
    #[error("Email relay error: {0}")]
    EmailRelay(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    fn is_enabled(&self) -> bool;

    async fn send(&self, to: &str, content: &NotificationContent) -> Result<(), NotificationError>;
}

/// Shared HTTP client for outbound notification calls.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default HTTP client");
            reqwest::Client::new()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_addresses_count_as_absent() {
        let recipient = Recipient {
            name: None,
            line_user_id: Some("  ".into()),
            email: Some("hanako@example.com".into()),
            phone: None,
        };
        assert_eq!(recipient.address(ChannelKind::Line), None);
        assert_eq!(
            recipient.address(ChannelKind::Email),
            Some("hanako@example.com")
        );
        assert_eq!(recipient.address(ChannelKind::Sms), None);
    }

    #[test]
    fn failed_result_serializes_error() {
        let json = serde_json::to_value(ChannelResult::failed(
            ChannelKind::Line,
            NotificationError::MissingLineToken,
        ))
        .unwrap();
        assert_eq!(json["channel"], "line");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "LINE Access Token が設定されていません");

        let json = serde_json::to_value(ChannelResult::ok(ChannelKind::Email)).unwrap();
        assert!(json.get("error").is_none());
    }
}
