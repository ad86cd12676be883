use super::{ChannelKind, NotificationChannel, NotificationContent, NotificationError};
use crate::config::NotificationConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use tracing::{info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Thin client for the LINE Messaging API.
#[derive(Clone)]
pub struct LineClient {
    http: reqwest::Client,
    api_base: String,
    access_token: Option<String>,
    dry_run: bool,
}

impl LineClient {
    pub fn new(api_base: impl Into<String>, access_token: Option<String>, dry_run: bool) -> Self {
        Self {
            http: super::http_client(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.filter(|t| !t.trim().is_empty()),
            dry_run,
        }
    }

    pub fn from_config(config: &NotificationConfig) -> Self {
        Self::new(
            config.line_api_base.clone(),
            config.line_channel_access_token.clone(),
            config.dry_run,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.access_token.is_some()
    }

    #[instrument(skip(self, text))]
    pub async fn push_text(&self, to: &str, text: &str) -> Result<(), NotificationError> {
        let body = json!({
            "to": to,
            "messages": [{ "type": "text", "text": text }],
        });
        self.post("/v2/bot/message/push", &body).await
    }

    /// Sends the same text to many users. Empty recipient lists are a no-op.
    #[instrument(skip(self, to, text), fields(recipients = to.len()))]
    pub async fn multicast_text(&self, to: &[String], text: &str) -> Result<(), NotificationError> {
        if to.is_empty() {
            return Ok(());
        }
        let body = json!({
            "to": to,
            "messages": [{ "type": "text", "text": text }],
        });
        self.post("/v2/bot/message/multicast", &body).await
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<(), NotificationError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(NotificationError::MissingLineToken)?;

        if self.dry_run {
            info!(path, payload = %body, "LINE dry run, message not sent");
            return Ok(());
        }

        let response = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "LINE API rejected request");
            return Err(NotificationError::LineApi(text));
        }

        Ok(())
    }
}

pub struct LineChannel {
    client: LineClient,
    enabled: bool,
}

impl LineChannel {
    pub fn new(client: LineClient, enabled: bool) -> Self {
        Self { client, enabled }
    }
}

#[async_trait]
impl NotificationChannel for LineChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Line
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, to: &str, content: &NotificationContent) -> Result<(), NotificationError> {
        self.client.push_text(to, &content.message).await
    }
}

/// Checks `x-line-signature`: base64 HMAC-SHA256 of the raw body keyed by the channel secret.
pub fn verify_line_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = BASE64.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

pub fn sign_line_body(channel_secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(BASE64.encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LineWebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<LineEvent>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LineEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub source: Option<LineEventSource>,
    #[serde(default)]
    pub message: Option<LineEventMessage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineEventSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LineEventMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl LineEvent {
    pub fn user_id(&self) -> Option<&str> {
        self.source.as_ref()?.user_id.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.message.as_ref()?.text.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn content() -> NotificationContent {
        NotificationContent {
            subject: "【予約確定】RSV-20250301-ABC123".into(),
            message: "ご予約ありがとうございます".into(),
        }
    }

    #[test]
    fn signature_round_trip() {
        let body = br#"{"events":[]}"#;
        let sig = sign_line_body("secret", body).unwrap();
        assert!(verify_line_signature("secret", body, &sig));
        assert!(!verify_line_signature("other", body, &sig));
        assert!(!verify_line_signature("secret", b"{}", &sig));
        assert!(!verify_line_signature("secret", body, "not base64!"));
    }

    #[tokio::test]
    async fn missing_token_is_reported_without_calling_api() {
        let client = LineClient::new("http://127.0.0.1:9", None, false);
        let err = client.push_text("U1", "hi").await.unwrap_err();
        assert_eq!(err.to_string(), "LINE Access Token が設定されていません");
    }

    #[tokio::test]
    async fn push_sends_text_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .and(header("authorization", "Bearer token-1"))
            .and(body_partial_json(serde_json::json!({
                "to": "U123",
                "messages": [{ "type": "text", "text": "ご予約ありがとうございます" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let channel = LineChannel::new(
            LineClient::new(server.uri(), Some("token-1".into()), false),
            true,
        );
        channel.send("U123", &content()).await.unwrap();
    }

    #[tokio::test]
    async fn api_error_body_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/bot/message/push"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid user"))
            .mount(&server)
            .await;

        let client = LineClient::new(server.uri(), Some("token-1".into()), false);
        let err = client.push_text("U123", "hi").await.unwrap_err();
        assert_eq!(err.to_string(), "LINE API Error: Invalid user");
    }

    #[tokio::test]
    async fn dry_run_skips_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let client = LineClient::new(server.uri(), Some("token-1".into()), true);
        client.push_text("U123", "hi").await.unwrap();
        client
            .multicast_text(&["U1".into(), "U2".into()], "hi")
            .await
            .unwrap();
    }

    #[test]
    fn webhook_events_expose_user_and_text() {
        let body: LineWebhookBody = serde_json::from_str(
            r#"{"destination":"x","events":[{"type":"message","source":{"type":"user","userId":"U9"},"message":{"type":"text","text":"RSV-20250301-ABC123"}}]}"#,
        )
        .unwrap();
        let event = &body.events[0];
        assert_eq!(event.user_id(), Some("U9"));
        assert_eq!(event.text(), Some("RSV-20250301-ABC123"));
    }
}
