use super::{ChannelKind, NotificationChannel, NotificationContent, NotificationError};
use async_trait::async_trait;
use tracing::info;

/// No SMS gateway is integrated; messages are written to the log.
pub struct SmsChannel {
    enabled: bool,
}

impl SmsChannel {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, to: &str, content: &NotificationContent) -> Result<(), NotificationError> {
        info!(to, subject = %content.subject, "SMS logged");
        Ok(())
    }
}
