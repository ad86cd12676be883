use crate::{
    config::AppConfig,
    db::DbPool,
    entities::{
        customer,
        notification_log::{self, NotificationType},
        reservation,
    },
    errors::ServiceError,
    notifications::{
        line::LineWebhookBody,
        templates::{self, MessageContext, TemplateItem},
        ChannelResult, EmailChannel, LineChannel, LineClient, NotificationChannel,
        NotificationContent, Recipient, SmsChannel,
    },
    services::reservations::{load_details, ReservationDetails},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// LINE caps multicast recipients per request.
const MULTICAST_BATCH: usize = 500;

static RESERVATION_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"RSV-\d{8}-[A-Z0-9]{6}").expect("reservation number pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DispatchOutcome {
    /// True when at least one channel delivered the message.
    pub success: bool,
    pub results: Vec<ChannelResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotificationLogSummary {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub notification_type: String,
    pub success: bool,
    #[schema(value_type = Object)]
    pub results: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<notification_log::Model> for NotificationLogSummary {
    fn from(model: notification_log::Model) -> Self {
        Self {
            id: model.id,
            reservation_id: model.reservation_id,
            customer_id: model.customer_id,
            notification_type: model.notification_type,
            success: model.success,
            results: model.results,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MulticastOutcome {
    pub recipients: usize,
    pub batches: usize,
}

/// Tries each channel in order. A channel is skipped when disabled or when the
/// recipient has no address for it; one failing channel never stops the next.
pub async fn fan_out(
    channels: &[Arc<dyn NotificationChannel>],
    recipient: &Recipient,
    content: &NotificationContent,
) -> Vec<ChannelResult> {
    let mut results = Vec::new();
    for channel in channels {
        if !channel.is_enabled() {
            continue;
        }
        let kind = channel.kind();
        let Some(address) = recipient.address(kind) else {
            continue;
        };

        let result = match channel.send(address, content).await {
            Ok(()) => ChannelResult::ok(kind),
            Err(e) => {
                warn!(channel = %kind, error = %e, "Notification channel failed");
                ChannelResult::failed(kind, e)
            }
        };
        counter!(
            "nursery.notifications.attempts",
            1,
            "channel" => kind.to_string(),
            "success" => result.success.to_string()
        );
        results.push(result);
    }
    results
}

/// Sends reservation notices to customers and records every attempt.
#[derive(Clone)]
pub struct NotificationService {
    db_pool: Arc<DbPool>,
    channels: Vec<Arc<dyn NotificationChannel>>,
    line: LineClient,
    shop_name: String,
}

impl NotificationService {
    pub fn new(
        db_pool: Arc<DbPool>,
        channels: Vec<Arc<dyn NotificationChannel>>,
        line: LineClient,
        shop_name: impl Into<String>,
    ) -> Self {
        Self {
            db_pool,
            channels,
            line,
            shop_name: shop_name.into(),
        }
    }

    /// LINE, then email, then SMS.
    pub fn from_config(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let settings = &config.notifications;
        let line = LineClient::from_config(settings);
        let channels: Vec<Arc<dyn NotificationChannel>> = vec![
            Arc::new(LineChannel::new(line.clone(), settings.line_enabled)),
            Arc::new(EmailChannel::from_config(settings)),
            Arc::new(SmsChannel::new(settings.sms_enabled)),
        ];
        Self::new(db_pool, channels, line, config.shop_name.clone())
    }

    fn context(&self, details: &ReservationDetails) -> MessageContext {
        let r = &details.reservation;
        MessageContext {
            shop_name: self.shop_name.clone(),
            reservation_number: r.reservation_number.clone(),
            customer_name: details.customer.as_ref().map(|c| c.full_name.clone()),
            reservation_date: r.reservation_date,
            pickup_time_start: r.pickup_time_start,
            pickup_time_end: r.pickup_time_end,
            items: details
                .items
                .iter()
                .map(|i| TemplateItem {
                    name: i.product_name.clone().unwrap_or_else(|| "不明".to_string()),
                    quantity: i.item.quantity,
                })
                .collect(),
            final_amount: r.final_amount,
        }
    }

    /// Renders and fans out one notice for a reservation.
    ///
    /// Confirmation and reminder dispatches stamp `confirmation_sent_at` /
    /// `reminder_sent_at` once per call, whatever the channel outcome.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn dispatch(
        &self,
        reservation_id: Uuid,
        kind: NotificationType,
    ) -> Result<DispatchOutcome, ServiceError> {
        let db = &*self.db_pool;
        let details = load_details(db, reservation_id).await?;

        let recipient = details
            .customer
            .as_ref()
            .map(|c| Recipient {
                name: Some(c.full_name.clone()),
                line_user_id: c.line_user_id.clone(),
                email: c.email.clone(),
                phone: c.phone.clone(),
            })
            .unwrap_or_default();
        let content = templates::render(kind, &self.context(&details));

        let results = fan_out(&self.channels, &recipient, &content).await;
        let success = results.iter().any(|r| r.success);

        let now = Utc::now();
        match kind {
            NotificationType::Confirmation => {
                let mut active: reservation::ActiveModel = details.reservation.clone().into();
                active.confirmation_sent_at = Set(Some(now));
                active.update(db).await?;
            }
            NotificationType::Reminder => {
                let mut active: reservation::ActiveModel = details.reservation.clone().into();
                active.reminder_sent_at = Set(Some(now));
                active.update(db).await?;
            }
            NotificationType::Received | NotificationType::Cancellation => {}
        }

        notification_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            reservation_id: Set(reservation_id),
            customer_id: Set(details.customer.as_ref().map(|c| c.id)),
            notification_type: Set(kind.to_string()),
            success: Set(success),
            results: Set(serde_json::to_value(&results)?),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(
            reservation_id = %reservation_id,
            channels = results.len(),
            success,
            "Notification dispatched"
        );

        Ok(DispatchOutcome { success, results })
    }

    #[instrument(skip(self))]
    pub async fn list_logs(
        &self,
        reservation_id: Option<Uuid>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<NotificationLogSummary>, u64), ServiceError> {
        let mut query = notification_log::Entity::find();
        if let Some(id) = reservation_id {
            query = query.filter(notification_log::Column::ReservationId.eq(id));
        }

        let paginator = query
            .order_by_desc(notification_log::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let logs = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((logs.into_iter().map(Into::into).collect(), total))
    }

    /// Broadcasts a LINE text. Without explicit ids every customer with a LINE id is targeted.
    #[instrument(skip(self, message, user_ids))]
    pub async fn multicast(
        &self,
        message: &str,
        user_ids: Option<Vec<String>>,
    ) -> Result<MulticastOutcome, ServiceError> {
        if message.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "message must not be empty".to_string(),
            ));
        }

        let mut targets = match user_ids {
            Some(ids) => ids,
            None => customer::Entity::find()
                .filter(customer::Column::LineUserId.is_not_null())
                .all(&*self.db_pool)
                .await?
                .into_iter()
                .filter_map(|c| c.line_user_id)
                .collect(),
        };
        targets.retain(|id| !id.trim().is_empty());
        targets.sort();
        targets.dedup();

        let mut batches = 0;
        for chunk in targets.chunks(MULTICAST_BATCH) {
            self.line
                .multicast_text(chunk, message)
                .await
                .map_err(|e| ServiceError::ExternalServiceError(e.to_string()))?;
            batches += 1;
        }
        counter!("nursery.notifications.multicast", targets.len() as u64);
        info!(recipients = targets.len(), batches, "LINE multicast sent");

        Ok(MulticastOutcome {
            recipients: targets.len(),
            batches,
        })
    }

    /// Links LINE senders to customers when a message quotes a reservation number.
    /// Returns how many customers were linked.
    #[instrument(skip(self, body), fields(events = body.events.len()))]
    pub async fn handle_line_webhook(&self, body: LineWebhookBody) -> Result<usize, ServiceError> {
        let db = &*self.db_pool;
        let mut linked = 0;

        for event in &body.events {
            if event.event_type != "message" && event.event_type != "follow" {
                continue;
            }
            let (Some(user_id), Some(text)) = (event.user_id(), event.text()) else {
                continue;
            };
            let Some(number) = RESERVATION_NUMBER_RE.find(text) else {
                continue;
            };

            let Some(found) = reservation::Entity::find()
                .filter(reservation::Column::ReservationNumber.eq(number.as_str()))
                .one(db)
                .await?
            else {
                continue;
            };
            let Some(customer) = customer::Entity::find_by_id(found.customer_id)
                .one(db)
                .await?
            else {
                continue;
            };
            if customer.line_user_id.as_deref() == Some(user_id) {
                continue;
            }

            let customer_id = customer.id;
            let mut active: customer::ActiveModel = customer.into();
            active.line_user_id = Set(Some(user_id.to_string()));
            active.update(db).await?;
            linked += 1;
            info!(%customer_id, reservation_number = number.as_str(), "LINE user linked");
        }

        Ok(linked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::{ChannelKind, MockNotificationChannel, NotificationError};

    fn mock(kind: ChannelKind, enabled: bool, calls: usize, fail: bool) -> Arc<dyn NotificationChannel> {
        let mut channel = MockNotificationChannel::new();
        channel.expect_kind().return_const(kind);
        channel.expect_is_enabled().return_const(enabled);
        channel.expect_send().times(calls).returning(move |_, _| {
            if fail {
                Err(NotificationError::LineApi("boom".into()))
            } else {
                Ok(())
            }
        });
        Arc::new(channel)
    }

    fn content() -> NotificationContent {
        NotificationContent {
            subject: "s".into(),
            message: "m".into(),
        }
    }

    #[tokio::test]
    async fn channel_without_address_is_never_called() {
        let channels = vec![
            mock(ChannelKind::Line, true, 0, false),
            mock(ChannelKind::Email, true, 1, false),
            mock(ChannelKind::Sms, true, 0, false),
        ];
        let recipient = Recipient {
            email: Some("a@example.com".into()),
            ..Recipient::default()
        };
        let results = fan_out(&channels, &recipient, &content()).await;
        assert_eq!(results, vec![ChannelResult::ok(ChannelKind::Email)]);
    }

    #[tokio::test]
    async fn disabled_channel_is_skipped() {
        let channels = vec![mock(ChannelKind::Sms, false, 0, false)];
        let recipient = Recipient {
            phone: Some("090-1234-5678".into()),
            ..Recipient::default()
        };
        assert!(fan_out(&channels, &recipient, &content()).await.is_empty());
    }

    #[tokio::test]
    async fn failure_does_not_block_later_channels() {
        let channels = vec![
            mock(ChannelKind::Line, true, 1, true),
            mock(ChannelKind::Email, true, 1, false),
        ];
        let recipient = Recipient {
            line_user_id: Some("U1".into()),
            email: Some("a@example.com".into()),
            ..Recipient::default()
        };
        let results = fan_out(&channels, &recipient, &content()).await;
        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert_eq!(results[0].error.as_deref(), Some("LINE API Error: boom"));
        assert!(results[1].success);
    }

    #[test]
    fn reservation_numbers_are_found_in_text() {
        let m = RESERVATION_NUMBER_RE.find("予約番号は RSV-20250301-AB12CD です");
        assert_eq!(m.map(|m| m.as_str()), Some("RSV-20250301-AB12CD"));
        assert!(RESERVATION_NUMBER_RE.find("こんにちは").is_none());
    }
}
