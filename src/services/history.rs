//! Archive of finished reservations.
//!
//! Completed and cancelled reservations leave the live tables once they are
//! old enough; a snapshot with customer and item details is kept in
//! `reservation_history` for look-ups by phone or name.

use crate::{
    config::MaintenanceConfig,
    db::DbPool,
    entities::{reservation, reservation::ReservationStatus, reservation_history, reservation_item},
    errors::ServiceError,
    services::reservations::{load_details, ReservationDetails},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ArchiveOutcome {
    pub moved: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct HistoryQuery {
    pub phone: Option<String>,
    pub name: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub status: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub reservation_number: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub reservation_date: NaiveDate,
    pub status: String,
    pub final_amount: Decimal,
    #[schema(value_type = Object)]
    pub items: serde_json::Value,
    pub notes: Option<String>,
    pub admin_notes: Option<String>,
    pub original_created_at: DateTime<Utc>,
    pub archived_at: DateTime<Utc>,
}

impl From<reservation_history::Model> for HistoryEntry {
    fn from(model: reservation_history::Model) -> Self {
        Self {
            id: model.id,
            reservation_id: model.reservation_id,
            reservation_number: model.reservation_number,
            customer_name: model.customer_name,
            customer_phone: model.customer_phone,
            reservation_date: model.reservation_date,
            status: model.status,
            final_amount: model.final_amount,
            items: model.items,
            notes: model.notes,
            admin_notes: model.admin_notes,
            original_created_at: model.original_created_at,
            archived_at: model.archived_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryStats {
    pub total: u64,
    pub completed: u64,
    pub cancelled: u64,
    /// Sum of final amounts of completed reservations
    pub total_revenue: Decimal,
    pub oldest_archived_at: Option<DateTime<Utc>>,
    pub newest_archived_at: Option<DateTime<Utc>>,
}

/// Snapshot row for a reservation about to leave the live tables.
pub fn snapshot(details: &ReservationDetails, archived_at: DateTime<Utc>) -> reservation_history::ActiveModel {
    let r = &details.reservation;
    let items: Vec<serde_json::Value> = details
        .items
        .iter()
        .map(|d| {
            json!({
                "product_id": d.item.product_id,
                "product_name": d.product_name,
                "quantity": d.item.quantity,
                "unit_price": d.item.unit_price,
                "subtotal": d.item.subtotal,
            })
        })
        .collect();

    reservation_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        reservation_id: Set(r.id),
        reservation_number: Set(r.reservation_number.clone()),
        customer_id: Set(Some(r.customer_id)),
        customer_name: Set(details.customer.as_ref().map(|c| c.full_name.clone())),
        customer_phone: Set(details.customer.as_ref().and_then(|c| c.phone.clone())),
        reservation_date: Set(r.reservation_date),
        status: Set(r.status.clone()),
        final_amount: Set(r.final_amount),
        items: Set(serde_json::Value::Array(items)),
        notes: Set(r.notes.clone()),
        admin_notes: Set(r.admin_notes.clone()),
        original_created_at: Set(r.created_at),
        archived_at: Set(archived_at),
    }
}

#[derive(Clone)]
pub struct HistoryService {
    db_pool: Arc<DbPool>,
    completed_retention: Duration,
    cancelled_retention: Duration,
}

impl HistoryService {
    pub fn new(db_pool: Arc<DbPool>, config: &MaintenanceConfig) -> Self {
        Self {
            db_pool,
            completed_retention: Duration::hours(config.completed_retention_hours),
            cancelled_retention: Duration::days(config.cancelled_retention_days),
        }
    }

    /// Moves every reservation past its retention into history.
    #[instrument(skip(self))]
    pub async fn archive(&self) -> Result<ArchiveOutcome, ServiceError> {
        self.archive_as_of(Utc::now()).await
    }

    pub async fn archive_as_of(&self, now: DateTime<Utc>) -> Result<ArchiveOutcome, ServiceError> {
        let mut outcome = ArchiveOutcome::default();
        for (status, retention) in [
            (ReservationStatus::Completed, self.completed_retention),
            (ReservationStatus::Cancelled, self.cancelled_retention),
        ] {
            let due = reservation::Entity::find()
                .filter(reservation::Column::Status.eq(status.to_string()))
                .filter(reservation::Column::UpdatedAt.lt(now - retention))
                .all(&*self.db_pool)
                .await?;

            for r in due {
                match self.archive_one(r.id, now).await {
                    Ok(()) => outcome.moved += 1,
                    Err(e) => {
                        error!(reservation_id = %r.id, error = %e, "Failed to archive reservation");
                        outcome.errors += 1;
                    }
                }
            }
        }

        if outcome.moved > 0 || outcome.errors > 0 {
            info!(moved = outcome.moved, errors = outcome.errors, "Reservation history archived");
        }
        metrics::counter!("nursery.history.archived", outcome.moved as u64);
        Ok(outcome)
    }

    async fn archive_one(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        let details = load_details(&txn, id).await?;
        snapshot(&details, now).insert(&txn).await?;
        reservation_item::Entity::delete_many()
            .filter(reservation_item::Column::ReservationId.eq(id))
            .exec(&txn)
            .await?;
        reservation::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: HistoryQuery,
    ) -> Result<(Vec<HistoryEntry>, u64), ServiceError> {
        let mut select = reservation_history::Entity::find();
        if let Some(phone) = query.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            select = select.filter(reservation_history::Column::CustomerPhone.contains(phone.trim()));
        }
        if let Some(name) = query.name.as_deref().filter(|n| !n.trim().is_empty()) {
            select = select.filter(reservation_history::Column::CustomerName.contains(name.trim()));
        }
        if let Some(from) = query.date_from {
            select = select.filter(reservation_history::Column::ReservationDate.gte(from));
        }
        if let Some(to) = query.date_to {
            select = select.filter(reservation_history::Column::ReservationDate.lte(to));
        }
        if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty() && *s != "all") {
            select = select.filter(reservation_history::Column::Status.eq(status));
        }

        let (page, limit) =
            crate::page_bounds(query.page.unwrap_or(1), query.limit.unwrap_or(50), 200);
        let paginator = select
            .order_by_desc(reservation_history::Column::ArchivedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let entries = paginator.fetch_page(page - 1).await?;

        Ok((entries.into_iter().map(Into::into).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<HistoryStats, ServiceError> {
        let db = &*self.db_pool;
        let rows = reservation_history::Entity::find()
            .order_by_asc(reservation_history::Column::ArchivedAt)
            .all(db)
            .await?;

        let completed = ReservationStatus::Completed.to_string();
        let cancelled = ReservationStatus::Cancelled.to_string();
        let total_revenue: Decimal = rows
            .iter()
            .filter(|r| r.status == completed)
            .map(|r| r.final_amount)
            .sum();

        Ok(HistoryStats {
            total: rows.len() as u64,
            completed: rows.iter().filter(|r| r.status == completed).count() as u64,
            cancelled: rows.iter().filter(|r| r.status == cancelled).count() as u64,
            total_revenue,
            oldest_archived_at: rows.first().map(|r| r.archived_at),
            newest_archived_at: rows.last().map(|r| r.archived_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::customer;
    use crate::services::reservations::ItemDetail;
    use rust_decimal_macros::dec;

    #[test]
    fn snapshot_keeps_customer_and_items() {
        let now = Utc::now();
        let customer_id = Uuid::new_v4();
        let details = ReservationDetails {
            reservation: reservation::Model {
                id: Uuid::new_v4(),
                reservation_number: "RSV-20250301-0A1B2C".into(),
                customer_id,
                preset_id: None,
                reservation_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                pickup_time_start: None,
                pickup_time_end: None,
                status: "completed".into(),
                total_amount: dec!(600),
                discount_amount: dec!(100),
                final_amount: dec!(500),
                notes: None,
                admin_notes: Some("常連".into()),
                reminder_sent_at: None,
                confirmation_sent_at: None,
                created_at: now,
                updated_at: now,
            },
            customer: Some(customer::Model {
                id: customer_id,
                full_name: "佐藤 花子".into(),
                furigana: None,
                phone: Some("0312345678".into()),
                email: None,
                line_user_id: None,
                postal_code: None,
                address: None,
                created_at: now,
                updated_at: now,
            }),
            items: vec![ItemDetail {
                item: reservation_item::Model {
                    id: Uuid::new_v4(),
                    reservation_id: Uuid::nil(),
                    product_id: Uuid::nil(),
                    quantity: 2,
                    unit_price: dec!(300),
                    subtotal: dec!(600),
                },
                product_name: Some("ゼラニウム".into()),
            }],
        };

        let row = snapshot(&details, now);
        assert_eq!(row.customer_phone.as_ref().as_deref(), Some("0312345678"));
        assert_eq!(*row.final_amount.as_ref(), dec!(500));
        let items = row.items.as_ref();
        assert_eq!(items[0]["product_name"], "ゼラニウム");
        assert_eq!(items[0]["quantity"], 2);
    }
}
