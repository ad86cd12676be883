use crate::{
    db::DbPool,
    entities::{product, reservation, reservation::ReservationStatus, reservation_item},
    errors::ServiceError,
};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

const TOP_PRODUCTS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub total_reservations: u64,
    pub today_pickups: u64,
    pub pending: u64,
    pub confirmed: u64,
    /// Sum of final amounts, cancelled reservations excluded
    pub revenue: Decimal,
    pub created_last_7_days: u64,
    pub created_this_month: u64,
    pub top_products: Vec<TopProduct>,
}

/// Orders product totals by quantity, then name, and keeps the first five.
pub fn rank_products(totals: HashMap<Uuid, (String, i64)>) -> Vec<TopProduct> {
    let mut ranked: Vec<TopProduct> = totals
        .into_iter()
        .map(|(product_id, (name, quantity))| TopProduct {
            product_id,
            name,
            quantity,
        })
        .collect();
    ranked.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(TOP_PRODUCTS);
    ranked
}

fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    offset
        .from_local_datetime(&date.and_time(chrono::NaiveTime::MIN))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN).and_utc())
}

#[derive(Clone)]
pub struct DashboardService {
    db_pool: Arc<DbPool>,
    shop_offset: FixedOffset,
}

impl DashboardService {
    pub fn new(db_pool: Arc<DbPool>, shop_offset: FixedOffset) -> Self {
        Self {
            db_pool,
            shop_offset,
        }
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();
        let today = now.with_timezone(&self.shop_offset).date_naive();
        let cancelled = ReservationStatus::Cancelled.to_string();

        let count_status = |status: ReservationStatus| {
            reservation::Entity::find()
                .filter(reservation::Column::Status.eq(status.to_string()))
                .count(db)
        };

        let total_reservations = reservation::Entity::find().count(db).await?;
        let today_pickups = reservation::Entity::find()
            .filter(reservation::Column::ReservationDate.eq(today))
            .filter(reservation::Column::Status.ne(cancelled.clone()))
            .count(db)
            .await?;
        let pending = count_status(ReservationStatus::Pending).await?;
        let confirmed = count_status(ReservationStatus::Confirmed).await?;

        let week_start = start_of_day(today - Duration::days(6), self.shop_offset);
        let created_last_7_days = reservation::Entity::find()
            .filter(reservation::Column::CreatedAt.gte(week_start))
            .count(db)
            .await?;
        let month_start = start_of_day(today.with_day(1).unwrap_or(today), self.shop_offset);
        let created_this_month = reservation::Entity::find()
            .filter(reservation::Column::CreatedAt.gte(month_start))
            .count(db)
            .await?;

        let active = reservation::Entity::find()
            .filter(reservation::Column::Status.ne(cancelled))
            .all(db)
            .await?;
        let revenue: Decimal = active.iter().map(|r| r.final_amount).sum();

        let active_ids: Vec<Uuid> = active.iter().map(|r| r.id).collect();
        let mut totals: HashMap<Uuid, (String, i64)> = HashMap::new();
        if !active_ids.is_empty() {
            let items = reservation_item::Entity::find()
                .filter(reservation_item::Column::ReservationId.is_in(active_ids))
                .find_also_related(product::Entity)
                .all(db)
                .await?;
            for (item, product) in items {
                let entry = totals.entry(item.product_id).or_insert_with(|| {
                    (product.map(|p| p.name).unwrap_or_default(), 0)
                });
                entry.1 += i64::from(item.quantity);
            }
        }

        Ok(DashboardStats {
            total_reservations,
            today_pickups,
            pending,
            confirmed,
            revenue,
            created_last_7_days,
            created_this_month,
            top_products: rank_products(totals),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_keeps_five_highest_quantities() {
        let totals: HashMap<Uuid, (String, i64)> = (1..=7)
            .map(|i| (Uuid::new_v4(), (format!("苗{}", i), i as i64)))
            .collect();
        let top = rank_products(totals);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].quantity, 7);
        assert_eq!(top[4].quantity, 3);
    }

    #[test]
    fn ranking_breaks_ties_by_name() {
        let totals = HashMap::from([
            (Uuid::new_v4(), ("ビオラ".to_string(), 4)),
            (Uuid::new_v4(), ("パンジー".to_string(), 4)),
        ]);
        let top = rank_products(totals);
        assert_eq!(top[0].name, "パンジー");
    }

    #[test]
    fn start_of_day_uses_shop_offset() {
        let jst = FixedOffset::east_opt(9 * 3600).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        assert_eq!(
            start_of_day(date, jst).to_rfc3339(),
            "2025-03-07T15:00:00+00:00"
        );
    }
}
