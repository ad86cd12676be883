use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter as StrumEnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub reservation_number: String,
    pub customer_id: Uuid,
    pub preset_id: Option<Uuid>,
    /// Calendar date of pickup
    pub reservation_date: NaiveDate,
    pub pickup_time_start: Option<NaiveTime>,
    pub pickup_time_end: Option<NaiveTime>,
    pub status: String,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub notes: Option<String>,
    pub admin_notes: Option<String>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub confirmation_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn status(&self) -> Option<ReservationStatus> {
        self.status.parse().ok()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::reservation_item::Entity")]
    ReservationItem,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::reservation_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReservationItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
        }
        if !matches!(active_model.updated_at, ActiveValue::Set(_)) {
            active_model.updated_at = Set(now);
        }

        Ok(active_model)
    }
}

/// Lifecycle of a reservation. Any status may be set from any other.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    StrumEnumIter,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Ready,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    /// Label shown on printed sheets and admin screens
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "保留中",
            Self::Confirmed => "確定",
            Self::Ready => "準備完了",
            Self::Completed => "完了",
            Self::Cancelled => "キャンセル",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_storage_string() {
        assert_eq!(ReservationStatus::Confirmed.to_string(), "confirmed");
        assert_eq!(
            ReservationStatus::from_str("cancelled").unwrap(),
            ReservationStatus::Cancelled
        );
        assert!(ReservationStatus::from_str("shipped").is_err());
    }

    #[test]
    fn status_labels_are_japanese() {
        assert_eq!(ReservationStatus::Pending.label(), "保留中");
        assert_eq!(ReservationStatus::Ready.label(), "準備完了");
    }
}
