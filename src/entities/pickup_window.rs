use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A time range during which a preset's products can be collected
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pickup_windows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub preset_id: Uuid,
    /// Restricts the window to one product; `None` applies to the whole preset
    pub product_id: Option<Uuid>,
    pub pickup_start: DateTime<Utc>,
    pub pickup_end: DateTime<Utc>,
    /// Overrides the product price for pickups in this window
    pub price: Option<Decimal>,
    pub comment: Option<String>,
    pub variation: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_preset::Entity",
        from = "Column::PresetId",
        to = "super::product_preset::Column::Id",
        on_delete = "Cascade"
    )]
    ProductPreset,
}

impl Related<super::product_preset::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductPreset.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        if insert {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
