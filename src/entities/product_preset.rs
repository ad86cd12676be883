use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_presets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub preset_name: String,
    pub description: Option<String>,
    /// Last day the public form accepts submissions
    pub form_expiry_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// The form is open when the preset is active and not past its expiry date.
    pub fn accepts_submissions_on(&self, today: NaiveDate) -> bool {
        self.is_active && self.form_expiry_date.map_or(true, |last| today <= last)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::preset_product::Entity")]
    PresetProduct,
    #[sea_orm(has_many = "super::pickup_window::Entity")]
    PickupWindow,
    #[sea_orm(has_one = "super::form_settings::Entity")]
    FormSettings,
}

impl Related<super::preset_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PresetProduct.def()
    }
}

impl Related<super::pickup_window::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PickupWindow.def()
    }
}

impl Related<super::form_settings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FormSettings.def()
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
