use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-preset layout of the public reservation form
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "form_settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub preset_id: Uuid,
    pub show_name: bool,
    pub show_furigana: bool,
    pub show_gender: bool,
    pub show_birthday: bool,
    pub show_phone: bool,
    pub show_zip: bool,
    pub show_address1: bool,
    pub show_address2: bool,
    pub show_comment: bool,
    pub show_price: bool,
    pub show_total: bool,
    pub require_phone: bool,
    pub require_furigana: bool,
    pub allow_note: bool,
    pub is_enabled: bool,
    pub custom_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
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

/// Default settings for a freshly created preset.
pub fn defaults_for(preset_id: Uuid) -> ActiveModel {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        preset_id: Set(preset_id),
        show_name: Set(true),
        show_furigana: Set(true),
        show_gender: Set(false),
        show_birthday: Set(false),
        show_phone: Set(true),
        show_zip: Set(false),
        show_address1: Set(false),
        show_address2: Set(false),
        show_comment: Set(true),
        show_price: Set(true),
        show_total: Set(true),
        require_phone: Set(true),
        require_furigana: Set(false),
        allow_note: Set(true),
        is_enabled: Set(true),
        custom_message: Set(None),
        ..Default::default()
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
