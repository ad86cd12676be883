//! What the public reservation form needs to render for a preset.

use crate::{
    db::DbPool,
    entities::{form_settings, pickup_window, preset_product, product, product_preset},
    errors::ServiceError,
    services::{
        availability::{self, AvailableDate, PickupWindowSummary},
        presets::{FormSettingsView, PresetSummary},
    },
};
use chrono::{FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FormProduct {
    pub id: Uuid,
    pub name: String,
    pub base_name: Option<String>,
    pub variation_name: Option<String>,
    pub price: Decimal,
    pub display_order: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FormConfig {
    pub preset: PresetSummary,
    pub settings: FormSettingsView,
    pub products: Vec<FormProduct>,
    pub pickup_windows: Vec<PickupWindowSummary>,
    pub available_dates: Vec<AvailableDate>,
}

/// Preset and settings of a form currently accepting submissions.
pub async fn load_open_form<C: ConnectionTrait>(
    db: &C,
    preset_id: Uuid,
    today: NaiveDate,
) -> Result<(product_preset::Model, form_settings::Model), ServiceError> {
    let not_found = || ServiceError::not_found("Form for preset", preset_id);

    let preset = product_preset::Entity::find_by_id(preset_id)
        .one(db)
        .await?
        .filter(|p| p.accepts_submissions_on(today))
        .ok_or_else(not_found)?;
    let settings = form_settings::Entity::find()
        .filter(form_settings::Column::PresetId.eq(preset_id))
        .filter(form_settings::Column::IsEnabled.eq(true))
        .one(db)
        .await?
        .ok_or_else(not_found)?;

    Ok((preset, settings))
}

#[derive(Clone)]
pub struct FormConfigService {
    db_pool: Arc<DbPool>,
    shop_offset: FixedOffset,
}

impl FormConfigService {
    pub fn new(db_pool: Arc<DbPool>, shop_offset: FixedOffset) -> Self {
        Self {
            db_pool,
            shop_offset,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_form_config(&self, preset_id: Uuid) -> Result<FormConfig, ServiceError> {
        let db = &*self.db_pool;
        let today = Utc::now().with_timezone(&self.shop_offset).date_naive();
        let (preset, settings) = load_open_form(db, preset_id, today).await?;

        let products: Vec<FormProduct> = preset_product::Entity::find()
            .filter(preset_product::Column::PresetId.eq(preset_id))
            .filter(preset_product::Column::IsActive.eq(true))
            .order_by_asc(preset_product::Column::DisplayOrder)
            .find_also_related(product::Entity)
            .all(db)
            .await?
            .into_iter()
            .filter_map(|(link, product)| {
                product.filter(|p| p.visible).map(|p| FormProduct {
                    id: p.id,
                    name: p.name,
                    base_name: p.base_name,
                    variation_name: p.variation_name,
                    price: p.price,
                    display_order: link.display_order,
                    comment: p.comment,
                })
            })
            .collect();

        let windows = pickup_window::Entity::find()
            .filter(pickup_window::Column::PresetId.eq(preset_id))
            .order_by_asc(pickup_window::Column::PickupStart)
            .all(db)
            .await?;
        let available_dates = availability::available_dates(windows.clone(), &[], self.shop_offset);

        Ok(FormConfig {
            preset: preset.into(),
            settings: settings.into(),
            products,
            pickup_windows: windows.into_iter().map(Into::into).collect(),
            available_dates,
        })
    }

    /// Available dates narrowed to the customer's current product selection.
    #[instrument(skip(self))]
    pub async fn available_dates(
        &self,
        preset_id: Uuid,
        selected: &[Uuid],
    ) -> Result<Vec<AvailableDate>, ServiceError> {
        let db = &*self.db_pool;
        let today = Utc::now().with_timezone(&self.shop_offset).date_naive();
        load_open_form(db, preset_id, today).await?;

        let windows = pickup_window::Entity::find()
            .filter(pickup_window::Column::PresetId.eq(preset_id))
            .all(db)
            .await?;
        Ok(availability::available_dates(windows, selected, self.shop_offset))
    }
}
