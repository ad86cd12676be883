use crate::{
    db::DbPool,
    entities::{form_settings, pickup_window, preset_product, product, product_preset, reservation},
    errors::ServiceError,
    services::availability::PickupWindowSummary,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresetSummary {
    pub id: Uuid,
    pub preset_name: String,
    pub description: Option<String>,
    pub form_expiry_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product_preset::Model> for PresetSummary {
    fn from(model: product_preset::Model) -> Self {
        Self {
            id: model.id,
            preset_name: model.preset_name,
            description: model.description,
            form_expiry_date: model.form_expiry_date,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FormSettingsView {
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
}

impl From<form_settings::Model> for FormSettingsView {
    fn from(m: form_settings::Model) -> Self {
        Self {
            preset_id: m.preset_id,
            show_name: m.show_name,
            show_furigana: m.show_furigana,
            show_gender: m.show_gender,
            show_birthday: m.show_birthday,
            show_phone: m.show_phone,
            show_zip: m.show_zip,
            show_address1: m.show_address1,
            show_address2: m.show_address2,
            show_comment: m.show_comment,
            show_price: m.show_price,
            show_total: m.show_total,
            require_phone: m.require_phone,
            require_furigana: m.require_furigana,
            allow_note: m.allow_note,
            is_enabled: m.is_enabled,
            custom_message: m.custom_message,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PresetProductView {
    pub product_id: Uuid,
    pub product_name: String,
    pub price: Decimal,
    pub visible: bool,
    pub display_order: i32,
    pub is_active: bool,
    pub pickup_start: Option<DateTime<Utc>>,
    pub pickup_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PresetDetail {
    pub preset: PresetSummary,
    pub form_settings: Option<FormSettingsView>,
    pub products: Vec<PresetProductView>,
    pub pickup_windows: Vec<PickupWindowSummary>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePresetRequest {
    #[validate(length(min = 1, max = 100))]
    pub preset_name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub form_expiry_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePresetRequest {
    #[validate(length(min = 1, max = 100))]
    pub preset_name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub form_expiry_date: Option<NaiveDate>,
    /// Clears the expiry date when true.
    #[serde(default)]
    pub clear_form_expiry_date: bool,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PresetProductInput {
    pub product_id: Uuid,
    pub pickup_start: Option<DateTime<Utc>>,
    pub pickup_end: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePickupWindowRequest {
    pub product_id: Option<Uuid>,
    pub pickup_start: DateTime<Utc>,
    pub pickup_end: DateTime<Utc>,
    pub price: Option<Decimal>,
    #[validate(length(max = 200))]
    pub comment: Option<String>,
    #[validate(length(max = 100))]
    pub variation: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFormSettingsRequest {
    pub show_name: Option<bool>,
    pub show_furigana: Option<bool>,
    pub show_gender: Option<bool>,
    pub show_birthday: Option<bool>,
    pub show_phone: Option<bool>,
    pub show_zip: Option<bool>,
    pub show_address1: Option<bool>,
    pub show_address2: Option<bool>,
    pub show_comment: Option<bool>,
    pub show_price: Option<bool>,
    pub show_total: Option<bool>,
    pub require_phone: Option<bool>,
    pub require_furigana: Option<bool>,
    pub allow_note: Option<bool>,
    pub is_enabled: Option<bool>,
    #[validate(length(max = 1000))]
    pub custom_message: Option<String>,
}

/// Presets bundle products, pickup windows and form settings.
#[derive(Clone)]
pub struct PresetService {
    db_pool: Arc<DbPool>,
}

impl PresetService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn find_preset<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<product_preset::Model, ServiceError> {
        product_preset::Entity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Preset", id))
    }

    #[instrument(skip(self))]
    pub async fn list_presets(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<PresetSummary>, u64), ServiceError> {
        let paginator = product_preset::Entity::find()
            .order_by_asc(product_preset::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let presets = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((presets.into_iter().map(Into::into).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn get_preset(&self, id: Uuid) -> Result<PresetDetail, ServiceError> {
        let db = &*self.db_pool;
        let preset = Self::find_preset(db, id).await?;
        let form_settings = form_settings::Entity::find()
            .filter(form_settings::Column::PresetId.eq(id))
            .one(db)
            .await?;

        Ok(PresetDetail {
            preset: preset.into(),
            form_settings: form_settings.map(Into::into),
            products: self.list_preset_products(id).await?,
            pickup_windows: self.list_pickup_windows(id).await?,
        })
    }

    /// Creates the preset with default form settings.
    #[instrument(skip(self, request), fields(name = %request.preset_name))]
    pub async fn create_preset(
        &self,
        request: CreatePresetRequest,
    ) -> Result<PresetSummary, ServiceError> {
        request.validate()?;

        let txn = self.db_pool.begin().await?;
        let preset = product_preset::ActiveModel {
            id: Set(Uuid::new_v4()),
            preset_name: Set(request.preset_name.trim().to_string()),
            description: Set(request.description),
            form_expiry_date: Set(request.form_expiry_date),
            is_active: Set(request.is_active.unwrap_or(true)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        form_settings::defaults_for(preset.id).insert(&txn).await?;
        txn.commit().await?;

        info!(preset_id = %preset.id, "Preset created");
        Ok(preset.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_preset(
        &self,
        id: Uuid,
        request: UpdatePresetRequest,
    ) -> Result<PresetSummary, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let mut active: product_preset::ActiveModel = Self::find_preset(db, id).await?.into();

        if let Some(name) = request.preset_name {
            active.preset_name = Set(name.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if request.clear_form_expiry_date {
            active.form_expiry_date = Set(None);
        } else if let Some(date) = request.form_expiry_date {
            active.form_expiry_date = Set(Some(date));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }

        Ok(active.update(db).await?.into())
    }

    /// Removes the preset and everything it owns; reservations keep their data but lose the link.
    #[instrument(skip(self))]
    pub async fn delete_preset(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        Self::find_preset(&txn, id).await?;

        reservation::Entity::update_many()
            .col_expr(reservation::Column::PresetId, Expr::value(Option::<Uuid>::None))
            .filter(reservation::Column::PresetId.eq(id))
            .exec(&txn)
            .await?;
        preset_product::Entity::delete_many()
            .filter(preset_product::Column::PresetId.eq(id))
            .exec(&txn)
            .await?;
        pickup_window::Entity::delete_many()
            .filter(pickup_window::Column::PresetId.eq(id))
            .exec(&txn)
            .await?;
        form_settings::Entity::delete_many()
            .filter(form_settings::Column::PresetId.eq(id))
            .exec(&txn)
            .await?;
        product_preset::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(preset_id = %id, "Preset deleted");
        Ok(())
    }

    /// Copies settings, product list and pickup windows into a new inactive preset.
    #[instrument(skip(self))]
    pub async fn duplicate_preset(&self, id: Uuid) -> Result<PresetSummary, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let source = Self::find_preset(&txn, id).await?;

        let copy = product_preset::ActiveModel {
            id: Set(Uuid::new_v4()),
            preset_name: Set(format!("{} (コピー)", source.preset_name)),
            description: Set(source.description.clone()),
            form_expiry_date: Set(source.form_expiry_date),
            is_active: Set(false),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let settings = form_settings::Entity::find()
            .filter(form_settings::Column::PresetId.eq(id))
            .one(&txn)
            .await?;
        match settings {
            Some(s) => {
                form_settings::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    preset_id: Set(copy.id),
                    show_name: Set(s.show_name),
                    show_furigana: Set(s.show_furigana),
                    show_gender: Set(s.show_gender),
                    show_birthday: Set(s.show_birthday),
                    show_phone: Set(s.show_phone),
                    show_zip: Set(s.show_zip),
                    show_address1: Set(s.show_address1),
                    show_address2: Set(s.show_address2),
                    show_comment: Set(s.show_comment),
                    show_price: Set(s.show_price),
                    show_total: Set(s.show_total),
                    require_phone: Set(s.require_phone),
                    require_furigana: Set(s.require_furigana),
                    allow_note: Set(s.allow_note),
                    is_enabled: Set(s.is_enabled),
                    custom_message: Set(s.custom_message),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
            None => {
                form_settings::defaults_for(copy.id).insert(&txn).await?;
            }
        }

        let products = preset_product::Entity::find()
            .filter(preset_product::Column::PresetId.eq(id))
            .all(&txn)
            .await?;
        for p in products {
            preset_product::ActiveModel {
                id: Set(Uuid::new_v4()),
                preset_id: Set(copy.id),
                product_id: Set(p.product_id),
                pickup_start: Set(p.pickup_start),
                pickup_end: Set(p.pickup_end),
                display_order: Set(p.display_order),
                is_active: Set(p.is_active),
            }
            .insert(&txn)
            .await?;
        }

        let windows = pickup_window::Entity::find()
            .filter(pickup_window::Column::PresetId.eq(id))
            .all(&txn)
            .await?;
        for w in windows {
            pickup_window::ActiveModel {
                id: Set(Uuid::new_v4()),
                preset_id: Set(copy.id),
                product_id: Set(w.product_id),
                pickup_start: Set(w.pickup_start),
                pickup_end: Set(w.pickup_end),
                price: Set(w.price),
                comment: Set(w.comment),
                variation: Set(w.variation),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!(source = %id, preset_id = %copy.id, "Preset duplicated");
        Ok(copy.into())
    }

    #[instrument(skip(self))]
    pub async fn list_preset_products(
        &self,
        preset_id: Uuid,
    ) -> Result<Vec<PresetProductView>, ServiceError> {
        let rows = preset_product::Entity::find()
            .filter(preset_product::Column::PresetId.eq(preset_id))
            .order_by_asc(preset_product::Column::DisplayOrder)
            .find_also_related(product::Entity)
            .all(&*self.db_pool)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(link, product)| {
                product.map(|p| PresetProductView {
                    product_id: p.id,
                    product_name: p.name,
                    price: p.price,
                    visible: p.visible,
                    display_order: link.display_order,
                    is_active: link.is_active,
                    pickup_start: link.pickup_start,
                    pickup_end: link.pickup_end,
                })
            })
            .collect())
    }

    /// Replaces the preset's product list; order in the request becomes display order.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn set_preset_products(
        &self,
        preset_id: Uuid,
        items: Vec<PresetProductInput>,
    ) -> Result<Vec<PresetProductView>, ServiceError> {
        let mut seen = HashSet::new();
        if let Some(dup) = items.iter().find(|i| !seen.insert(i.product_id)) {
            return Err(ServiceError::ValidationError(format!(
                "product {} appears more than once",
                dup.product_id
            )));
        }

        let txn = self.db_pool.begin().await?;
        Self::find_preset(&txn, preset_id).await?;

        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let found = product::Entity::find()
            .filter(product::Column::Id.is_in(ids.clone()))
            .count(&txn)
            .await?;
        if found as usize != ids.len() {
            return Err(ServiceError::ValidationError(
                "one or more products do not exist".to_string(),
            ));
        }

        preset_product::Entity::delete_many()
            .filter(preset_product::Column::PresetId.eq(preset_id))
            .exec(&txn)
            .await?;
        for (index, item) in items.into_iter().enumerate() {
            preset_product::ActiveModel {
                id: Set(Uuid::new_v4()),
                preset_id: Set(preset_id),
                product_id: Set(item.product_id),
                pickup_start: Set(item.pickup_start),
                pickup_end: Set(item.pickup_end),
                display_order: Set(index as i32 + 1),
                is_active: Set(item.is_active.unwrap_or(true)),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        self.list_preset_products(preset_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_pickup_windows(
        &self,
        preset_id: Uuid,
    ) -> Result<Vec<PickupWindowSummary>, ServiceError> {
        let windows = pickup_window::Entity::find()
            .filter(pickup_window::Column::PresetId.eq(preset_id))
            .order_by_asc(pickup_window::Column::PickupStart)
            .all(&*self.db_pool)
            .await?;
        Ok(windows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, request))]
    pub async fn create_pickup_window(
        &self,
        preset_id: Uuid,
        request: CreatePickupWindowRequest,
    ) -> Result<PickupWindowSummary, ServiceError> {
        request.validate()?;
        if request.pickup_end <= request.pickup_start {
            return Err(ServiceError::ValidationError(
                "pickup_end must be after pickup_start".to_string(),
            ));
        }
        if request.price.map_or(false, |p| p.is_sign_negative()) {
            return Err(ServiceError::ValidationError(
                "price must not be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        Self::find_preset(db, preset_id).await?;
        if let Some(product_id) = request.product_id {
            product::Entity::find_by_id(product_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::not_found("Product", product_id))?;
        }

        let window = pickup_window::ActiveModel {
            id: Set(Uuid::new_v4()),
            preset_id: Set(preset_id),
            product_id: Set(request.product_id),
            pickup_start: Set(request.pickup_start),
            pickup_end: Set(request.pickup_end),
            price: Set(request.price),
            comment: Set(request.comment),
            variation: Set(request.variation),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(preset_id = %preset_id, window_id = %window.id, "Pickup window created");
        Ok(window.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_pickup_window(
        &self,
        preset_id: Uuid,
        window_id: Uuid,
    ) -> Result<(), ServiceError> {
        let result = pickup_window::Entity::delete_many()
            .filter(pickup_window::Column::Id.eq(window_id))
            .filter(pickup_window::Column::PresetId.eq(preset_id))
            .exec(&*self.db_pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Pickup window", window_id));
        }
        Ok(())
    }

    async fn settings_row(&self, preset_id: Uuid) -> Result<form_settings::Model, ServiceError> {
        form_settings::Entity::find()
            .filter(form_settings::Column::PresetId.eq(preset_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Form settings for preset", preset_id))
    }

    #[instrument(skip(self))]
    pub async fn get_form_settings(&self, preset_id: Uuid) -> Result<FormSettingsView, ServiceError> {
        Ok(self.settings_row(preset_id).await?.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_form_settings(
        &self,
        preset_id: Uuid,
        request: UpdateFormSettingsRequest,
    ) -> Result<FormSettingsView, ServiceError> {
        request.validate()?;
        let mut active: form_settings::ActiveModel = self.settings_row(preset_id).await?.into();

        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = request.$field {
                    active.$field = Set(v);
                })*
            };
        }
        apply!(
            show_name,
            show_furigana,
            show_gender,
            show_birthday,
            show_phone,
            show_zip,
            show_address1,
            show_address2,
            show_comment,
            show_price,
            show_total,
            require_phone,
            require_furigana,
            allow_note,
            is_enabled,
        );
        if let Some(message) = request.custom_message {
            active.custom_message = Set(Some(message).filter(|m| !m.trim().is_empty()));
        }

        Ok(active.update(&*self.db_pool).await?.into())
    }
}
