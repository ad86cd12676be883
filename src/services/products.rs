use crate::{
    db::DbPool,
    entities::{
        preset_product,
        product::{self, PriceType, TaxType, UnitType},
        reservation_item,
    },
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub product_code: Option<String>,
    pub external_id: Option<String>,
    pub name: String,
    pub base_name: Option<String>,
    pub variation_name: Option<String>,
    pub category_id: Option<i32>,
    pub price: Decimal,
    pub tax_type: String,
    pub tax_rate: i32,
    pub price_type: String,
    pub unit_type: String,
    pub barcode: Option<String>,
    pub visible: bool,
    pub point_eligible: bool,
    pub display_order: i32,
    pub comment: Option<String>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductSummary {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            product_code: model.product_code,
            external_id: model.external_id,
            name: model.name,
            base_name: model.base_name,
            variation_name: model.variation_name,
            category_id: model.category_id,
            price: model.price,
            tax_type: model.tax_type,
            tax_rate: model.tax_rate,
            price_type: model.price_type,
            unit_type: model.unit_type,
            barcode: model.barcode,
            visible: model.visible,
            point_eligible: model.point_eligible,
            display_order: model.display_order,
            comment: model.comment,
            memo: model.memo,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        return Err(ValidationError::new("price_negative"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 100, message = "商品名は1〜100文字で入力してください"))]
    pub name: String,
    #[validate(length(max = 100))]
    pub product_code: Option<String>,
    #[validate(length(max = 100))]
    pub external_id: Option<String>,
    pub base_name: Option<String>,
    pub variation_name: Option<String>,
    pub category_id: Option<i32>,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    pub tax_type: Option<TaxType>,
    #[validate(range(min = 0, max = 100))]
    pub tax_rate: Option<i32>,
    pub price_type: Option<PriceType>,
    pub unit_type: Option<UnitType>,
    pub barcode: Option<String>,
    pub visible: Option<bool>,
    pub point_eligible: Option<bool>,
    pub display_order: Option<i32>,
    pub comment: Option<String>,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 100, message = "商品名は1〜100文字で入力してください"))]
    pub name: Option<String>,
    pub product_code: Option<String>,
    pub external_id: Option<String>,
    pub base_name: Option<String>,
    pub variation_name: Option<String>,
    pub category_id: Option<i32>,
    #[validate(custom = "validate_price")]
    pub price: Option<Decimal>,
    pub tax_type: Option<TaxType>,
    #[validate(range(min = 0, max = 100))]
    pub tax_rate: Option<i32>,
    pub price_type: Option<PriceType>,
    pub unit_type: Option<UnitType>,
    pub barcode: Option<String>,
    pub visible: Option<bool>,
    pub point_eligible: Option<bool>,
    pub display_order: Option<i32>,
    pub comment: Option<String>,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct ProductFilter {
    /// Matches name, product code or barcode
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub visible: Option<bool>,
}

impl CreateProductRequest {
    pub(crate) fn into_active_model(self) -> product::ActiveModel {
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_code: Set(self.product_code),
            external_id: Set(self.external_id),
            name: Set(self.name.trim().to_string()),
            base_name: Set(self.base_name),
            variation_name: Set(self.variation_name),
            category_id: Set(self.category_id),
            price: Set(self.price),
            tax_type: Set(self.tax_type.unwrap_or(TaxType::Exclusive).to_string()),
            tax_rate: Set(self.tax_rate.unwrap_or(10)),
            price_type: Set(self.price_type.unwrap_or(PriceType::Fixed).to_string()),
            unit_type: Set(self.unit_type.unwrap_or(UnitType::Piece).to_string()),
            barcode: Set(self.barcode),
            visible: Set(self.visible.unwrap_or(true)),
            point_eligible: Set(self.point_eligible.unwrap_or(true)),
            display_order: Set(self.display_order.unwrap_or(0)),
            comment: Set(self.comment),
            memo: Set(self.memo),
            ..Default::default()
        }
    }
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    async fn find_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ProductSummary>, u64), ServiceError> {
        let mut query = product::Entity::find();

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(search))
                    .add(product::Column::ProductCode.contains(search))
                    .add(product::Column::Barcode.contains(search)),
            );
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(visible) = filter.visible {
            query = query.filter(product::Column::Visible.eq(visible));
        }

        let paginator = query
            .order_by_asc(product::Column::DisplayOrder)
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((products.into_iter().map(Into::into).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<ProductSummary, ServiceError> {
        Ok(self.find_product(id).await?.into())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductSummary, ServiceError> {
        request.validate()?;
        let product = request.into_active_model().insert(&*self.db_pool).await?;
        info!(product_id = %product.id, "Product created");
        Ok(product.into())
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductSummary, ServiceError> {
        request.validate()?;
        let mut active: product::ActiveModel = self.find_product(id).await?.into();

        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(code) = request.product_code {
            active.product_code = Set(Some(code));
        }
        if let Some(external_id) = request.external_id {
            active.external_id = Set(Some(external_id));
        }
        if let Some(base_name) = request.base_name {
            active.base_name = Set(Some(base_name));
        }
        if let Some(variation) = request.variation_name {
            active.variation_name = Set(Some(variation));
        }
        if let Some(category_id) = request.category_id {
            active.category_id = Set(Some(category_id));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(tax_type) = request.tax_type {
            active.tax_type = Set(tax_type.to_string());
        }
        if let Some(tax_rate) = request.tax_rate {
            active.tax_rate = Set(tax_rate);
        }
        if let Some(price_type) = request.price_type {
            active.price_type = Set(price_type.to_string());
        }
        if let Some(unit_type) = request.unit_type {
            active.unit_type = Set(unit_type.to_string());
        }
        if let Some(barcode) = request.barcode {
            active.barcode = Set(Some(barcode));
        }
        if let Some(visible) = request.visible {
            active.visible = Set(visible);
        }
        if let Some(point_eligible) = request.point_eligible {
            active.point_eligible = Set(point_eligible);
        }
        if let Some(order) = request.display_order {
            active.display_order = Set(order);
        }
        if let Some(comment) = request.comment {
            active.comment = Set(Some(comment));
        }
        if let Some(memo) = request.memo {
            active.memo = Set(Some(memo));
        }

        let product = active.update(&*self.db_pool).await?;
        info!(product_id = %id, "Product updated");
        Ok(product.into())
    }

    #[instrument(skip(self))]
    pub async fn toggle_visibility(&self, id: Uuid) -> Result<ProductSummary, ServiceError> {
        let product = self.find_product(id).await?;
        let visible = !product.visible;
        let mut active: product::ActiveModel = product.into();
        active.visible = Set(visible);
        let product = active.update(&*self.db_pool).await?;
        info!(product_id = %id, visible, "Product visibility toggled");
        Ok(product.into())
    }

    /// Products that appear on reservations are kept; the caller gets a conflict.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        self.find_product(id).await?;

        let references = reservation_item::Entity::find()
            .filter(reservation_item::Column::ProductId.eq(id))
            .count(&*self.db_pool)
            .await?;
        if references > 0 {
            return Err(ServiceError::Conflict(format!(
                "Product {} is referenced by {} reservation item(s)",
                id, references
            )));
        }

        let txn = self.db_pool.begin().await?;
        preset_product::Entity::delete_many()
            .filter(preset_product::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        product::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Every product, in export order.
    pub async fn all_products(&self) -> Result<Vec<product::Model>, ServiceError> {
        Ok(product::Entity::find()
            .order_by_asc(product::Column::DisplayOrder)
            .order_by_asc(product::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> CreateProductRequest {
        CreateProductRequest {
            name: "ビオラ".into(),
            product_code: None,
            external_id: None,
            base_name: None,
            variation_name: None,
            category_id: Some(1),
            price: dec!(198),
            tax_type: None,
            tax_rate: None,
            price_type: None,
            unit_type: None,
            barcode: None,
            visible: None,
            point_eligible: None,
            display_order: None,
            comment: None,
            memo: None,
        }
    }

    #[test]
    fn create_request_rejects_negative_price_and_bad_tax_rate() {
        assert!(request().validate().is_ok());

        let mut negative = request();
        negative.price = dec!(-1);
        assert!(negative.validate().is_err());

        let mut rate = request();
        rate.tax_rate = Some(101);
        assert!(rate.validate().is_err());

        let mut blank = request();
        blank.name = String::new();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn active_model_applies_defaults() {
        let active = request().into_active_model();
        assert_eq!(active.tax_type.as_ref(), "exclusive");
        assert_eq!(*active.tax_rate.as_ref(), 10);
        assert_eq!(active.price_type.as_ref(), "fixed");
        assert_eq!(active.unit_type.as_ref(), "piece");
        assert!(*active.visible.as_ref());
    }
}
