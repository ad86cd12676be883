use crate::{
    db::DbPool,
    entities::{
        customer, notification_log::NotificationType, pickup_window, preset_product, product,
        reservation::{self, ReservationStatus},
        reservation_item,
    },
    errors::ServiceError,
    services::{
        form_config,
        notifications::{DispatchOutcome, NotificationService},
        reservation_form::{normalize_postal_code, CustomerInput, SubmitReservationRequest},
    },
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Query, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PriceLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pricing {
    pub lines: Vec<PricedLine>,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

/// The only place reservation amounts are derived:
/// `subtotal = unit_price * quantity`, `final = total - discount`.
pub fn price_lines(lines: Vec<PriceLine>, discount: Decimal) -> Result<Pricing, ServiceError> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;

    for line in lines {
        if line.quantity < 1 {
            return Err(ServiceError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }
        if line.unit_price.is_sign_negative() {
            return Err(ServiceError::InvalidInput(
                "unit price must not be negative".to_string(),
            ));
        }
        let subtotal = line.unit_price * Decimal::from(line.quantity);
        total += subtotal;
        priced.push(PricedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            subtotal,
        });
    }

    let final_amount = discounted_total(total, discount)?;
    Ok(Pricing {
        lines: priced,
        total_amount: total,
        discount_amount: discount,
        final_amount,
    })
}

pub fn discounted_total(total: Decimal, discount: Decimal) -> Result<Decimal, ServiceError> {
    if discount.is_sign_negative() && !discount.is_zero() {
        return Err(ServiceError::InvalidInput(
            "discount must not be negative".to_string(),
        ));
    }
    if discount > total {
        return Err(ServiceError::InvalidInput(
            "discount must not exceed the total amount".to_string(),
        ));
    }
    Ok(total - discount)
}

/// `RSV-YYYYMMDD-XXXXXX`
pub fn generate_reservation_number(date: NaiveDate) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("RSV-{}-{}", date.format("%Y%m%d"), suffix)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ItemDetail {
    pub item: reservation_item::Model,
    pub product_name: Option<String>,
}

/// A reservation with its customer and item lines.
#[derive(Debug, Clone)]
pub struct ReservationDetails {
    pub reservation: reservation::Model,
    pub customer: Option<customer::Model>,
    pub items: Vec<ItemDetail>,
}

pub async fn load_details<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<ReservationDetails, ServiceError> {
    let reservation = reservation::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Reservation", id))?;

    let customer = customer::Entity::find_by_id(reservation.customer_id)
        .one(db)
        .await?;

    let items = reservation_item::Entity::find()
        .filter(reservation_item::Column::ReservationId.eq(id))
        .find_also_related(product::Entity)
        .all(db)
        .await?
        .into_iter()
        .map(|(item, product)| ItemDetail {
            item,
            product_name: product.map(|p| p.name),
        })
        .collect();

    Ok(ReservationDetails {
        reservation,
        customer,
        items,
    })
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

pub(crate) fn status_label(status: &str) -> &'static str {
    status
        .parse::<ReservationStatus>()
        .map(|s| s.label())
        .unwrap_or("不明")
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub full_name: String,
    pub furigana: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub line_user_id: Option<String>,
    pub postal_code: Option<String>,
    pub address: Option<String>,
}

impl From<customer::Model> for CustomerSummary {
    fn from(model: customer::Model) -> Self {
        Self {
            id: model.id,
            full_name: model.full_name,
            furigana: model.furigana,
            phone: model.phone,
            email: model.email,
            line_user_id: model.line_user_id,
            postal_code: model.postal_code,
            address: model.address,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationItemView {
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl From<ItemDetail> for ReservationItemView {
    fn from(detail: ItemDetail) -> Self {
        Self {
            product_id: detail.item.product_id,
            product_name: detail.product_name,
            quantity: detail.item.quantity,
            unit_price: detail.item.unit_price,
            subtotal: detail.item.subtotal,
        }
    }
}

/// Full admin view of a reservation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationView {
    pub id: Uuid,
    pub reservation_number: String,
    pub preset_id: Option<Uuid>,
    pub status: String,
    pub status_label: String,
    pub reservation_date: NaiveDate,
    pub pickup_time_start: Option<NaiveTime>,
    pub pickup_time_end: Option<NaiveTime>,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub notes: Option<String>,
    pub admin_notes: Option<String>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    pub confirmation_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub customer: Option<CustomerSummary>,
    pub items: Vec<ReservationItemView>,
}

impl From<ReservationDetails> for ReservationView {
    fn from(details: ReservationDetails) -> Self {
        let r = details.reservation;
        Self {
            status_label: status_label(&r.status).to_string(),
            id: r.id,
            reservation_number: r.reservation_number,
            preset_id: r.preset_id,
            status: r.status,
            reservation_date: r.reservation_date,
            pickup_time_start: r.pickup_time_start,
            pickup_time_end: r.pickup_time_end,
            total_amount: r.total_amount,
            discount_amount: r.discount_amount,
            final_amount: r.final_amount,
            notes: r.notes,
            admin_notes: r.admin_notes,
            reminder_sent_at: r.reminder_sent_at,
            confirmation_sent_at: r.confirmation_sent_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
            customer: details.customer.map(Into::into),
            items: details.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// What a customer may see about their own reservation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicReservationView {
    pub id: Uuid,
    pub reservation_number: String,
    pub status: String,
    pub status_label: String,
    pub reservation_date: NaiveDate,
    pub pickup_time_start: Option<NaiveTime>,
    pub pickup_time_end: Option<NaiveTime>,
    pub items: Vec<ReservationItemView>,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

impl From<ReservationDetails> for PublicReservationView {
    fn from(details: ReservationDetails) -> Self {
        let r = details.reservation;
        Self {
            status_label: status_label(&r.status).to_string(),
            id: r.id,
            reservation_number: r.reservation_number,
            status: r.status,
            reservation_date: r.reservation_date,
            pickup_time_start: r.pickup_time_start,
            pickup_time_end: r.pickup_time_end,
            items: details.items.into_iter().map(Into::into).collect(),
            total_amount: r.total_amount,
            discount_amount: r.discount_amount,
            final_amount: r.final_amount,
        }
    }
}

/// Row of the admin reservation list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationSummary {
    pub id: Uuid,
    pub reservation_number: String,
    pub status: String,
    pub status_label: String,
    pub reservation_date: NaiveDate,
    pub pickup_time_start: Option<NaiveTime>,
    pub pickup_time_end: Option<NaiveTime>,
    pub final_amount: Decimal,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<(reservation::Model, Option<customer::Model>)> for ReservationSummary {
    fn from((r, c): (reservation::Model, Option<customer::Model>)) -> Self {
        Self {
            status_label: status_label(&r.status).to_string(),
            id: r.id,
            reservation_number: r.reservation_number,
            status: r.status,
            reservation_date: r.reservation_date,
            pickup_time_start: r.pickup_time_start,
            pickup_time_end: r.pickup_time_end,
            final_amount: r.final_amount,
            customer_name: c.as_ref().map(|c| c.full_name.clone()),
            customer_phone: c.and_then(|c| c.phone),
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
}

impl ReservationFilter {
    /// `all` (or nothing) means no status filter.
    pub fn parse_status(raw: Option<&str>) -> Result<Option<ReservationStatus>, ServiceError> {
        match raw.map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(s) => s
                .parse()
                .map(Some)
                .map_err(|_| ServiceError::InvalidStatus(format!("unknown status '{}'", s))),
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Reservation lifecycle for both the public form and the admin screens.
#[derive(Clone)]
pub struct ReservationService {
    db_pool: Arc<DbPool>,
    notifications: Arc<NotificationService>,
    shop_offset: FixedOffset,
}

impl ReservationService {
    pub fn new(
        db_pool: Arc<DbPool>,
        notifications: Arc<NotificationService>,
        shop_offset: FixedOffset,
    ) -> Self {
        Self {
            db_pool,
            notifications,
            shop_offset,
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.shop_offset).date_naive()
    }

    /// Creates a reservation from the public form and sends the "received" notice.
    #[instrument(skip(self, request), fields(preset_id = %request.preset_id))]
    pub async fn submit(
        &self,
        request: SubmitReservationRequest,
    ) -> Result<ReservationView, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let (preset, settings) =
            form_config::load_open_form(db, request.preset_id, self.today()).await?;
        request.check_form_rules(&settings)?;
        let merged = request.merged_items()?;

        let offered: HashMap<Uuid, product::Model> = preset_product::Entity::find()
            .filter(preset_product::Column::PresetId.eq(preset.id))
            .filter(preset_product::Column::IsActive.eq(true))
            .find_also_related(product::Entity)
            .all(db)
            .await?
            .into_iter()
            .filter_map(|(_, p)| p.filter(|p| p.visible).map(|p| (p.id, p)))
            .collect();

        let window = match request.pickup_window_id {
            Some(window_id) => Some(
                pickup_window::Entity::find_by_id(window_id)
                    .one(db)
                    .await?
                    .filter(|w| w.preset_id == preset.id)
                    .ok_or_else(|| {
                        ServiceError::ValidationError(
                            "選択された受取日時はこのフォームでは利用できません".to_string(),
                        )
                    })?,
            ),
            None => None,
        };

        let mut lines = Vec::with_capacity(merged.len());
        for (product_id, quantity) in merged {
            let product = offered.get(&product_id).ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "商品 {} はこのフォームでは予約できません",
                    product_id
                ))
            })?;
            let unit_price = window
                .as_ref()
                .filter(|w| w.product_id == Some(product_id))
                .and_then(|w| w.price)
                .unwrap_or(product.price);
            lines.push(PriceLine {
                product_id,
                quantity,
                unit_price,
            });
        }
        let pricing = price_lines(lines, Decimal::ZERO)?;

        let (reservation_date, pickup_time_start, pickup_time_end) = match &window {
            Some(w) => {
                let start = w.pickup_start.with_timezone(&self.shop_offset);
                let end = w.pickup_end.with_timezone(&self.shop_offset);
                (start.date_naive(), Some(start.time()), Some(end.time()))
            }
            None => (
                request.pickup_date.ok_or_else(|| {
                    ServiceError::ValidationError("受取日を選択してください".to_string())
                })?,
                request.pickup_time_start,
                request.pickup_time_end,
            ),
        };

        let txn = db.begin().await?;
        let customer = find_or_create_customer(&txn, &request.customer).await?;
        let reservation_number = self.unused_reservation_number(&txn).await?;

        let reservation_id = Uuid::new_v4();
        reservation::ActiveModel {
            id: Set(reservation_id),
            reservation_number: Set(reservation_number.clone()),
            customer_id: Set(customer.id),
            preset_id: Set(Some(preset.id)),
            reservation_date: Set(reservation_date),
            pickup_time_start: Set(pickup_time_start),
            pickup_time_end: Set(pickup_time_end),
            status: Set(ReservationStatus::Pending.to_string()),
            total_amount: Set(pricing.total_amount),
            discount_amount: Set(pricing.discount_amount),
            final_amount: Set(pricing.final_amount),
            notes: Set(request.note.clone().filter(|n| !n.trim().is_empty())),
            admin_notes: Set(None),
            reminder_sent_at: Set(None),
            confirmation_sent_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for line in &pricing.lines {
            reservation_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                reservation_id: Set(reservation_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                subtotal: Set(line.subtotal),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        info!(
            reservation_id = %reservation_id,
            reservation_number = %reservation_number,
            final_amount = %pricing.final_amount,
            "Reservation submitted"
        );

        if let Err(e) = self
            .notifications
            .dispatch(reservation_id, NotificationType::Received)
            .await
        {
            warn!(reservation_id = %reservation_id, error = %e, "Received notification failed");
        }

        Ok(load_details(db, reservation_id).await?.into())
    }

    async fn unused_reservation_number<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<String, ServiceError> {
        for _ in 0..5 {
            let candidate = generate_reservation_number(self.today());
            let taken = reservation::Entity::find()
                .filter(reservation::Column::ReservationNumber.eq(candidate.as_str()))
                .count(conn)
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
        }
        Err(ServiceError::Conflict(
            "could not allocate a reservation number".to_string(),
        ))
    }

    #[instrument(skip(self))]
    pub async fn get_public(&self, id: Uuid) -> Result<PublicReservationView, ServiceError> {
        Ok(load_details(&*self.db_pool, id).await?.into())
    }

    /// Customer-initiated cancellation; the reservation number acts as the proof of ownership.
    #[instrument(skip(self, reservation_number))]
    pub async fn cancel_by_customer(
        &self,
        id: Uuid,
        reservation_number: &str,
    ) -> Result<PublicReservationView, ServiceError> {
        let db = &*self.db_pool;
        let existing = reservation::Entity::find_by_id(id)
            .one(db)
            .await?
            .filter(|r| r.reservation_number == reservation_number.trim())
            .ok_or_else(|| ServiceError::not_found("Reservation", id))?;

        match existing.status() {
            Some(ReservationStatus::Completed) => {
                return Err(ServiceError::InvalidOperation(
                    "受取済みの予約はキャンセルできません".to_string(),
                ))
            }
            Some(ReservationStatus::Cancelled) => {
                return Ok(load_details(db, id).await?.into());
            }
            _ => {}
        }

        let mut active: reservation::ActiveModel = existing.into();
        active.status = Set(ReservationStatus::Cancelled.to_string());
        active.update(db).await?;
        info!(reservation_id = %id, "Reservation cancelled by customer");

        if let Err(e) = self
            .notifications
            .dispatch(id, NotificationType::Cancellation)
            .await
        {
            warn!(reservation_id = %id, error = %e, "Cancellation notification failed");
        }

        Ok(load_details(db, id).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ReservationView, ServiceError> {
        Ok(load_details(&*self.db_pool, id).await?.into())
    }

    /// Admin list, newest first.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ReservationFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<ReservationSummary>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = reservation::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(reservation::Column::Status.eq(status.to_string()));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(reservation::Column::ReservationDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(reservation::Column::ReservationDate.lte(to));
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let matching_customers = Query::select()
                .column(customer::Column::Id)
                .from(customer::Entity)
                .cond_where(
                    Condition::any()
                        .add(customer::Column::FullName.contains(term))
                        .add(customer::Column::Phone.contains(term)),
                )
                .to_owned();
            query = query.filter(
                Condition::any()
                    .add(reservation::Column::ReservationNumber.contains(term))
                    .add(reservation::Column::CustomerId.in_subquery(matching_customers)),
            );
        }

        let paginator = query
            .order_by_desc(reservation::Column::CreatedAt)
            .find_also_related(customer::Entity)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Sets any status. Moving to `confirmed` sends one confirmation notice.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: ReservationStatus,
    ) -> Result<ReservationView, ServiceError> {
        let db = &*self.db_pool;
        let existing = reservation::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Reservation", id))?;
        let previous = existing.status.clone();

        let mut active: reservation::ActiveModel = existing.into();
        active.status = Set(status.to_string());
        active.update(db).await?;
        info!(reservation_id = %id, from = %previous, to = %status, "Reservation status updated");

        if status == ReservationStatus::Confirmed {
            let outcome = self
                .notifications
                .dispatch(id, NotificationType::Confirmation)
                .await?;
            if !outcome.success {
                warn!(reservation_id = %id, "Confirmation notice reached no channel");
            }
        }

        self.get(id).await
    }

    #[instrument(skip(self, admin_notes))]
    pub async fn update_admin_notes(
        &self,
        id: Uuid,
        admin_notes: Option<String>,
    ) -> Result<ReservationView, ServiceError> {
        let db = &*self.db_pool;
        let existing = reservation::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Reservation", id))?;

        let mut active: reservation::ActiveModel = existing.into();
        active.admin_notes = Set(admin_notes.filter(|n| !n.trim().is_empty()));
        active.update(db).await?;

        self.get(id).await
    }

    /// Replaces the discount and re-derives the final amount.
    #[instrument(skip(self))]
    pub async fn apply_discount(
        &self,
        id: Uuid,
        discount: Decimal,
    ) -> Result<ReservationView, ServiceError> {
        let db = &*self.db_pool;
        let existing = reservation::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Reservation", id))?;

        let final_amount = discounted_total(existing.total_amount, discount)?;
        let mut active: reservation::ActiveModel = existing.into();
        active.discount_amount = Set(discount);
        active.final_amount = Set(final_amount);
        active.update(db).await?;
        info!(reservation_id = %id, %discount, %final_amount, "Discount applied");

        self.get(id).await
    }

    #[instrument(skip(self))]
    pub async fn send_reminder(&self, id: Uuid) -> Result<DispatchOutcome, ServiceError> {
        self.notifications
            .dispatch(id, NotificationType::Reminder)
            .await
    }

    #[instrument(skip(self))]
    pub async fn resend_confirmation(&self, id: Uuid) -> Result<DispatchOutcome, ServiceError> {
        self.notifications
            .dispatch(id, NotificationType::Confirmation)
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        reservation_item::Entity::delete_many()
            .filter(reservation_item::Column::ReservationId.eq(id))
            .exec(&txn)
            .await?;
        let result = reservation::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::not_found("Reservation", id));
        }
        txn.commit().await?;

        info!(reservation_id = %id, "Reservation deleted");
        Ok(())
    }

    /// Confirmed or ready reservations for `date` that have not had a reminder yet.
    #[instrument(skip(self))]
    pub async fn due_reminders(&self, date: NaiveDate) -> Result<Vec<Uuid>, ServiceError> {
        let rows = reservation::Entity::find()
            .filter(reservation::Column::ReservationDate.eq(date))
            .filter(reservation::Column::Status.is_in([
                ReservationStatus::Confirmed.to_string(),
                ReservationStatus::Ready.to_string(),
            ]))
            .filter(reservation::Column::ReminderSentAt.is_null())
            .order_by_asc(reservation::Column::PickupTimeStart)
            .all(&*self.db_pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    /// Sends reminders for tomorrow's pickups; returns how many were attempted.
    #[instrument(skip(self))]
    pub async fn send_due_reminders(&self) -> Result<usize, ServiceError> {
        let tomorrow = self
            .today()
            .succ_opt()
            .ok_or_else(|| ServiceError::InternalError("date overflow".to_string()))?;
        let due = self.due_reminders(tomorrow).await?;
        for id in &due {
            if let Err(e) = self.send_reminder(*id).await {
                warn!(reservation_id = %id, error = %e, "Reminder failed");
            }
        }
        Ok(due.len())
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Matches an existing customer by LINE id, then by phone; otherwise creates one.
/// Contact details from the form overwrite stored values when given.
async fn find_or_create_customer<C: ConnectionTrait>(
    conn: &C,
    input: &CustomerInput,
) -> Result<customer::Model, ServiceError> {
    let line_user_id = non_blank(&input.line_user_id);
    let phone = non_blank(&input.phone);
    let postal_code = non_blank(&input.postal_code).map(|p| normalize_postal_code(&p));

    let mut existing = None;
    if let Some(line_id) = &line_user_id {
        existing = customer::Entity::find()
            .filter(customer::Column::LineUserId.eq(line_id.as_str()))
            .one(conn)
            .await?;
    }
    if existing.is_none() {
        if let Some(phone) = &phone {
            existing = customer::Entity::find()
                .filter(customer::Column::Phone.eq(phone.as_str()))
                .one(conn)
                .await?;
        }
    }

    match existing {
        Some(found) => {
            let mut active: customer::ActiveModel = found.into();
            active.full_name = Set(input.full_name.trim().to_string());
            if let Some(v) = non_blank(&input.furigana) {
                active.furigana = Set(Some(v));
            }
            if let Some(v) = phone {
                active.phone = Set(Some(v));
            }
            if let Some(v) = non_blank(&input.email) {
                active.email = Set(Some(v));
            }
            if let Some(v) = line_user_id {
                active.line_user_id = Set(Some(v));
            }
            if let Some(v) = postal_code {
                active.postal_code = Set(Some(v));
            }
            if let Some(v) = non_blank(&input.address) {
                active.address = Set(Some(v));
            }
            Ok(active.update(conn).await?)
        }
        None => Ok(customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set(input.full_name.trim().to_string()),
            furigana: Set(non_blank(&input.furigana)),
            phone: Set(phone),
            email: Set(non_blank(&input.email)),
            line_user_id: Set(line_user_id),
            postal_code: Set(postal_code),
            address: Set(non_blank(&input.address)),
            ..Default::default()
        }
        .insert(conn)
        .await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn line(qty: i32, price: Decimal) -> PriceLine {
        PriceLine {
            product_id: Uuid::new_v4(),
            quantity: qty,
            unit_price: price,
        }
    }

    #[test]
    fn totals_are_derived_from_lines() {
        let pricing = price_lines(vec![line(3, dec!(180)), line(1, dec!(1280))], dec!(100)).unwrap();
        assert_eq!(pricing.lines[0].subtotal, dec!(540));
        assert_eq!(pricing.total_amount, dec!(1820));
        assert_eq!(pricing.final_amount, dec!(1720));
    }

    #[test]
    fn discount_bounds_are_enforced() {
        assert_matches!(
            price_lines(vec![line(1, dec!(500))], dec!(501)),
            Err(ServiceError::InvalidInput(_))
        );
        assert_matches!(
            discounted_total(dec!(500), dec!(-1)),
            Err(ServiceError::InvalidInput(_))
        );
        assert_eq!(discounted_total(dec!(500), dec!(500)).unwrap(), dec!(0));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(price_lines(vec![line(0, dec!(100))], Decimal::ZERO).is_err());
    }

    #[test]
    fn reservation_number_format() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let number = generate_reservation_number(date);
        let re = regex::Regex::new(r"^RSV-20250301-[A-Z0-9]{6}$").unwrap();
        assert!(re.is_match(&number), "{}", number);
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!(ReservationFilter::parse_status(Some("all")).unwrap(), None);
        assert_eq!(ReservationFilter::parse_status(None).unwrap(), None);
        assert_eq!(
            ReservationFilter::parse_status(Some("ready")).unwrap(),
            Some(ReservationStatus::Ready)
        );
        assert_matches!(
            ReservationFilter::parse_status(Some("shipped")),
            Err(ServiceError::InvalidStatus(_))
        );
    }

    #[test]
    fn unknown_status_label() {
        assert_eq!(status_label("confirmed"), "確定");
        assert_eq!(status_label("???"), "不明");
    }
}
