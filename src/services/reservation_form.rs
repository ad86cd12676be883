//! Customer-submitted reservation payload and its validation rules.

use crate::entities::form_settings;
use crate::errors::ServiceError;
use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const MAX_ITEMS: usize = 10;
pub const MAX_QUANTITY: i32 = 99;

pub static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^0\d{1,4}-\d{1,4}-\d{4}$|^0\d{9,10}$").expect("phone pattern is valid")
});
pub static POSTAL_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3}-?\d{4}$").expect("postal code pattern is valid"));

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CustomerInput {
    #[validate(length(min = 1, max = 50, message = "お名前は1〜50文字で入力してください"))]
    pub full_name: String,
    #[validate(length(max = 50, message = "フリガナは50文字以内で入力してください"))]
    pub furigana: Option<String>,
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(email(message = "メールアドレスの形式が正しくありません"))]
    pub email: Option<String>,
    pub line_user_id: Option<String>,
    #[validate(custom = "validate_postal_code")]
    pub postal_code: Option<String>,
    #[validate(length(max = 200))]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// `POST /api/v1/reservations` body.
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct SubmitReservationRequest {
    pub preset_id: Uuid,
    #[validate]
    pub customer: CustomerInput,
    #[validate(length(min = 1, max = 10, message = "商品は1〜10点まで選択できます"))]
    pub items: Vec<ItemInput>,
    /// Either a pickup window of the preset, or an explicit date (with optional times).
    pub pickup_window_id: Option<Uuid>,
    pub pickup_date: Option<NaiveDate>,
    pub pickup_time_start: Option<NaiveTime>,
    pub pickup_time_end: Option<NaiveTime>,
    #[validate(length(max = 500, message = "備考は500文字以内で入力してください"))]
    pub note: Option<String>,
}

/// Optional form fields arrive as `""` when left empty.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.is_empty() || PHONE_RE.is_match(phone) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("電話番号の形式が正しくありません".into());
        Err(err)
    }
}

fn validate_postal_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() || POSTAL_CODE_RE.is_match(code) {
        Ok(())
    } else {
        let mut err = ValidationError::new("postal_code");
        err.message = Some("郵便番号の形式が正しくありません".into());
        Err(err)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl SubmitReservationRequest {
    /// Rules that depend on the preset's form settings, plus per-line quantities.
    pub fn check_form_rules(&self, settings: &form_settings::Model) -> Result<(), ServiceError> {
        let mut problems = Vec::new();

        if self.customer.full_name.trim().is_empty() {
            problems.push("お名前を入力してください".to_string());
        }
        if settings.require_phone && is_blank(&self.customer.phone) {
            problems.push("電話番号を入力してください".to_string());
        }
        if settings.require_furigana && is_blank(&self.customer.furigana) {
            problems.push("フリガナを入力してください".to_string());
        }
        if !settings.allow_note && !is_blank(&self.note) {
            problems.push("このフォームでは備考を受け付けていません".to_string());
        }
        if self
            .items
            .iter()
            .any(|i| i.quantity < 1 || i.quantity > MAX_QUANTITY)
        {
            problems.push(format!("数量は1〜{}で入力してください", MAX_QUANTITY));
        }
        if self.pickup_window_id.is_none() && self.pickup_date.is_none() {
            problems.push("受取日を選択してください".to_string());
        }
        if let (Some(start), Some(end)) = (self.pickup_time_start, self.pickup_time_end) {
            if end <= start {
                problems.push("受取終了時刻は開始時刻より後にしてください".to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::ValidationError(problems.join(", ")))
        }
    }

    /// Quantities per product with duplicate lines merged, in first-seen order.
    pub fn merged_items(&self) -> Result<Vec<(Uuid, i32)>, ServiceError> {
        let mut order = Vec::new();
        let mut totals: BTreeMap<Uuid, i32> = BTreeMap::new();
        for item in &self.items {
            let entry = totals.entry(item.product_id).or_insert_with(|| {
                order.push(item.product_id);
                0
            });
            *entry += item.quantity;
        }

        order
            .into_iter()
            .map(|id| {
                let qty = totals.get(&id).copied().unwrap_or_default();
                if qty > MAX_QUANTITY {
                    Err(ServiceError::ValidationError(format!(
                        "数量は1〜{}で入力してください",
                        MAX_QUANTITY
                    )))
                } else {
                    Ok((id, qty))
                }
            })
            .collect()
    }
}

/// Normalizes `1234567` to `123-4567`.
pub fn normalize_postal_code(code: &str) -> String {
    let digits: String = code.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 7 {
        format!("{}-{}", &digits[..3], &digits[3..])
    } else {
        code.to_string()
    }
}
