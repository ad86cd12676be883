//! Product import and export in the shop's two CSV layouts: the native
//! column set and the POS register export with Japanese headers.

use crate::{
    db::DbPool,
    entities::{
        preset_product,
        product::{self, PriceType, TaxType, UnitType},
        product_preset,
    },
    errors::ServiceError,
    services::products::{CreateProductRequest, ProductSummary},
};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

pub const STANDARD_HEADERS: [&str; 16] = [
    "name",
    "external_id",
    "category_id",
    "price",
    "variation",
    "comment",
    "base_name",
    "product_code",
    "barcode",
    "tax_type",
    "tax_rate",
    "price_type",
    "unit_type",
    "visible",
    "point_eligible",
    "memo",
];

pub const POS_HEADERS: [&str; 12] = [
    "カテゴリーID",
    "商品名",
    "価格",
    "バリエーション（種別1）",
    "税設定",
    "適用税率",
    "価格設定",
    "商品コード",
    "バーコード",
    "ポイント付与対象",
    "表示/非表示",
    "備考",
];

const STANDARD_TEMPLATE_ROWS: &str = "\
野菜苗セットA,VEG001,1,1000,,春の野菜苗を詰め合わせ,,VEG001,,exclusive,10,fixed,piece,true,true,トマト・ナス・キュウリ
ビオラ（紫）,FLW001,2,198,紫,寄せ植えに,ビオラ,FLW001,,exclusive,10,fixed,piece,true,true,
ビオラ（黄）,FLW002,2,198,黄,寄せ植えに,ビオラ,FLW002,,exclusive,10,fixed,piece,true,true,
培養土 25L,SOIL001,3,1280,,,,SOIL001,4900000000017,inclusive,10,fixed,piece,true,false,重量物
";

const POS_TEMPLATE_ROWS: &str = "\
3,培養土 25L,1280,通常価格,外税,標準税率,通常,#2000000000619,#2000000000619,対象,表示,園芸用培養土
3,培養土 25L,1180,売出価格,外税,標準税率,通常,#2000000000077,#2000000000077,対象,表示,セール価格
4,腐葉土,0,,内税,標準税率,量り売り,#2000000000053,#2000000000053,対象外,非表示,量り売り
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CsvFormat {
    #[default]
    Standard,
    Pos,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CsvRowError {
    /// Line number in the file, header being line 1
    pub row: usize,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportResult {
    pub format: CsvFormat,
    pub total: usize,
    pub inserted: usize,
    pub errors: Vec<CsvRowError>,
    pub warnings: Vec<String>,
    pub products: Vec<ProductSummary>,
}

/// Splits CSV text into records. Quoted fields may hold commas, doubled
/// quotes and line breaks; blank lines are skipped.
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let text = text.trim_start_matches('\u{feff}');
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            (',', false) => record.push(std::mem::take(&mut field)),
            ('\r', false) => {}
            ('\n', false) => {
                record.push(std::mem::take(&mut field));
                if record.iter().any(|f| !f.trim().is_empty()) {
                    records.push(std::mem::take(&mut record));
                } else {
                    record.clear();
                }
            }
            _ => field.push(c),
        }
    }
    record.push(field);
    if record.iter().any(|f| !f.trim().is_empty()) {
        records.push(record);
    }

    records
        .into_iter()
        .map(|r| r.into_iter().map(|f| f.trim().to_string()).collect())
        .collect()
}

/// Quotes a value when it would otherwise break the record.
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// A data row keyed by header name.
struct Row<'a> {
    line: usize,
    values: HashMap<&'a str, &'a str>,
}

impl<'a> Row<'a> {
    fn get(&self, key: &str) -> Option<&'a str> {
        self.values.get(key).copied().filter(|v| !v.is_empty())
    }

    fn error(&self, field: &str, message: &str) -> CsvRowError {
        CsvRowError {
            row: self.line,
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

fn rows<'a>(records: &'a [Vec<String>]) -> Vec<Row<'a>> {
    let Some((header, data)) = records.split_first() else {
        return Vec::new();
    };
    data.iter()
        .enumerate()
        .map(|(index, record)| Row {
            line: index + 2,
            values: header
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    (
                        h.as_str(),
                        record.get(i).map(String::as_str).unwrap_or(""),
                    )
                })
                .collect(),
        })
        .collect()
}

fn parse_price(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.replace(',', "").trim())
        .ok()
        .filter(|p| !p.is_sign_negative())
        .map(|p| p.round())
}

fn check_name_and_price(
    row: &Row<'_>,
    name_field: &str,
    price_field: &str,
    errors: &mut Vec<CsvRowError>,
) -> Option<(String, Decimal)> {
    let name = match row.get(name_field) {
        None => {
            errors.push(row.error(name_field, "商品名は必須です"));
            None
        }
        Some(n) if n.chars().count() > 100 => {
            errors.push(row.error(name_field, "商品名は100文字以内で入力してください"));
            None
        }
        Some(n) => Some(n.to_string()),
    };
    let price = match row.get(price_field) {
        None => {
            errors.push(row.error(price_field, "価格は必須です"));
            None
        }
        Some(raw) => {
            let price = parse_price(raw);
            if price.is_none() {
                errors.push(row.error(price_field, "正しい価格を入力してください（0以上の数値）"));
            }
            price
        }
    };
    Some((name?, price?))
}

fn standard_row(row: &Row<'_>) -> Result<CreateProductRequest, Vec<CsvRowError>> {
    let mut errors = Vec::new();
    let name_price = check_name_and_price(row, "name", "price", &mut errors);

    let category_id = row.get("category_id").and_then(|raw| {
        let parsed = raw.parse::<i32>().ok().filter(|c| *c >= 1);
        if parsed.is_none() {
            errors.push(row.error("category_id", "カテゴリIDは正の整数で入力してください"));
        }
        parsed
    });
    let tax_rate = row.get("tax_rate").and_then(|raw| {
        let parsed = Decimal::from_str(raw)
            .ok()
            .filter(|r| *r >= Decimal::ZERO && *r <= Decimal::ONE_HUNDRED)
            .and_then(|r| r.round().to_i32());
        if parsed.is_none() {
            errors.push(row.error("tax_rate", "税率は0-100の数値で入力してください"));
        }
        parsed
    });
    let tax_type = row.get("tax_type").and_then(|raw| {
        let parsed = TaxType::from_str(raw).ok();
        if parsed.is_none() {
            errors.push(row.error(
                "tax_type",
                "税タイプはinclusiveまたはexclusiveで入力してください",
            ));
        }
        parsed
    });
    let price_type = row.get("price_type").and_then(|raw| {
        let parsed = PriceType::from_str(raw).ok();
        if parsed.is_none() {
            errors.push(row.error(
                "price_type",
                "価格タイプはfixed、department、weightのいずれかで入力してください",
            ));
        }
        parsed
    });
    let unit_type = row.get("unit_type").and_then(|raw| {
        let parsed = UnitType::from_str(raw).ok();
        if parsed.is_none() {
            errors.push(row.error(
                "unit_type",
                "単位タイプはpiece、kg、gのいずれかで入力してください",
            ));
        }
        parsed
    });

    let Some((mut name, price)) = name_price.filter(|_| errors.is_empty()) else {
        return Err(errors);
    };

    let (base_name, variation_name) = match (row.get("base_name"), row.get("variation")) {
        (Some(base), Some(variation)) => {
            name = format!("{}（{}）", base, variation);
            (Some(base.to_string()), Some(variation.to_string()))
        }
        _ => (None, None),
    };
    let not_false = |key: &str| row.get(key).map_or(true, |v| !v.eq_ignore_ascii_case("false"));

    Ok(CreateProductRequest {
        name,
        product_code: row.get("product_code").map(str::to_string),
        external_id: row.get("external_id").map(str::to_string),
        base_name,
        variation_name,
        category_id,
        price,
        tax_type: Some(tax_type.unwrap_or(TaxType::Exclusive)),
        tax_rate: Some(tax_rate.unwrap_or(10)),
        price_type: Some(price_type.unwrap_or(PriceType::Fixed)),
        unit_type: Some(unit_type.unwrap_or(UnitType::Piece)),
        barcode: row.get("barcode").map(str::to_string),
        visible: Some(not_false("visible")),
        point_eligible: Some(not_false("point_eligible")),
        display_order: None,
        comment: row.get("comment").map(str::to_string),
        memo: row.get("memo").or(row.get("comment")).map(str::to_string),
    })
}

fn pos_row(row: &Row<'_>) -> Result<CreateProductRequest, Vec<CsvRowError>> {
    let mut errors = Vec::new();
    let Some((base, price)) = check_name_and_price(row, "商品名", "価格", &mut errors) else {
        return Err(errors);
    };

    let variation = row.get("バリエーション（種別1）");
    let name = match variation {
        Some(v) => format!("{}（{}）", base, v),
        None => base.clone(),
    };
    let price_type = match row.get("価格設定") {
        Some("部門打ち") => PriceType::Department,
        Some("量り売り") => PriceType::Weight,
        _ => PriceType::Fixed,
    };
    let unit_type = match row.get("単位タイプ") {
        Some("kg") => UnitType::Kg,
        Some("g") => UnitType::G,
        _ => UnitType::Piece,
    };

    Ok(CreateProductRequest {
        name,
        product_code: row.get("商品コード").map(str::to_string),
        external_id: None,
        base_name: variation.map(|_| base),
        variation_name: variation.map(str::to_string),
        category_id: row.get("カテゴリーID").and_then(|c| c.parse().ok()),
        price,
        tax_type: Some(if row.get("税設定") == Some("内税") {
            TaxType::Inclusive
        } else {
            TaxType::Exclusive
        }),
        tax_rate: Some(if row.get("適用税率") == Some("軽減税率") { 8 } else { 10 }),
        price_type: Some(price_type),
        unit_type: Some(unit_type),
        barcode: row.get("バーコード").map(str::to_string),
        visible: Some(row.get("表示/非表示") != Some("非表示")),
        point_eligible: Some(row.get("ポイント付与対象") == Some("対象")),
        display_order: None,
        comment: None,
        memo: row.get("備考").map(str::to_string),
    })
}

/// Validates every row. Products come back only when no row failed.
pub fn parse_products(
    text: &str,
    format: CsvFormat,
) -> (usize, Vec<CreateProductRequest>, Vec<CsvRowError>) {
    let records = parse_records(text);
    let rows = rows(&records);
    let mut products = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();

    for row in &rows {
        let parsed = match format {
            CsvFormat::Standard => standard_row(row),
            CsvFormat::Pos => pos_row(row),
        };
        match parsed {
            Ok(product) => products.push(product),
            Err(row_errors) => errors.extend(row_errors),
        }
    }
    (rows.len(), products, errors)
}

pub fn template(format: CsvFormat) -> String {
    match format {
        CsvFormat::Standard => format!("{}\n{}", STANDARD_HEADERS.join(","), STANDARD_TEMPLATE_ROWS),
        CsvFormat::Pos => format!("{}\n{}", POS_HEADERS.join(","), POS_TEMPLATE_ROWS),
    }
}

/// Standard-format CSV of the given products.
pub fn export_standard(products: &[product::Model]) -> String {
    let mut out = STANDARD_HEADERS.join(",");
    out.push('\n');
    for p in products {
        let fields = [
            p.name.clone(),
            p.external_id.clone().unwrap_or_default(),
            p.category_id.map(|c| c.to_string()).unwrap_or_default(),
            p.price.to_string(),
            p.variation_name.clone().unwrap_or_default(),
            p.comment.clone().unwrap_or_default(),
            p.base_name.clone().unwrap_or_default(),
            p.product_code.clone().unwrap_or_default(),
            p.barcode.clone().unwrap_or_default(),
            p.tax_type.clone(),
            p.tax_rate.to_string(),
            p.price_type.clone(),
            p.unit_type.clone(),
            p.visible.to_string(),
            p.point_eligible.to_string(),
            p.memo.clone().unwrap_or_default(),
        ];
        let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

#[derive(Clone)]
pub struct CsvImportService {
    db_pool: Arc<DbPool>,
}

impl CsvImportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Inserts all rows or none. Linking to a preset appends the new
    /// products in file order.
    #[instrument(skip(self, text), fields(bytes = text.len()))]
    pub async fn import(
        &self,
        text: &str,
        format: CsvFormat,
        preset_id: Option<Uuid>,
    ) -> Result<ImportResult, ServiceError> {
        let (total, requests, errors) = parse_products(text, format);
        let mut result = ImportResult {
            format,
            total,
            inserted: 0,
            errors,
            warnings: Vec::new(),
            products: Vec::new(),
        };

        if total == 0 {
            result.warnings.push("取り込むデータ行がありません".to_string());
            return Ok(result);
        }
        if !result.errors.is_empty() {
            warn!(errors = result.errors.len(), "CSV import rejected");
            return Ok(result);
        }

        let txn = self.db_pool.begin().await?;
        if let Some(preset_id) = preset_id {
            product_preset::Entity::find_by_id(preset_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("Preset", preset_id))?;
        }

        let mut inserted = Vec::with_capacity(requests.len());
        for request in requests {
            inserted.push(request.into_active_model().insert(&txn).await?);
        }

        if let Some(preset_id) = preset_id {
            for (index, product) in inserted.iter().enumerate() {
                preset_product::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    preset_id: Set(preset_id),
                    product_id: Set(product.id),
                    pickup_start: Set(None),
                    pickup_end: Set(None),
                    display_order: Set(index as i32 + 1),
                    is_active: Set(true),
                }
                .insert(&txn)
                .await?;
            }
            result
                .warnings
                .push(format!("{}個の商品をプリセットに関連付けました", inserted.len()));
        }
        txn.commit().await?;

        result.inserted = inserted.len();
        result.products = inserted.into_iter().map(Into::into).collect();
        info!(inserted = result.inserted, format = %format, "Products imported from CSV");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parser_handles_quotes_crlf_and_blank_lines() {
        let text = "\u{feff}name,memo\r\n\"鉢, 大\",\"say \"\"hi\"\"\"\r\n\r\nplain,\"two\nlines\"\n";
        let records = parse_records(text);
        assert_eq!(records.len(), 3);
        assert_eq!(records[1], vec!["鉢, 大", "say \"hi\""]);
        assert_eq!(records[2][1], "two\nlines");
    }

    #[test]
    fn escape_quotes_only_when_needed() {
        assert_eq!(escape_field("ビオラ"), "ビオラ");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn standard_template_parses_cleanly() {
        let (total, products, errors) = parse_products(&template(CsvFormat::Standard), CsvFormat::Standard);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(total, 4);
        assert_eq!(products[1].name, "ビオラ（紫）");
        assert_eq!(products[1].base_name.as_deref(), Some("ビオラ"));
        assert_eq!(products[3].tax_type, Some(TaxType::Inclusive));
        assert_eq!(products[3].point_eligible, Some(false));
        assert_eq!(products[0].memo.as_deref(), Some("トマト・ナス・キュウリ"));
    }

    #[test]
    fn standard_rows_report_each_bad_field_with_line_number() {
        let text = "name,price,category_id,tax_rate,tax_type,price_type,unit_type\n\
                    ok,100,1,10,exclusive,fixed,piece\n\
                    ,-5,0,120,both,bulk,box\n";
        let (total, _, errors) = parse_products(text, CsvFormat::Standard);
        assert_eq!(total, 2);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["name", "price", "category_id", "tax_rate", "tax_type", "price_type", "unit_type"]
        );
        assert!(errors.iter().all(|e| e.row == 3));
    }

    #[test]
    fn standard_memo_falls_back_to_comment() {
        let text = "name,price,comment\n鉢,500,素焼き\n";
        let (_, products, _) = parse_products(text, CsvFormat::Standard);
        assert_eq!(products[0].memo.as_deref(), Some("素焼き"));
        assert_eq!(products[0].price, dec!(500));
        assert_eq!(products[0].visible, Some(true));
    }

    #[test]
    fn pos_rows_map_japanese_settings() {
        let (total, products, errors) = parse_products(&template(CsvFormat::Pos), CsvFormat::Pos);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(total, 3);

        let first = &products[0];
        assert_eq!(first.name, "培養土 25L（通常価格）");
        assert_eq!(first.variation_name.as_deref(), Some("通常価格"));
        assert_eq!(first.tax_type, Some(TaxType::Exclusive));
        assert_eq!(first.tax_rate, Some(10));
        assert_eq!(first.point_eligible, Some(true));

        let bulk = &products[2];
        assert_eq!(bulk.name, "腐葉土");
        assert!(bulk.base_name.is_none());
        assert_eq!(bulk.tax_type, Some(TaxType::Inclusive));
        assert_eq!(bulk.price_type, Some(PriceType::Weight));
        assert_eq!(bulk.visible, Some(false));
        assert_eq!(bulk.point_eligible, Some(false));
    }

    #[test]
    fn pos_reduced_rate_and_missing_price() {
        let text = "商品名,価格,適用税率\n野菜苗,98,軽減税率\n肥料,,\n";
        let (_, products, errors) = parse_products(text, CsvFormat::Pos);
        assert_eq!(products[0].tax_rate, Some(8));
        assert_eq!(
            errors,
            vec![CsvRowError {
                row: 3,
                field: "価格".into(),
                message: "価格は必須です".into()
            }]
        );
    }
}
