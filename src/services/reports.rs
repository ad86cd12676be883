//! Printable order sheets and daily pickup reports. The browser print dialog turns them into PDFs.

use crate::{
    db::DbPool,
    entities::{customer, reservation, reservation_item},
    errors::ServiceError,
    formatting::{escape_html, format_date, format_time_range, format_yen, time_slot_key},
    services::reservations::{load_details, status_label, ReservationDetails},
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

const UNKNOWN: &str = "不明";
const NOT_SPECIFIED: &str = "未指定";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailyReportRow {
    pub id: Uuid,
    pub reservation_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub pickup_time_start: Option<NaiveTime>,
    pub pickup_time_end: Option<NaiveTime>,
    pub status: String,
    pub item_count: usize,
    pub final_amount: Decimal,
    pub notes: Option<String>,
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_reservations: usize,
    pub total_amount: Decimal,
    pub by_status: BTreeMap<String, u64>,
    pub by_time_slot: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyReport {
    pub summary: DailySummary,
    pub rows: Vec<DailyReportRow>,
}

/// Aggregates rows the way the daily report shows them.
pub fn summarize(date: NaiveDate, rows: &[DailyReportRow]) -> DailySummary {
    let mut by_status = BTreeMap::new();
    let mut by_time_slot = BTreeMap::new();
    let mut total_amount = Decimal::ZERO;

    for row in rows {
        *by_status.entry(row.status.clone()).or_insert(0) += 1;
        *by_time_slot
            .entry(time_slot_key(row.pickup_time_start, row.pickup_time_end))
            .or_insert(0) += 1;
        total_amount += row.final_amount;
    }

    DailySummary {
        date,
        total_reservations: rows.len(),
        total_amount,
        by_status,
        by_time_slot,
    }
}

#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DbPool>,
    shop_name: String,
    shop_offset: FixedOffset,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>, shop_name: impl Into<String>, shop_offset: FixedOffset) -> Self {
        Self {
            db_pool,
            shop_name: shop_name.into(),
            shop_offset,
        }
    }

    fn issued_at(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.shop_offset)
            .format("%Y/%m/%d %H:%M")
            .to_string()
    }

    #[instrument(skip(self))]
    pub async fn order_sheet_html(&self, reservation_id: Uuid) -> Result<String, ServiceError> {
        let details = load_details(&*self.db_pool, reservation_id).await?;
        Ok(self.render_order_sheet(&details, Utc::now()))
    }

    pub fn render_order_sheet(&self, details: &ReservationDetails, now: DateTime<Utc>) -> String {
        let r = &details.reservation;
        let name = details
            .customer
            .as_ref()
            .map(|c| c.full_name.as_str())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNKNOWN);
        let phone = details
            .customer
            .as_ref()
            .and_then(|c| c.phone.as_deref())
            .unwrap_or("");
        let email = details.customer.as_ref().and_then(|c| c.email.as_deref());

        let mut html = String::new();
        let _ = write!(
            html,
            r#"<!DOCTYPE html>
<html lang="ja">
<head>
<meta charset="UTF-8">
<title>注文書 - {number}</title>
<style>
body {{ font-family: 'Helvetica', 'Arial', sans-serif; font-size: 12px; margin: 20px; }}
.header {{ text-align: center; margin-bottom: 30px; }}
.info-grid {{ display: grid; grid-template-columns: 1fr 1fr; gap: 20px; margin-bottom: 20px; }}
.info-section h2 {{ font-size: 16px; border-bottom: 2px solid #333; padding-bottom: 5px; }}
.info-item label {{ font-weight: bold; margin-right: 10px; }}
.items-table {{ width: 100%; border-collapse: collapse; margin-bottom: 20px; }}
.items-table th, .items-table td {{ border: 1px solid #ddd; padding: 8px; text-align: left; }}
.items-table th {{ background-color: #f5f5f5; }}
.number {{ text-align: right; }}
.total-row {{ display: flex; justify-content: space-between; margin-bottom: 5px; }}
.total-row.final {{ font-weight: bold; font-size: 14px; border-top: 2px solid #333; padding-top: 10px; }}
.notes {{ margin-top: 20px; padding: 10px; background-color: #f9f9f9; border-radius: 5px; }}
.footer {{ margin-top: 30px; text-align: center; font-size: 10px; color: #666; }}
</style>
</head>
<body>
<div class="header">
<h1>注文書</h1>
<p>予約番号: {number}</p>
</div>
<div class="info-grid">
<div class="info-section">
<h2>顧客情報</h2>
<div class="info-item"><label>氏名:</label><span>{name}</span></div>
<div class="info-item"><label>電話番号:</label><span>{phone}</span></div>
"#,
            number = escape_html(&r.reservation_number),
            name = escape_html(name),
            phone = escape_html(phone),
        );
        if let Some(email) = email {
            let _ = writeln!(
                html,
                r#"<div class="info-item"><label>メールアドレス:</label><span>{}</span></div>"#,
                escape_html(email)
            );
        }
        let _ = write!(
            html,
            r#"</div>
<div class="info-section">
<h2>予約情報</h2>
<div class="info-item"><label>受取日:</label><span>{date}</span></div>
<div class="info-item"><label>受取時間:</label><span>{time}</span></div>
<div class="info-item"><label>ステータス:</label><span>{status}</span></div>
<div class="info-item"><label>予約日時:</label><span>{created}</span></div>
</div>
</div>
<div class="info-section">
<h2>注文内容</h2>
<table class="items-table">
<thead><tr><th>商品名</th><th class="number">数量</th><th class="number">単価</th><th class="number">小計</th></tr></thead>
<tbody>
"#,
            date = format_date(r.reservation_date),
            time = format_time_range(r.pickup_time_start, r.pickup_time_end),
            status = escape_html(status_label(&r.status)),
            created = self.issued_at(r.created_at),
        );
        for item in &details.items {
            let _ = writeln!(
                html,
                r#"<tr><td>{}</td><td class="number">{}</td><td class="number">{}</td><td class="number">{}</td></tr>"#,
                escape_html(item.product_name.as_deref().unwrap_or(UNKNOWN)),
                item.item.quantity,
                format_yen(item.item.unit_price),
                format_yen(item.item.subtotal),
            );
        }
        let _ = write!(
            html,
            r#"</tbody>
</table>
<div class="total-section">
<div class="total-row"><span>小計:</span><span>{}</span></div>
"#,
            format_yen(r.total_amount)
        );
        if r.discount_amount > Decimal::ZERO {
            let _ = writeln!(
                html,
                r#"<div class="total-row"><span>割引:</span><span>-{}</span></div>"#,
                format_yen(r.discount_amount)
            );
        }
        let _ = write!(
            html,
            r#"<div class="total-row final"><span>合計:</span><span>{}</span></div>
</div>
</div>
"#,
            format_yen(r.final_amount)
        );
        if let Some(notes) = r.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            let _ = writeln!(
                html,
                r#"<div class="notes"><h3>お客様備考</h3><p>{}</p></div>"#,
                escape_html(notes)
            );
        }
        if let Some(notes) = r.admin_notes.as_deref().filter(|n| !n.trim().is_empty()) {
            let _ = writeln!(
                html,
                r#"<div class="notes"><h3>管理メモ</h3><p>{}</p></div>"#,
                escape_html(notes)
            );
        }
        let _ = write!(
            html,
            r#"<div class="footer"><p>{} - 発行日: {}</p></div>
</body>
</html>
"#,
            escape_html(&self.shop_name),
            self.issued_at(now)
        );
        html
    }

    /// Reservations picked up on `date`, earliest slot first.
    #[instrument(skip(self))]
    pub async fn daily_report(&self, date: NaiveDate) -> Result<DailyReport, ServiceError> {
        let db = &*self.db_pool;
        let reservations = reservation::Entity::find()
            .filter(reservation::Column::ReservationDate.eq(date))
            .order_by_asc(reservation::Column::PickupTimeStart)
            .order_by_asc(reservation::Column::CreatedAt)
            .find_also_related(customer::Entity)
            .all(db)
            .await?;

        let ids: Vec<Uuid> = reservations.iter().map(|(r, _)| r.id).collect();
        let mut item_counts: HashMap<Uuid, usize> = HashMap::new();
        if !ids.is_empty() {
            for item in reservation_item::Entity::find()
                .filter(reservation_item::Column::ReservationId.is_in(ids))
                .all(db)
                .await?
            {
                *item_counts.entry(item.reservation_id).or_insert(0) += 1;
            }
        }

        let rows: Vec<DailyReportRow> = reservations
            .into_iter()
            .map(|(r, c)| DailyReportRow {
                item_count: item_counts.get(&r.id).copied().unwrap_or(0),
                id: r.id,
                reservation_number: r.reservation_number,
                customer_name: c
                    .as_ref()
                    .map(|c| c.full_name.clone())
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN.to_string()),
                customer_phone: c.and_then(|c| c.phone).unwrap_or_default(),
                pickup_time_start: r.pickup_time_start,
                pickup_time_end: r.pickup_time_end,
                status: r.status,
                final_amount: r.final_amount,
                notes: r.notes,
                admin_notes: r.admin_notes,
            })
            .collect();

        Ok(DailyReport {
            summary: summarize(date, &rows),
            rows,
        })
    }

    #[instrument(skip(self))]
    pub async fn daily_report_html(&self, date: NaiveDate) -> Result<String, ServiceError> {
        let report = self.daily_report(date).await?;
        Ok(self.render_daily_report(&report, Utc::now()))
    }

    pub fn render_daily_report(&self, report: &DailyReport, now: DateTime<Utc>) -> String {
        let summary = &report.summary;
        let mut html = String::new();
        let _ = write!(
            html,
            r#"<!DOCTYPE html>
<html lang="ja">
<head>
<meta charset="UTF-8">
<title>日次予約レポート - {date}</title>
<style>
body {{ font-family: 'Helvetica', 'Arial', sans-serif; font-size: 12px; margin: 20px; }}
.header {{ text-align: center; margin-bottom: 30px; }}
.summary-grid {{ display: grid; grid-template-columns: 1fr 1fr 1fr; gap: 20px; margin-bottom: 30px; }}
.summary-item {{ background-color: #f5f5f5; padding: 15px; border-radius: 5px; }}
.reservations-table {{ width: 100%; border-collapse: collapse; }}
.reservations-table th, .reservations-table td {{ border: 1px solid #ddd; padding: 8px; text-align: left; font-size: 10px; }}
.reservations-table th {{ background-color: #f5f5f5; }}
.number {{ text-align: right; }}
.status-badge {{ padding: 2px 6px; border-radius: 3px; font-size: 9px; }}
.status-pending {{ background-color: #fef3c7; color: #92400e; }}
.status-confirmed {{ background-color: #d1fae5; color: #065f46; }}
.status-ready {{ background-color: #dbeafe; color: #1e40af; }}
.status-completed {{ background-color: #f3f4f6; color: #374151; }}
.status-cancelled {{ background-color: #fee2e2; color: #991b1b; }}
.footer {{ margin-top: 30px; text-align: center; font-size: 10px; color: #666; }}
</style>
</head>
<body>
<div class="header">
<h1>日次予約レポート</h1>
<p>対象日: {date}</p>
</div>
<div class="summary-grid">
<div class="summary-item">
<h3>予約概要</h3>
<p>総予約数: {count}件</p>
<p>総金額: {total}</p>
</div>
<div class="summary-item">
<h3>ステータス別</h3>
"#,
            date = format_date(summary.date),
            count = summary.total_reservations,
            total = format_yen(summary.total_amount),
        );
        for (status, count) in &summary.by_status {
            let _ = writeln!(html, "<p>{}: {}件</p>", escape_html(status_label(status)), count);
        }
        html.push_str("</div>\n<div class=\"summary-item\">\n<h3>時間帯別</h3>\n");
        for (slot, count) in &summary.by_time_slot {
            let _ = writeln!(html, "<p>{}: {}件</p>", escape_html(slot), count);
        }
        html.push_str(
            r#"</div>
</div>
<table class="reservations-table">
<thead><tr><th>予約番号</th><th>顧客名</th><th>電話番号</th><th>受取時間</th><th>ステータス</th><th>商品数</th><th class="number">金額</th><th>備考</th></tr></thead>
<tbody>
"#,
        );
        for row in &report.rows {
            let pickup = match (row.pickup_time_start, row.pickup_time_end) {
                (Some(_), Some(_)) => time_slot_key(row.pickup_time_start, row.pickup_time_end),
                _ => NOT_SPECIFIED.to_string(),
            };
            let notes = row
                .notes
                .as_deref()
                .filter(|n| !n.trim().is_empty())
                .or(row.admin_notes.as_deref())
                .unwrap_or("");
            let _ = writeln!(
                html,
                r#"<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td><span class="status-badge status-{}">{}</span></td><td>{}</td><td class="number">{}</td><td>{}</td></tr>"#,
                escape_html(&row.reservation_number),
                escape_html(&row.customer_name),
                escape_html(&row.customer_phone),
                pickup,
                escape_html(&row.status),
                escape_html(status_label(&row.status)),
                row.item_count,
                format_yen(row.final_amount),
                escape_html(notes),
            );
        }
        let _ = write!(
            html,
            r#"</tbody>
</table>
<div class="footer"><p>{} - 発行日: {}</p></div>
</body>
</html>
"#,
            escape_html(&self.shop_name),
            self.issued_at(now)
        );
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reservations::ItemDetail;
    use rust_decimal_macros::dec;

    fn service() -> ReportService {
        // Rendering never touches the database.
        let db = sea_orm::DatabaseConnection::Disconnected;
        ReportService::new(
            Arc::new(db),
            "みどり園芸",
            FixedOffset::east_opt(9 * 3600).unwrap(),
        )
    }

    fn row(status: &str, start: Option<u32>, amount: Decimal) -> DailyReportRow {
        DailyReportRow {
            id: Uuid::new_v4(),
            reservation_number: "RSV-20250308-AAAAAA".into(),
            customer_name: "山田".into(),
            customer_phone: "090-1111-2222".into(),
            pickup_time_start: start.and_then(|h| NaiveTime::from_hms_opt(h, 0, 0)),
            pickup_time_end: start.and_then(|h| NaiveTime::from_hms_opt(h + 2, 0, 0)),
            status: status.into(),
            item_count: 1,
            final_amount: amount,
            notes: None,
            admin_notes: Some("<b>要包装</b>".into()),
        }
    }

    fn details(discount: Decimal) -> ReservationDetails {
        let now = Utc::now();
        ReservationDetails {
            reservation: reservation::Model {
                id: Uuid::new_v4(),
                reservation_number: "RSV-20250308-ABC123".into(),
                customer_id: Uuid::new_v4(),
                preset_id: None,
                reservation_date: NaiveDate::from_ymd_opt(2025, 3, 8).unwrap(),
                pickup_time_start: None,
                pickup_time_end: None,
                status: "ready".into(),
                total_amount: dec!(1500),
                discount_amount: discount,
                final_amount: dec!(1500) - discount,
                notes: Some("午前中に伺います".into()),
                admin_notes: None,
                reminder_sent_at: None,
                confirmation_sent_at: None,
                created_at: now,
                updated_at: now,
            },
            customer: None,
            items: vec![ItemDetail {
                item: reservation_item::Model {
                    id: Uuid::new_v4(),
                    reservation_id: Uuid::nil(),
                    product_id: Uuid::new_v4(),
                    quantity: 3,
                    unit_price: dec!(500),
                    subtotal: dec!(1500),
                },
                product_name: Some("ビオラ <紫>".into()),
            }],
        }
    }

    #[test]
    fn summary_counts_status_and_slots() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        let rows = vec![
            row("confirmed", Some(9), dec!(1000)),
            row("confirmed", Some(9), dec!(500)),
            row("pending", None, dec!(250)),
        ];
        let summary = summarize(date, &rows);
        assert_eq!(summary.total_reservations, 3);
        assert_eq!(summary.total_amount, dec!(1750));
        assert_eq!(summary.by_status["confirmed"], 2);
        assert_eq!(summary.by_time_slot["09:00-11:00"], 2);
        assert_eq!(summary.by_time_slot["時間未指定"], 1);
    }

    #[test]
    fn order_sheet_falls_back_and_escapes() {
        let html = service().render_order_sheet(&details(Decimal::ZERO), Utc::now());
        assert!(html.contains("<span>不明</span>"));
        assert!(html.contains("時間未指定"));
        assert!(html.contains("準備完了"));
        assert!(html.contains("ビオラ &lt;紫&gt;"));
        assert!(html.contains("お客様備考"));
        assert!(!html.contains("割引:"));
        assert!(!html.contains("管理メモ"));
        assert!(html.contains("¥1,500"));
    }

    #[test]
    fn order_sheet_shows_discount_when_positive() {
        let html = service().render_order_sheet(&details(dec!(200)), Utc::now());
        assert!(html.contains("<span>割引:</span><span>-¥200</span>"));
        assert!(html.contains("¥1,300"));
    }

    #[test]
    fn daily_report_rows_use_badges_and_admin_note_fallback() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        let rows = vec![row("cancelled", None, dec!(300))];
        let report = DailyReport {
            summary: summarize(date, &rows),
            rows,
        };
        let html = service().render_daily_report(&report, Utc::now());
        assert!(html.contains(r#"status-badge status-cancelled">キャンセル"#));
        assert!(html.contains("<td>未指定</td>"));
        assert!(html.contains("&lt;b&gt;要包装&lt;/b&gt;"));
        assert!(html.contains("対象日: 2025/3/8"));
    }
}
