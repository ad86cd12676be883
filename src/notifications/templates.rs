use super::NotificationContent;
use crate::entities::notification_log::NotificationType;
use crate::formatting::{display_name, format_date, format_time_range, format_yen};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use std::fmt::Write as _;

#[derive(Debug, Clone)]
pub struct TemplateItem {
    pub name: String,
    pub quantity: i32,
}

/// Reservation data a message is rendered from.
#[derive(Debug, Clone)]
pub struct MessageContext {
    pub shop_name: String,
    pub reservation_number: String,
    pub customer_name: Option<String>,
    pub reservation_date: NaiveDate,
    pub pickup_time_start: Option<NaiveTime>,
    pub pickup_time_end: Option<NaiveTime>,
    pub items: Vec<TemplateItem>,
    pub final_amount: Decimal,
}

pub fn subject(kind: NotificationType, reservation_number: &str) -> String {
    let tag = match kind {
        NotificationType::Received => "予約受付",
        NotificationType::Confirmation => "予約確定",
        NotificationType::Reminder => "受取リマインダー",
        NotificationType::Cancellation => "予約キャンセル",
    };
    format!("【{}】{}", tag, reservation_number)
}

pub fn render(kind: NotificationType, ctx: &MessageContext) -> NotificationContent {
    let message = match kind {
        NotificationType::Received => received(ctx),
        NotificationType::Confirmation => confirmation(ctx),
        NotificationType::Reminder => reminder(ctx),
        NotificationType::Cancellation => cancellation(ctx),
    };
    NotificationContent {
        subject: subject(kind, &ctx.reservation_number),
        message,
    }
}

fn pickup_block(ctx: &MessageContext) -> String {
    format!(
        "■予約番号: {}\n■受取日: {}\n■受取時間: {}",
        ctx.reservation_number,
        format_date(ctx.reservation_date),
        format_time_range(ctx.pickup_time_start, ctx.pickup_time_end),
    )
}

fn item_lines(ctx: &MessageContext) -> String {
    let mut out = String::new();
    for item in &ctx.items {
        let _ = writeln!(out, "・{} × {}個", item.name, item.quantity);
    }
    out.trim_end().to_string()
}

fn greeting(ctx: &MessageContext) -> String {
    format!("{} 様", display_name(ctx.customer_name.as_deref()))
}

fn received(ctx: &MessageContext) -> String {
    format!(
        "【ご予約受付のお知らせ】\n\n{}\n\nご予約を受け付けました。\n内容を確認のうえ、確定のご連絡をお送りします。\n\n{}\n\n■ご注文内容:\n{}\n\n■合計金額: {}\n\n{}",
        greeting(ctx),
        pickup_block(ctx),
        item_lines(ctx),
        format_yen(ctx.final_amount),
        ctx.shop_name,
    )
}

fn confirmation(ctx: &MessageContext) -> String {
    format!(
        "【予約確定のお知らせ】\n\n{}\n\nご予約いただきありがとうございます。\n以下の内容で予約が確定いたしました。\n\n{}\n\n■ご注文内容:\n{}\n\n■合計金額: {}\n\n受取日にお越しください。\nご不明な点がございましたらお気軽にお問い合わせください。\n\n{}",
        greeting(ctx),
        pickup_block(ctx),
        item_lines(ctx),
        format_yen(ctx.final_amount),
        ctx.shop_name,
    )
}

fn reminder(ctx: &MessageContext) -> String {
    format!(
        "【受取リマインダー】\n\n{}\n\n明日は商品の受取日です。\n\n{}\n\nお忘れのないようお気をつけてお越しください。\n\n{}",
        greeting(ctx),
        pickup_block(ctx),
        ctx.shop_name,
    )
}

fn cancellation(ctx: &MessageContext) -> String {
    format!(
        "【予約キャンセルのお知らせ】\n\n{}\n\n以下のご予約をキャンセルいたしました。\n\n{}\n\nまたのご利用をお待ちしております。\n\n{}",
        greeting(ctx),
        pickup_block(ctx),
        ctx.shop_name,
    )
}
