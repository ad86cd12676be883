//! Property-based tests for pricing, availability grouping and CSV handling.

use chrono::{Duration, FixedOffset, TimeZone, Utc};
use nursery_reserve::{
    entities::pickup_window,
    formatting::format_yen,
    services::{
        availability::{available_dates, filter_for_products},
        csv_import::{escape_field, parse_records},
        reservations::{discounted_total, generate_reservation_number, price_lines, PriceLine},
    },
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

fn line_strategy() -> impl Strategy<Value = (i32, u32)> {
    (1i32..50, 0u32..100_000)
}

fn window_at(product_id: Option<Uuid>, minutes_from_epoch: i64) -> pickup_window::Model {
    let pickup_start = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()
        + Duration::minutes(minutes_from_epoch);
    pickup_window::Model {
        id: Uuid::new_v4(),
        preset_id: Uuid::nil(),
        product_id,
        pickup_start,
        pickup_end: pickup_start + Duration::hours(2),
        price: None,
        comment: None,
        variation: None,
        created_at: Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn totals_are_the_sum_of_subtotals(
        lines in prop::collection::vec(line_strategy(), 1..10),
        discount_share in 0u32..=100,
    ) {
        let lines: Vec<PriceLine> = lines
            .into_iter()
            .map(|(quantity, price)| PriceLine {
                product_id: Uuid::new_v4(),
                quantity,
                unit_price: Decimal::from(price),
            })
            .collect();
        let expected: Decimal = lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        let discount = (expected * Decimal::from(discount_share) / Decimal::from(100)).floor();

        let pricing = price_lines(lines, discount).unwrap();
        let subtotals: Decimal = pricing.lines.iter().map(|l| l.subtotal).sum();
        prop_assert_eq!(pricing.total_amount, expected);
        prop_assert_eq!(subtotals, expected);
        prop_assert_eq!(pricing.final_amount, expected - discount);
        prop_assert!(!pricing.final_amount.is_sign_negative() || pricing.final_amount.is_zero());
    }

    #[test]
    fn discount_above_total_is_rejected(total in 0u32..1_000_000, excess in 1u32..1_000) {
        let total = Decimal::from(total);
        prop_assert!(discounted_total(total, total + Decimal::from(excess)).is_err());
        prop_assert!(discounted_total(total, -Decimal::from(excess)).is_err());
        prop_assert_eq!(discounted_total(total, total).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn non_positive_quantities_are_rejected(quantity in -100i32..=0) {
        let line = PriceLine {
            product_id: Uuid::new_v4(),
            quantity,
            unit_price: Decimal::from(100),
        };
        prop_assert!(price_lines(vec![line], Decimal::ZERO).is_err());
    }

    #[test]
    fn available_dates_are_sorted_and_keep_every_window(
        offsets in prop::collection::vec(0i64..(60 * 24 * 30), 0..40),
        offset_hours in -12i32..=14,
    ) {
        let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();
        let windows: Vec<_> = offsets.iter().map(|m| window_at(None, *m)).collect();

        let dates = available_dates(windows, &[], offset);
        let kept: usize = dates.iter().map(|d| d.windows.len()).sum();
        prop_assert_eq!(kept, offsets.len());
        prop_assert!(dates.windows(2).all(|pair| pair[0].date < pair[1].date));
        for day in &dates {
            prop_assert!(day
                .windows
                .iter()
                .all(|w| w.pickup_start.with_timezone(&offset).date_naive() == day.date));
            prop_assert!(day.windows.windows(2).all(|p| p[0].pickup_start <= p[1].pickup_start));
        }
    }

    #[test]
    fn product_windows_follow_the_selection(
        shared in 0usize..5,
        own in 0usize..5,
        other in 0usize..5,
    ) {
        let chosen = Uuid::new_v4();
        let unrelated = Uuid::new_v4();
        let mut windows = Vec::new();
        windows.extend((0..shared).map(|i| window_at(None, i as i64 * 60)));
        windows.extend((0..own).map(|i| window_at(Some(chosen), i as i64 * 60)));
        windows.extend((0..other).map(|i| window_at(Some(unrelated), i as i64 * 60)));

        prop_assert_eq!(filter_for_products(windows.clone(), &[chosen]).len(), shared + own);
        prop_assert_eq!(filter_for_products(windows, &[]).len(), shared + own + other);
    }

    #[test]
    fn escaped_fields_parse_back(fields in prop::collection::vec("[a-zあ-ん ,\"\n]{0,12}", 1..6)) {
        let line = fields.iter().map(|f| escape_field(f)).collect::<Vec<_>>().join(",");
        let text = format!("h\n{}\n", line);
        let records = parse_records(&text);

        let expected: Vec<String> = fields.iter().map(|f| f.trim().to_string()).collect();
        if expected.iter().any(|f| !f.is_empty()) {
            prop_assert_eq!(records.len(), 2);
            prop_assert_eq!(&records[1], &expected);
        }
    }

    #[test]
    fn yen_formatting_groups_thousands(amount in 0u64..10_000_000_000) {
        let formatted = format_yen(Decimal::from(amount));
        prop_assert!(formatted.starts_with('¥'));
        let digits: String = formatted.chars().filter(|c| c.is_ascii_digit()).collect();
        prop_assert_eq!(digits, amount.to_string());
        for group in formatted.trim_start_matches('¥').split(',').skip(1) {
            prop_assert_eq!(group.len(), 3);
        }
    }
}

#[test]
fn reservation_numbers_carry_the_date() {
    let date = chrono::NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
    let number = generate_reservation_number(date);
    assert!(number.starts_with("RSV-20250309-"));
    assert_eq!(number.len(), "RSV-20250309-".len() + 6);
}
