//! Pickup availability: which dates a customer can collect their order on.

use crate::entities::pickup_window;
use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AvailableDate {
    pub date: NaiveDate,
    pub windows: Vec<PickupWindowSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PickupWindowSummary {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub pickup_start: chrono::DateTime<chrono::Utc>,
    pub pickup_end: chrono::DateTime<chrono::Utc>,
    #[schema(value_type = Option<String>)]
    pub price: Option<rust_decimal::Decimal>,
    pub comment: Option<String>,
    pub variation: Option<String>,
}

impl From<pickup_window::Model> for PickupWindowSummary {
    fn from(model: pickup_window::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            pickup_start: model.pickup_start,
            pickup_end: model.pickup_end,
            price: model.price,
            comment: model.comment,
            variation: model.variation,
        }
    }
}

/// Keeps windows that apply to the selection: preset-wide windows always,
/// product windows only when their product is selected. An empty selection keeps everything.
pub fn filter_for_products(
    windows: Vec<pickup_window::Model>,
    selected: &[Uuid],
) -> Vec<pickup_window::Model> {
    if selected.is_empty() {
        return windows;
    }
    let selected: HashSet<&Uuid> = selected.iter().collect();
    windows
        .into_iter()
        .filter(|w| w.product_id.map_or(true, |p| selected.contains(&p)))
        .collect()
}

/// Groups windows by the shop-local date of `pickup_start`, dates ascending.
pub fn group_by_date(
    windows: Vec<pickup_window::Model>,
    offset: FixedOffset,
) -> Vec<(NaiveDate, Vec<pickup_window::Model>)> {
    let mut by_date: BTreeMap<NaiveDate, Vec<pickup_window::Model>> = BTreeMap::new();
    for window in windows {
        let date = window.pickup_start.with_timezone(&offset).date_naive();
        by_date.entry(date).or_default().push(window);
    }

    by_date
        .into_iter()
        .map(|(date, mut windows)| {
            windows.sort_by(|a, b| {
                (a.pickup_start, a.pickup_end, a.id).cmp(&(b.pickup_start, b.pickup_end, b.id))
            });
            (date, windows)
        })
        .collect()
}

pub fn available_dates(
    windows: Vec<pickup_window::Model>,
    selected: &[Uuid],
    offset: FixedOffset,
) -> Vec<AvailableDate> {
    group_by_date(filter_for_products(windows, selected), offset)
        .into_iter()
        .map(|(date, windows)| AvailableDate {
            date,
            windows: windows.into_iter().map(Into::into).collect(),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub fn window(
        product_id: Option<Uuid>,
        start: (i32, u32, u32, u32),
        hours: i64,
    ) -> pickup_window::Model {
        let pickup_start = Utc
            .with_ymd_and_hms(start.0, start.1, start.2, start.3, 0, 0)
            .unwrap();
        pickup_window::Model {
            id: Uuid::new_v4(),
            preset_id: Uuid::nil(),
            product_id,
            pickup_start,
            pickup_end: pickup_start + chrono::Duration::hours(hours),
            price: None,
            comment: None,
            variation: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::window;
    use super::*;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn empty_selection_keeps_every_window() {
        let windows = vec![
            window(Some(Uuid::new_v4()), (2025, 3, 1, 1), 2),
            window(None, (2025, 3, 1, 3), 2),
        ];
        assert_eq!(filter_for_products(windows.clone(), &[]).len(), 2);
    }

    #[test]
    fn product_windows_follow_selection() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let windows = vec![
            window(Some(a), (2025, 3, 1, 1), 2),
            window(Some(b), (2025, 3, 1, 3), 2),
            window(None, (2025, 3, 2, 1), 2),
        ];
        let kept = filter_for_products(windows, &[a]);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|w| w.product_id != Some(b)));
    }

    #[test]
    fn dates_follow_shop_time_zone() {
        // 16:00 UTC on the 1st is 01:00 on the 2nd in JST.
        let late = window(None, (2025, 3, 1, 16), 1);
        let early = window(None, (2025, 3, 1, 0), 1);
        let grouped = group_by_date(vec![late, early], jst());
        let dates: Vec<_> = grouped.iter().map(|(d, _)| d.to_string()).collect();
        assert_eq!(dates, vec!["2025-03-01", "2025-03-02"]);
    }

    #[test]
    fn windows_within_a_date_are_sorted_by_start() {
        let later = window(None, (2025, 3, 1, 5), 1);
        let earlier = window(None, (2025, 3, 1, 1), 1);
        let grouped = group_by_date(vec![later.clone(), earlier.clone()], jst());
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].1, vec![earlier, later]);
    }

    #[test]
    fn regrouping_is_idempotent() {
        let windows = vec![
            window(None, (2025, 3, 3, 2), 1),
            window(None, (2025, 3, 1, 2), 1),
            window(None, (2025, 3, 1, 0), 3),
        ];
        let once = group_by_date(windows, jst());
        let flattened: Vec<_> = once.iter().flat_map(|(_, w)| w.clone()).collect();
        assert_eq!(group_by_date(flattened, jst()), once);
    }
}
