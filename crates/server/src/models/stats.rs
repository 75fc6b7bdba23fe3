//! Dashboard figures and chart series.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use hire_purchase_core::{BusinessId, Money, PurchaseStatus, ShopId};

/// Whose numbers are being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsScope {
    Business(BusinessId),
    Shop(ShopId),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShopStats {
    pub customers: i64,
    pub open_purchases: i64,
    pub overdue_purchases: i64,
    pub outstanding: Money,
    pub collected_this_month: Money,
    pub pending_count: i64,
    pub pending_amount: Money,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BusinessStats {
    pub shops: i64,
    pub active_shops: i64,
    pub customers: i64,
    pub open_purchases: i64,
    pub overdue_purchases: i64,
    pub outstanding: Money,
    pub collected_this_month: Money,
    pub pending_count: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectorStats {
    pub assigned_customers: i64,
    pub collected_today: Money,
    pub collected_this_month: Money,
    pub pending_count: i64,
    pub pending_amount: Money,
}

/// One bar of the purchase status chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSlice {
    pub status: PurchaseStatus,
    pub label: &'static str,
    pub count: i64,
    /// Whole percent of all purchases, 0-100.
    pub percent: u32,
}

impl StatusSlice {
    /// One slice per status, in lifecycle order, including empty ones.
    #[must_use]
    pub fn breakdown(counts: &[(PurchaseStatus, i64)]) -> Vec<Self> {
        let total: i64 = counts.iter().map(|(_, n)| *n).sum();
        PurchaseStatus::ALL
            .into_iter()
            .map(|status| {
                let count = counts
                    .iter()
                    .filter(|(s, _)| *s == status)
                    .map(|(_, n)| *n)
                    .sum();
                let percent = if total > 0 {
                    u32::try_from((count * 100 + total / 2) / total).unwrap_or(0)
                } else {
                    0
                };
                Self {
                    status,
                    label: status.label(),
                    count,
                    percent,
                }
            })
            .collect()
    }
}

/// Confirmed collections in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTotal {
    /// First day of the month.
    pub month: NaiveDate,
    pub label: String,
    pub amount: Money,
    /// Bar height relative to the largest month, 0-100.
    pub percent: u32,
}

impl MonthlyTotal {
    /// The last `months` calendar months ending with the month of `today`,
    /// oldest first; months without collections are zero.
    #[must_use]
    pub fn series(rows: &[(NaiveDate, Money)], today: NaiveDate, months: u32) -> Vec<Self> {
        let current = today.with_day(1).unwrap_or(today);
        let starts: Vec<NaiveDate> = (0..months)
            .rev()
            .filter_map(|back| current.checked_sub_months(Months::new(back)))
            .collect();

        let amounts: Vec<Money> = starts
            .iter()
            .map(|start| {
                rows.iter()
                    .filter(|(month, _)| month.year() == start.year() && month.month() == start.month())
                    .map(|(_, amount)| *amount)
                    .sum()
            })
            .collect();
        let peak = amounts.iter().copied().max().unwrap_or(Money::ZERO);

        starts
            .into_iter()
            .zip(amounts)
            .map(|(month, amount)| Self {
                month,
                label: month.format("%b %Y").to_string(),
                amount,
                percent: relative_percent(amount, peak),
            })
            .collect()
    }
}

fn relative_percent(amount: Money, peak: Money) -> u32 {
    if !peak.is_positive() {
        return 0;
    }
    let ratio = amount.amount() * Decimal::ONE_HUNDRED / peak.amount();
    ratio.round().to_u32().unwrap_or(0)
}

/// Payload of the dashboard chart endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSeries {
    pub statuses: Vec<StatusSlice>,
    pub monthly: Vec<MonthlyTotal>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_breakdown_covers_every_status() {
        let slices = StatusSlice::breakdown(&[
            (PurchaseStatus::Active, 3),
            (PurchaseStatus::Overdue, 1),
        ]);
        assert_eq!(slices.len(), 5);
        let active = slices.iter().find(|s| s.status == PurchaseStatus::Active).unwrap();
        assert_eq!(active.count, 3);
        assert_eq!(active.percent, 75);
        let pending = slices.iter().find(|s| s.status == PurchaseStatus::Pending).unwrap();
        assert_eq!(pending.percent, 0);
    }

    #[test]
    fn test_breakdown_empty() {
        assert!(StatusSlice::breakdown(&[]).iter().all(|s| s.percent == 0));
    }

    #[test]
    fn test_series_fills_missing_months() {
        let rows = [
            (date(2025, 1, 1), Money::from_major(200)),
            (date(2025, 3, 1), Money::from_major(400)),
        ];
        let series = MonthlyTotal::series(&rows, date(2025, 3, 18), 6);
        assert_eq!(series.len(), 6);
        assert_eq!(series[0].label, "Oct 2024");
        assert_eq!(series[3].amount, Money::from_major(200));
        assert_eq!(series[3].percent, 50);
        assert_eq!(series[4].amount, Money::ZERO);
        assert_eq!(series[5].percent, 100);
    }
}
