//! Installment schedules.
//!
//! A schedule splits the financed balance (total less down payment) into
//! equal installments. Due dates are always computed from the first due date,
//! never chained, so a monthly plan starting on the 31st falls on the last day
//! of short months and returns to the 31st afterwards.

use chrono::{Days, Months, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::types::{InstallmentFrequency, Money};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("installment {number} falls outside the supported calendar")]
    DateOutOfRange { number: u32 },
}

/// One scheduled installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Installment {
    /// 1-based position in the schedule.
    pub number: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
}

/// Repayment state of one installment, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstallmentProgress {
    pub installment: Installment,
    pub paid: Money,
    pub is_paid: bool,
    pub is_overdue: bool,
}

/// Ordered installments of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InstallmentSchedule {
    installments: Vec<Installment>,
}

/// Due date of the installment at `index` (0-based).
#[must_use]
pub fn due_date(
    first_due_date: NaiveDate,
    frequency: InstallmentFrequency,
    index: u32,
) -> Option<NaiveDate> {
    match frequency {
        InstallmentFrequency::Weekly => {
            first_due_date.checked_add_days(Days::new(7 * u64::from(index)))
        }
        InstallmentFrequency::Biweekly => {
            first_due_date.checked_add_days(Days::new(14 * u64::from(index)))
        }
        InstallmentFrequency::Monthly => first_due_date.checked_add_months(Months::new(index)),
    }
}

impl InstallmentSchedule {
    /// Split `financed` into `count` installments.
    ///
    /// Every installment is `financed / count` rounded to cents; the last one
    /// takes whatever remains so the schedule always sums to `financed`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::DateOutOfRange`] if a due date overflows.
    pub fn build(
        financed: Money,
        count: u32,
        frequency: InstallmentFrequency,
        first_due_date: NaiveDate,
    ) -> Result<Self, ScheduleError> {
        let financed = financed.rounded().non_negative();
        let share = financed.share(count);
        let mut remaining = financed;
        let mut installments = Vec::with_capacity(count as usize);

        for index in 0..count {
            let number = index + 1;
            let due = due_date(first_due_date, frequency, index)
                .ok_or(ScheduleError::DateOutOfRange { number })?;
            let amount = if number == count {
                remaining
            } else {
                share.min(remaining)
            };
            remaining -= amount;
            installments.push(Installment {
                number,
                due_date: due,
                amount,
            });
        }

        Ok(Self { installments })
    }

    #[must_use]
    pub fn installments(&self) -> &[Installment] {
        &self.installments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.installments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.installments.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> Money {
        self.installments.iter().map(|i| i.amount).sum()
    }

    #[must_use]
    pub fn last_due_date(&self) -> Option<NaiveDate> {
        self.installments.last().map(|i| i.due_date)
    }

    /// Sum of installments due strictly before `date`.
    #[must_use]
    pub fn amount_due_by(&self, date: NaiveDate) -> Money {
        self.installments
            .iter()
            .filter(|i| i.due_date < date)
            .map(|i| i.amount)
            .sum()
    }

    /// Installment money due before `date` that `installment_paid` does not cover.
    #[must_use]
    pub fn arrears(&self, installment_paid: Money, date: NaiveDate) -> Money {
        (self.amount_due_by(date) - installment_paid).non_negative()
    }

    /// First installment not fully covered by `installment_paid`.
    #[must_use]
    pub fn next_due(&self, installment_paid: Money) -> Option<&Installment> {
        let mut covered = Money::ZERO;
        self.installments.iter().find(|installment| {
            covered += installment.amount;
            covered > installment_paid
        })
    }

    /// Allocate `installment_paid` to installments in order.
    #[must_use]
    pub fn progress(&self, installment_paid: Money, today: NaiveDate) -> Vec<InstallmentProgress> {
        let mut left = installment_paid.non_negative();
        self.installments
            .iter()
            .map(|installment| {
                let paid = installment.amount.min(left);
                left -= paid;
                let is_paid = paid == installment.amount;
                InstallmentProgress {
                    installment: *installment,
                    paid,
                    is_paid,
                    is_overdue: !is_paid && installment.due_date < today,
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    #[test]
    fn test_monthly_due_dates_clamp_to_month_end() {
        let schedule = InstallmentSchedule::build(
            money("300"),
            4,
            InstallmentFrequency::Monthly,
            date(2025, 1, 31),
        )
        .unwrap();
        let dates: Vec<_> = schedule.installments().iter().map(|i| i.due_date).collect();
        assert_eq!(
            dates,
            vec![
                date(2025, 1, 31),
                date(2025, 2, 28),
                date(2025, 3, 31),
                date(2025, 4, 30)
            ]
        );
    }

    #[test]
    fn test_weekly_and_biweekly_spacing() {
        let first = date(2025, 6, 2);
        assert_eq!(
            due_date(first, InstallmentFrequency::Weekly, 3),
            Some(date(2025, 6, 23))
        );
        assert_eq!(
            due_date(first, InstallmentFrequency::Biweekly, 2),
            Some(date(2025, 6, 30))
        );
    }

    #[test]
    fn test_last_installment_absorbs_rounding() {
        let schedule = InstallmentSchedule::build(
            money("1000"),
            3,
            InstallmentFrequency::Monthly,
            date(2025, 1, 1),
        )
        .unwrap();
        let amounts: Vec<_> = schedule.installments().iter().map(|i| i.amount).collect();
        assert_eq!(amounts, vec![money("333.33"), money("333.33"), money("333.34")]);
        assert_eq!(schedule.total(), money("1000"));
    }

    #[test]
    fn test_tiny_balance_never_goes_negative() {
        let schedule = InstallmentSchedule::build(
            money("0.05"),
            10,
            InstallmentFrequency::Weekly,
            date(2025, 1, 1),
        )
        .unwrap();
        assert!(schedule.installments().iter().all(|i| !i.amount.is_negative()));
        assert_eq!(schedule.total(), money("0.05"));
    }

    #[test]
    fn test_amount_due_and_arrears() {
        let schedule = InstallmentSchedule::build(
            money("600"),
            3,
            InstallmentFrequency::Monthly,
            date(2025, 1, 10),
        )
        .unwrap();

        // Due dates on the day itself are not yet late.
        assert_eq!(schedule.amount_due_by(date(2025, 1, 10)), Money::ZERO);
        assert_eq!(schedule.amount_due_by(date(2025, 2, 11)), money("400"));
        assert_eq!(schedule.arrears(money("150"), date(2025, 2, 11)), money("250"));
        assert_eq!(schedule.arrears(money("500"), date(2025, 2, 11)), Money::ZERO);
    }

    #[test]
    fn test_next_due() {
        let schedule = InstallmentSchedule::build(
            money("600"),
            3,
            InstallmentFrequency::Monthly,
            date(2025, 1, 10),
        )
        .unwrap();
        assert_eq!(schedule.next_due(Money::ZERO).unwrap().number, 1);
        assert_eq!(schedule.next_due(money("200")).unwrap().number, 2);
        assert_eq!(schedule.next_due(money("250")).unwrap().number, 2);
        assert!(schedule.next_due(money("600")).is_none());
    }

    #[test]
    fn test_progress_allocates_in_order() {
        let schedule = InstallmentSchedule::build(
            money("300"),
            3,
            InstallmentFrequency::Weekly,
            date(2025, 3, 3),
        )
        .unwrap();
        let rows = schedule.progress(money("150"), date(2025, 3, 12));
        assert!(rows[0].is_paid);
        assert_eq!(rows[1].paid, money("50"));
        assert!(rows[1].is_overdue);
        assert!(!rows[2].is_overdue);
    }

    #[test]
    fn test_zero_installments_is_empty() {
        let schedule = InstallmentSchedule::build(
            money("100"),
            0,
            InstallmentFrequency::Monthly,
            date(2025, 1, 1),
        )
        .unwrap();
        assert!(schedule.is_empty());
        assert_eq!(schedule.amount_due_by(date(2030, 1, 1)), Money::ZERO);
    }
}
