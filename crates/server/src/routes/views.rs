//! View models shared by several pages.

use chrono::NaiveDate;

use hire_purchase_core::Money;
use hire_purchase_core::schedule::{Installment, InstallmentProgress};

use crate::error::AppError;
use crate::models::Purchase;

/// Installment plan of a purchase with what has been paid against it.
#[derive(Debug, Clone)]
pub struct ScheduleView {
    pub rows: Vec<InstallmentProgress>,
    /// Installment money due before today and still unpaid.
    pub arrears: Money,
    pub next_due: Option<Installment>,
    pub paid_count: usize,
}

impl ScheduleView {
    /// Build the plan of `purchase` as of `today`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the stored terms produce an
    /// unrepresentable due date.
    pub fn for_purchase(purchase: &Purchase, today: NaiveDate) -> Result<Self, AppError> {
        let schedule = purchase.schedule().map_err(|e| {
            AppError::Internal(format!("schedule of {}: {e}", purchase.purchase_number))
        })?;
        let paid = purchase.balance().installment_paid();
        let rows = schedule.progress(paid, today);
        let paid_count = rows.iter().filter(|r| r.is_paid).count();

        Ok(Self {
            arrears: if purchase.status.is_open() {
                schedule.arrears(paid, today)
            } else {
                Money::ZERO
            },
            next_due: if purchase.status.is_open() {
                schedule.next_due(paid).copied()
            } else {
                None
            },
            paid_count,
            rows,
        })
    }

    #[must_use]
    pub fn has_arrears(&self) -> bool {
        self.arrears.is_positive()
    }
}
