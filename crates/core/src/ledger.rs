//! Payment rules and purchase balance transitions.
//!
//! Balances only move when a payment is confirmed. Everything here is pure;
//! the server runs these checks inside the transaction that holds the
//! purchase row lock, so the values passed in are the committed ones.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::schedule::InstallmentSchedule;
use crate::types::{Money, PaymentStatus, PurchaseStatus};

/// Violations of the payment rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentRuleError {
    #[error("payment amount must be greater than zero")]
    NonPositiveAmount,

    #[error("purchase is already fully paid")]
    PurchaseCompleted,

    #[error("payment of {amount} exceeds the outstanding balance of {outstanding}")]
    ExceedsOutstanding { amount: Money, outstanding: Money },

    #[error("payment has already been confirmed")]
    AlreadyConfirmed,

    #[error("payment has already been rejected")]
    AlreadyRejected,
}

/// Money state of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PurchaseBalance {
    pub status: PurchaseStatus,
    pub total: Money,
    pub down_payment: Money,
    pub amount_paid: Money,
    pub outstanding: Money,
}

impl PurchaseBalance {
    /// Paid money that counts towards installments (excludes the down payment).
    #[must_use]
    pub fn installment_paid(&self) -> Money {
        (self.amount_paid - self.down_payment).non_negative()
    }
}

/// Check that `amount` may be paid against `balance`.
///
/// # Errors
///
/// - [`PaymentRuleError::PurchaseCompleted`] if nothing is owed any more
/// - [`PaymentRuleError::NonPositiveAmount`] for zero or negative amounts
/// - [`PaymentRuleError::ExceedsOutstanding`] when overpaying
pub fn validate_payment(balance: &PurchaseBalance, amount: Money) -> Result<(), PaymentRuleError> {
    if balance.status == PurchaseStatus::Completed {
        return Err(PaymentRuleError::PurchaseCompleted);
    }
    if !amount.is_positive() {
        return Err(PaymentRuleError::NonPositiveAmount);
    }
    if amount > balance.outstanding {
        return Err(PaymentRuleError::ExceedsOutstanding {
            amount,
            outstanding: balance.outstanding,
        });
    }
    Ok(())
}

/// Apply a confirmed payment and derive the new status.
///
/// # Errors
///
/// Same as [`validate_payment`]; the balance is re-checked because it may have
/// changed since the payment was recorded.
pub fn apply_confirmed_payment(
    balance: &PurchaseBalance,
    amount: Money,
    schedule: &InstallmentSchedule,
    today: NaiveDate,
) -> Result<PurchaseBalance, PaymentRuleError> {
    validate_payment(balance, amount)?;

    let amount_paid = balance.amount_paid + amount;
    let mut next = PurchaseBalance {
        amount_paid,
        outstanding: (balance.total - amount_paid).non_negative(),
        ..*balance
    };
    next.status = refresh_status(&next, schedule, today);
    Ok(next)
}

/// Status a purchase should have on `today`, without moving money.
///
/// Defaulted purchases stay defaulted until they are paid off.
#[must_use]
pub fn refresh_status(
    balance: &PurchaseBalance,
    schedule: &InstallmentSchedule,
    today: NaiveDate,
) -> PurchaseStatus {
    if balance.outstanding.is_zero() {
        return PurchaseStatus::Completed;
    }
    if balance.status == PurchaseStatus::Defaulted {
        return PurchaseStatus::Defaulted;
    }
    if schedule.arrears(balance.installment_paid(), today).is_positive() {
        PurchaseStatus::Overdue
    } else if balance.amount_paid.is_zero() {
        PurchaseStatus::Pending
    } else {
        PurchaseStatus::Active
    }
}

/// What a shop admin decided about a pending payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentDecision {
    Confirm,
    Reject,
}

/// Resulting payment status for `decision`.
///
/// # Errors
///
/// A payment is decided exactly once: confirmed payments return
/// [`PaymentRuleError::AlreadyConfirmed`], rejected ones
/// [`PaymentRuleError::AlreadyRejected`].
pub fn decide(
    current: PaymentStatus,
    is_confirmed: bool,
    decision: PaymentDecision,
) -> Result<PaymentStatus, PaymentRuleError> {
    if is_confirmed || current == PaymentStatus::Completed {
        return Err(PaymentRuleError::AlreadyConfirmed);
    }
    if current == PaymentStatus::Rejected {
        return Err(PaymentRuleError::AlreadyRejected);
    }
    Ok(match decision {
        PaymentDecision::Confirm => PaymentStatus::Completed,
        PaymentDecision::Reject => PaymentStatus::Rejected,
    })
}

/// Write off a purchase.
///
/// # Errors
///
/// Returns [`PaymentRuleError::PurchaseCompleted`] for paid-off purchases.
pub fn mark_defaulted(status: PurchaseStatus) -> Result<PurchaseStatus, PaymentRuleError> {
    if status == PurchaseStatus::Completed {
        return Err(PaymentRuleError::PurchaseCompleted);
    }
    Ok(PurchaseStatus::Defaulted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::InstallmentFrequency;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Total 1200, 200 down, 1000 over 4 monthly installments from 1 Feb.
    fn fixture() -> (PurchaseBalance, InstallmentSchedule) {
        let balance = PurchaseBalance {
            status: PurchaseStatus::Active,
            total: money("1200"),
            down_payment: money("200"),
            amount_paid: money("200"),
            outstanding: money("1000"),
        };
        let schedule = InstallmentSchedule::build(
            money("1000"),
            4,
            InstallmentFrequency::Monthly,
            date(2025, 2, 1),
        )
        .unwrap();
        (balance, schedule)
    }

    #[test]
    fn test_rejects_overpayment() {
        let (balance, _) = fixture();
        assert_eq!(
            validate_payment(&balance, money("1000.01")),
            Err(PaymentRuleError::ExceedsOutstanding {
                amount: money("1000.01"),
                outstanding: money("1000"),
            })
        );
    }

    #[test]
    fn test_rejects_non_positive_amount() {
        let (balance, _) = fixture();
        assert_eq!(
            validate_payment(&balance, Money::ZERO),
            Err(PaymentRuleError::NonPositiveAmount)
        );
        assert_eq!(
            validate_payment(&balance, money("-5")),
            Err(PaymentRuleError::NonPositiveAmount)
        );
    }

    #[test]
    fn test_sub_cent_amounts_are_judged_after_rounding() {
        let (balance, _) = fixture();
        assert_eq!(
            validate_payment(&balance, money("0.004").rounded()),
            Err(PaymentRuleError::NonPositiveAmount)
        );
        assert_eq!(validate_payment(&balance, money("1000.004").rounded()), Ok(()));
    }

    #[test]
    fn test_completed_purchase_rejects_payments() {
        let (mut balance, _) = fixture();
        balance.status = PurchaseStatus::Completed;
        assert_eq!(
            validate_payment(&balance, money("1")),
            Err(PaymentRuleError::PurchaseCompleted)
        );
    }

    #[test]
    fn test_confirming_final_amount_completes() {
        let (balance, schedule) = fixture();
        let next =
            apply_confirmed_payment(&balance, money("1000"), &schedule, date(2025, 3, 15)).unwrap();
        assert_eq!(next.status, PurchaseStatus::Completed);
        assert_eq!(next.outstanding, Money::ZERO);
        assert_eq!(next.amount_paid, money("1200"));
    }

    #[test]
    fn test_partial_payment_on_schedule_is_active() {
        let (balance, schedule) = fixture();
        let next =
            apply_confirmed_payment(&balance, money("250"), &schedule, date(2025, 2, 10)).unwrap();
        assert_eq!(next.status, PurchaseStatus::Active);
        assert_eq!(next.outstanding, money("750"));
    }

    #[test]
    fn test_partial_payment_behind_schedule_is_overdue() {
        let (balance, schedule) = fixture();
        let next =
            apply_confirmed_payment(&balance, money("100"), &schedule, date(2025, 3, 5)).unwrap();
        assert_eq!(next.status, PurchaseStatus::Overdue);
    }

    #[test]
    fn test_defaulted_stays_defaulted_until_paid() {
        let (mut balance, schedule) = fixture();
        balance.status = PurchaseStatus::Defaulted;
        let partial =
            apply_confirmed_payment(&balance, money("400"), &schedule, date(2025, 2, 10)).unwrap();
        assert_eq!(partial.status, PurchaseStatus::Defaulted);

        let settled =
            apply_confirmed_payment(&partial, money("600"), &schedule, date(2025, 2, 10)).unwrap();
        assert_eq!(settled.status, PurchaseStatus::Completed);
    }

    #[test]
    fn test_pending_becomes_overdue_only_after_first_due_date() {
        let (mut balance, schedule) = fixture();
        balance.status = PurchaseStatus::Pending;
        balance.amount_paid = Money::ZERO;
        balance.down_payment = Money::ZERO;
        balance.outstanding = balance.total;

        assert_eq!(
            refresh_status(&balance, &schedule, date(2025, 2, 1)),
            PurchaseStatus::Pending
        );
        assert_eq!(
            refresh_status(&balance, &schedule, date(2025, 2, 2)),
            PurchaseStatus::Overdue
        );
    }

    #[test]
    fn test_decide_once() {
        assert_eq!(
            decide(PaymentStatus::Pending, false, PaymentDecision::Confirm),
            Ok(PaymentStatus::Completed)
        );
        assert_eq!(
            decide(PaymentStatus::Pending, false, PaymentDecision::Reject),
            Ok(PaymentStatus::Rejected)
        );
        assert_eq!(
            decide(PaymentStatus::Completed, true, PaymentDecision::Confirm),
            Err(PaymentRuleError::AlreadyConfirmed)
        );
        assert_eq!(
            decide(PaymentStatus::Rejected, false, PaymentDecision::Confirm),
            Err(PaymentRuleError::AlreadyRejected)
        );
    }

    #[test]
    fn test_mark_defaulted() {
        assert_eq!(
            mark_defaulted(PurchaseStatus::Overdue),
            Ok(PurchaseStatus::Defaulted)
        );
        assert_eq!(
            mark_defaulted(PurchaseStatus::Completed),
            Err(PaymentRuleError::PurchaseCompleted)
        );
    }
}
