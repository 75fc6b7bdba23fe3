//! Purchase pricing.
//!
//! Interest is flat: it is charged once on the financed amount (subtotal less
//! down payment) and spread evenly over the installments.
//!
//! ```text
//! subtotal     = Σ unit_price × quantity
//! interest     = (subtotal − down_payment) × rate / 100
//! total        = subtotal + interest
//! outstanding  = total − down_payment
//! installment  = outstanding / installments
//! ```

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::types::{Money, PurchaseStatus};

/// Upper bound on installments (five years of weekly payments).
pub const MAX_INSTALLMENTS: u32 = 260;

/// Errors raised while pricing a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("a purchase needs at least one item")]
    NoItems,

    #[error("item {line}: quantity must be at least 1")]
    InvalidQuantity { line: usize },

    #[error("item {line}: unit price cannot be negative")]
    NegativePrice { line: usize },

    #[error("down payment cannot be negative")]
    NegativeDownPayment,

    #[error("down payment {down_payment} exceeds the subtotal {subtotal}")]
    DownPaymentExceedsSubtotal { down_payment: Money, subtotal: Money },

    #[error("interest rate must be between 0 and 100 percent (got {0})")]
    InvalidInterestRate(Decimal),

    #[error("installments must be between 1 and {MAX_INSTALLMENTS} (got {0})")]
    InvalidInstallments(u32),
}

/// One priced line of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteLine {
    pub unit_price: Money,
    pub quantity: u32,
}

/// Terms requested for a new purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteInput {
    pub lines: Vec<QuoteLine>,
    pub down_payment: Money,
    /// Flat interest, in percent of the financed amount.
    pub interest_rate: Decimal,
    pub installments: u32,
}

/// The priced purchase, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseQuote {
    pub line_totals: Vec<Money>,
    pub subtotal: Money,
    pub interest: Money,
    pub total: Money,
    pub down_payment: Money,
    pub outstanding: Money,
    pub installments: u32,
    pub installment_amount: Money,
    pub initial_status: PurchaseStatus,
}

impl PurchaseQuote {
    /// Amount being paid off through installments.
    #[must_use]
    pub fn financed(&self) -> Money {
        self.total - self.down_payment
    }
}

/// Price a purchase.
///
/// # Errors
///
/// Returns a [`PricingError`] for the first invalid input found.
pub fn quote(input: &QuoteInput) -> Result<PurchaseQuote, PricingError> {
    if input.lines.is_empty() {
        return Err(PricingError::NoItems);
    }
    if input.installments == 0 || input.installments > MAX_INSTALLMENTS {
        return Err(PricingError::InvalidInstallments(input.installments));
    }
    if input.interest_rate < Decimal::ZERO || input.interest_rate > Decimal::ONE_HUNDRED {
        return Err(PricingError::InvalidInterestRate(input.interest_rate));
    }
    if input.down_payment.is_negative() {
        return Err(PricingError::NegativeDownPayment);
    }

    let mut line_totals = Vec::with_capacity(input.lines.len());
    for (index, line) in input.lines.iter().enumerate() {
        let number = index + 1;
        if line.quantity == 0 {
            return Err(PricingError::InvalidQuantity { line: number });
        }
        if line.unit_price.is_negative() {
            return Err(PricingError::NegativePrice { line: number });
        }
        line_totals.push(line.unit_price.rounded().times(line.quantity));
    }

    let subtotal: Money = line_totals.iter().copied().sum();
    let down_payment = input.down_payment.rounded();
    if down_payment > subtotal {
        return Err(PricingError::DownPaymentExceedsSubtotal {
            down_payment,
            subtotal,
        });
    }

    let interest = (subtotal - down_payment).percent(input.interest_rate);
    let total = subtotal + interest;
    let outstanding = total - down_payment;
    let installment_amount = outstanding.share(input.installments);

    let initial_status = if outstanding.is_zero() {
        PurchaseStatus::Completed
    } else if down_payment.is_positive() {
        PurchaseStatus::Active
    } else {
        PurchaseStatus::Pending
    };

    Ok(PurchaseQuote {
        line_totals,
        subtotal,
        interest,
        total,
        down_payment,
        outstanding,
        installments: input.installments,
        installment_amount,
        initial_status,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn input(lines: &[(&str, u32)], down: &str, rate: i64, installments: u32) -> QuoteInput {
        QuoteInput {
            lines: lines
                .iter()
                .map(|(price, quantity)| QuoteLine {
                    unit_price: money(price),
                    quantity: *quantity,
                })
                .collect(),
            down_payment: money(down),
            interest_rate: Decimal::from(rate),
            installments,
        }
    }

    #[test]
    fn test_quote_with_interest_and_down_payment() {
        let q = quote(&input(&[("15000", 1), ("2500", 2)], "5000", 10, 6)).unwrap();
        assert_eq!(q.subtotal, money("20000"));
        assert_eq!(q.interest, money("1500"));
        assert_eq!(q.total, money("21500"));
        assert_eq!(q.outstanding, money("16500"));
        assert_eq!(q.installment_amount, money("2750"));
        assert_eq!(q.initial_status, PurchaseStatus::Active);
        assert_eq!(q.line_totals, vec![money("15000"), money("5000")]);
        assert_eq!(q.financed(), money("16500"));
    }

    #[test]
    fn test_quote_without_down_payment_is_pending() {
        let q = quote(&input(&[("1000", 1)], "0", 0, 3)).unwrap();
        assert_eq!(q.initial_status, PurchaseStatus::Pending);
        assert_eq!(q.installment_amount, money("333.33"));
    }

    #[test]
    fn test_quote_fully_paid_upfront_is_completed() {
        let q = quote(&input(&[("800", 1)], "800", 20, 1)).unwrap();
        assert_eq!(q.interest, Money::ZERO);
        assert_eq!(q.outstanding, Money::ZERO);
        assert_eq!(q.initial_status, PurchaseStatus::Completed);
    }

    #[test]
    fn test_quote_rejects_empty_items() {
        assert_eq!(
            quote(&input(&[], "0", 0, 1)),
            Err(PricingError::NoItems)
        );
    }

    #[test]
    fn test_quote_rejects_zero_quantity() {
        assert_eq!(
            quote(&input(&[("10", 1), ("10", 0)], "0", 0, 1)),
            Err(PricingError::InvalidQuantity { line: 2 })
        );
    }

    #[test]
    fn test_quote_rejects_negative_price() {
        assert_eq!(
            quote(&input(&[("-1", 1)], "0", 0, 1)),
            Err(PricingError::NegativePrice { line: 1 })
        );
    }

    #[test]
    fn test_quote_rejects_down_payment_above_subtotal() {
        assert!(matches!(
            quote(&input(&[("100", 1)], "150", 0, 1)),
            Err(PricingError::DownPaymentExceedsSubtotal { .. })
        ));
    }

    #[test]
    fn test_quote_rejects_bad_terms() {
        assert_eq!(
            quote(&input(&[("100", 1)], "0", 0, 0)),
            Err(PricingError::InvalidInstallments(0))
        );
        assert_eq!(
            quote(&input(&[("100", 1)], "0", 0, MAX_INSTALLMENTS + 1)),
            Err(PricingError::InvalidInstallments(MAX_INSTALLMENTS + 1))
        );
        assert_eq!(
            quote(&input(&[("100", 1)], "0", 101, 1)),
            Err(PricingError::InvalidInterestRate(Decimal::from(101)))
        );
        assert_eq!(
            quote(&input(&[("100", 1)], "-5", 0, 1)),
            Err(PricingError::NegativeDownPayment)
        );
    }
}
