//! Hire-purchase agreements.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use hire_purchase_core::ledger::PurchaseBalance;
use hire_purchase_core::pricing::PurchaseQuote;
use hire_purchase_core::schedule::{InstallmentSchedule, ScheduleError};
use hire_purchase_core::{
    CustomerId, InstallmentFrequency, MembershipId, Money, ProductId, PurchaseId, PurchaseItemId,
    PurchaseStatus, ShopId,
};

use super::customer::Customer;

#[derive(Debug, Clone, Serialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub shop_id: ShopId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub purchase_number: String,
    pub status: PurchaseStatus,
    pub subtotal: Money,
    pub interest_rate: Decimal,
    pub interest: Money,
    pub total: Money,
    pub down_payment: Money,
    pub amount_paid: Money,
    pub outstanding: Money,
    pub installments: u32,
    pub frequency: InstallmentFrequency,
    pub installment_amount: Money,
    pub first_due_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: MembershipId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Purchase {
    #[must_use]
    pub const fn balance(&self) -> PurchaseBalance {
        PurchaseBalance {
            status: self.status,
            total: self.total,
            down_payment: self.down_payment,
            amount_paid: self.amount_paid,
            outstanding: self.outstanding,
        }
    }

    /// Installment plan for the financed part (total less down payment).
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError` if a due date cannot be represented.
    pub fn schedule(&self) -> Result<InstallmentSchedule, ScheduleError> {
        InstallmentSchedule::build(
            self.total - self.down_payment,
            self.installments,
            self.frequency,
            self.first_due_date,
        )
    }
}

/// Product line snapshot taken when the purchase was made.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseItem {
    pub id: PurchaseItemId,
    pub purchase_id: PurchaseId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseDetail {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
    pub customer: Customer,
}

#[derive(Debug, Clone)]
pub struct NewPurchaseItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

/// A priced purchase ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub shop_id: ShopId,
    pub customer_id: CustomerId,
    pub purchase_number: String,
    pub quote: PurchaseQuote,
    pub interest_rate: Decimal,
    pub frequency: InstallmentFrequency,
    pub first_due_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: MembershipId,
    pub items: Vec<NewPurchaseItem>,
}
