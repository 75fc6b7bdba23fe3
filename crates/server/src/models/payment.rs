//! Payments against purchases.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use hire_purchase_core::{
    CustomerId, MembershipId, Money, PaymentId, PaymentMethod, PaymentStatus, PurchaseId, ShopId,
};

/// A payment joined with the names shown next to it.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub purchase_id: PurchaseId,
    pub purchase_number: String,
    pub shop_id: ShopId,
    pub shop_name: String,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub is_confirmed: bool,
    pub collector_id: Option<MembershipId>,
    pub collector_name: Option<String>,
    pub recorded_by: MembershipId,
    pub confirmed_by: Option<MembershipId>,
    pub reference: String,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Row locked while a payment is being decided.
#[derive(Debug, Clone, Copy)]
pub struct PaymentLock {
    pub id: PaymentId,
    pub purchase_id: PurchaseId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub is_confirmed: bool,
}

/// Insert payload.
///
/// When `confirmed_by` is set the payment is stored already confirmed.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub purchase_id: PurchaseId,
    pub shop_id: ShopId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub collector_id: Option<MembershipId>,
    pub recorded_by: MembershipId,
    pub confirmed_by: Option<MembershipId>,
    pub reference: String,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

/// Report filters; dates are inclusive and compare against `paid_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub shop_id: Option<ShopId>,
    pub collector_id: Option<MembershipId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
