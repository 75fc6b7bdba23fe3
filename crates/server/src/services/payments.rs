//! Recording and deciding payments.
//!
//! Collectors record payments unconfirmed; the purchase balance only moves
//! when a shop admin confirms one. Shop admins may also record payments they
//! received themselves, which are confirmed on the spot.
//!
//! Every path that moves money locks the purchase row (`FOR UPDATE`) and
//! re-validates against the locked balance, so concurrent confirmations
//! cannot both spend the same outstanding amount.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;

use hire_purchase_core::ledger::{self, PaymentDecision};
use hire_purchase_core::{MembershipId, Money, PaymentId, PaymentMethod, PaymentStatus, PurchaseId, ShopId};

use super::ServiceError;
use super::references;
use crate::db::{CustomerRepository, PaymentRepository, PurchaseRepository};
use crate::models::{NewPayment, Payment};

/// Body of the record-payment actions.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPaymentInput {
    pub purchase_id: PurchaseId,
    pub amount: Money,
    #[serde(default)]
    pub method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RecordPaymentInput {
    /// Amount as it will be stored, rounded to cents.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.amount.rounded()
    }

    fn notes(&self) -> Option<String> {
        self.notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
    }
}

pub struct PaymentService<'a> {
    pool: &'a PgPool,
    payments: PaymentRepository<'a>,
    purchases: PurchaseRepository<'a>,
    customers: CustomerRepository<'a>,
}

impl<'a> PaymentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            payments: PaymentRepository::new(pool),
            purchases: PurchaseRepository::new(pool),
            customers: CustomerRepository::new(pool),
        }
    }

    /// Record a payment collected in the field. It stays pending until a
    /// shop admin confirms it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Forbidden` if the customer is not assigned to
    /// the collector and `ServiceError::Rule` if the amount cannot be paid.
    pub async fn record_by_collector(
        &self,
        shop_id: ShopId,
        collector: MembershipId,
        input: &RecordPaymentInput,
        now: DateTime<Utc>,
    ) -> Result<Payment, ServiceError> {
        let purchase = self
            .purchases
            .get_in_shop(shop_id, input.purchase_id)
            .await?
            .ok_or(ServiceError::NotFound("purchase"))?;

        let customer = self
            .customers
            .get_in_shop(shop_id, purchase.customer_id)
            .await?
            .ok_or(ServiceError::NotFound("customer"))?;
        if customer.collector_membership_id != Some(collector) {
            return Err(ServiceError::Forbidden(
                "this customer is not assigned to you".to_string(),
            ));
        }

        let amount = input.amount();
        ledger::validate_payment(&purchase.balance(), amount)?;

        let mut conn = self.pool.acquire().await?;
        let payment_id = PaymentRepository::insert(
            &mut conn,
            &NewPayment {
                purchase_id: purchase.id,
                shop_id,
                amount,
                method: input.method,
                collector_id: Some(collector),
                recorded_by: collector,
                confirmed_by: None,
                reference: references::payment_reference(now),
                notes: input.notes(),
                paid_at: now,
            },
        )
        .await?;

        tracing::info!(
            payment_id = %payment_id,
            purchase_id = %purchase.id,
            collector = %collector,
            amount = %amount,
            "Payment recorded, awaiting confirmation"
        );

        self.get(shop_id, payment_id).await
    }

    /// Record and confirm a payment received by a shop admin.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Rule` if the amount cannot be paid against the
    /// locked balance.
    pub async fn record_by_shop_admin(
        &self,
        shop_id: ShopId,
        admin: MembershipId,
        input: &RecordPaymentInput,
        now: DateTime<Utc>,
    ) -> Result<Payment, ServiceError> {
        let amount = input.amount();
        let mut tx = self.pool.begin().await?;

        let purchase = PurchaseRepository::lock_for_update(&mut tx, shop_id, input.purchase_id)
            .await?
            .ok_or(ServiceError::NotFound("purchase"))?;
        let schedule = purchase.schedule()?;
        let balance =
            ledger::apply_confirmed_payment(&purchase.balance(), amount, &schedule, now.date_naive())?;

        let payment_id = PaymentRepository::insert(
            &mut tx,
            &NewPayment {
                purchase_id: purchase.id,
                shop_id,
                amount,
                method: input.method,
                collector_id: None,
                recorded_by: admin,
                confirmed_by: Some(admin),
                reference: references::payment_reference(now),
                notes: input.notes(),
                paid_at: now,
            },
        )
        .await?;
        PurchaseRepository::update_balance(&mut tx, purchase.id, &balance).await?;
        tx.commit().await?;

        tracing::info!(
            payment_id = %payment_id,
            purchase_id = %purchase.id,
            amount = %amount,
            status = %balance.status,
            "Payment recorded and confirmed by shop admin"
        );

        self.get(shop_id, payment_id).await
    }

    /// Confirm a pending payment and apply it to its purchase.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Rule` if the payment was already decided or no
    /// longer fits the outstanding balance.
    pub async fn confirm(
        &self,
        shop_id: ShopId,
        admin: MembershipId,
        payment_id: PaymentId,
        now: DateTime<Utc>,
    ) -> Result<Payment, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let payment = PaymentRepository::lock_for_update(&mut tx, shop_id, payment_id)
            .await?
            .ok_or(ServiceError::NotFound("payment"))?;
        let status = ledger::decide(payment.status, payment.is_confirmed, PaymentDecision::Confirm)?;

        let purchase = PurchaseRepository::lock_for_update(&mut tx, shop_id, payment.purchase_id)
            .await?
            .ok_or(ServiceError::NotFound("purchase"))?;
        let schedule = purchase.schedule()?;
        let balance = ledger::apply_confirmed_payment(
            &purchase.balance(),
            payment.amount,
            &schedule,
            now.date_naive(),
        )?;

        PaymentRepository::mark_decided(&mut tx, payment_id, status, admin, None).await?;
        PurchaseRepository::update_balance(&mut tx, purchase.id, &balance).await?;
        tx.commit().await?;

        tracing::info!(
            payment_id = %payment_id,
            purchase_id = %purchase.id,
            amount = %payment.amount,
            outstanding = %balance.outstanding,
            status = %balance.status,
            "Payment confirmed"
        );

        self.get(shop_id, payment_id).await
    }

    /// Reject a pending payment. The purchase balance is untouched.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Rule` if the payment was already decided.
    pub async fn reject(
        &self,
        shop_id: ShopId,
        admin: MembershipId,
        payment_id: PaymentId,
        reason: Option<&str>,
    ) -> Result<Payment, ServiceError> {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let mut tx = self.pool.begin().await?;

        let payment = PaymentRepository::lock_for_update(&mut tx, shop_id, payment_id)
            .await?
            .ok_or(ServiceError::NotFound("payment"))?;
        let status = ledger::decide(payment.status, payment.is_confirmed, PaymentDecision::Reject)?;
        debug_assert_eq!(status, PaymentStatus::Rejected);

        PaymentRepository::mark_decided(&mut tx, payment_id, status, admin, reason).await?;
        tx.commit().await?;

        tracing::info!(
            payment_id = %payment_id,
            purchase_id = %payment.purchase_id,
            reason = reason.unwrap_or(""),
            "Payment rejected"
        );

        self.get(shop_id, payment_id).await
    }

    async fn get(&self, shop_id: ShopId, id: PaymentId) -> Result<Payment, ServiceError> {
        self.payments
            .get_in_shop(shop_id, id)
            .await?
            .ok_or(ServiceError::NotFound("payment"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_record_input_trims_notes() {
        let input: RecordPaymentInput = serde_json::from_value(serde_json::json!({
            "purchase_id": 3,
            "amount": "250.00",
            "notes": "   "
        }))
        .unwrap();

        assert_eq!(input.method, PaymentMethod::Cash);
        assert_eq!(input.notes(), None);
        assert_eq!(input.amount, Money::from_major(250));
    }

    #[test]
    fn test_record_input_method() {
        let input: RecordPaymentInput = serde_json::from_value(serde_json::json!({
            "purchase_id": 3,
            "amount": "40",
            "method": "MOBILE_MONEY",
            "notes": " paid at market "
        }))
        .unwrap();

        assert_eq!(input.method, PaymentMethod::MobileMoney);
        assert_eq!(input.notes().as_deref(), Some("paid at market"));
    }

    #[test]
    fn test_record_input_amount_is_rounded_before_use() {
        let input: RecordPaymentInput = serde_json::from_value(serde_json::json!({
            "purchase_id": 3,
            "amount": "0.004"
        }))
        .unwrap();
        assert!(input.amount.is_positive());
        assert!(!input.amount().is_positive());

        let input: RecordPaymentInput = serde_json::from_value(serde_json::json!({
            "purchase_id": 3,
            "amount": "1000.004"
        }))
        .unwrap();
        assert_eq!(input.amount(), Money::from_major(1000));
    }
}
