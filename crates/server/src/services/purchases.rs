//! Purchase creation, write-offs and the overdue sweep.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use hire_purchase_core::ledger::{self, PurchaseBalance};
use hire_purchase_core::pricing::{self, QuoteInput, QuoteLine};
use hire_purchase_core::schedule::InstallmentSchedule;
use hire_purchase_core::{
    CustomerId, InstallmentFrequency, MembershipId, Money, PaymentMethod, ProductId, PurchaseId,
    ShopId,
};

use super::ServiceError;
use super::references;
use crate::db::{CustomerRepository, PaymentRepository, ProductRepository, PurchaseRepository};
use crate::models::{NewPayment, NewPurchase, NewPurchaseItem, Purchase};

/// One requested line of a new purchase.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseLineInput {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of the create-purchase action.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePurchaseInput {
    pub customer_id: CustomerId,
    pub items: Vec<PurchaseLineInput>,
    #[serde(default)]
    pub down_payment: Money,
    #[serde(default)]
    pub down_payment_method: PaymentMethod,
    #[serde(default)]
    pub interest_rate: Decimal,
    pub installments: u32,
    #[serde(default)]
    pub frequency: InstallmentFrequency,
    pub first_due_date: NaiveDate,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Outcome of one overdue sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub updated: usize,
    /// Rows that changed between read and write; the next sweep picks them up.
    pub skipped: usize,
}

pub struct PurchaseService<'a> {
    pool: &'a PgPool,
    purchases: PurchaseRepository<'a>,
    customers: CustomerRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> PurchaseService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            purchases: PurchaseRepository::new(pool),
            customers: CustomerRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// Price and store a purchase for a customer of the shop.
    ///
    /// Product names and prices are copied onto the items. A down payment is
    /// stored as an already confirmed payment in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for customers or products outside the
    /// shop, `ServiceError::Validation` for inactive products and
    /// `ServiceError::Pricing` for invalid terms.
    pub async fn create(
        &self,
        shop_id: ShopId,
        created_by: MembershipId,
        input: &CreatePurchaseInput,
        now: DateTime<Utc>,
    ) -> Result<Purchase, ServiceError> {
        let customer = self
            .customers
            .get_in_shop(shop_id, input.customer_id)
            .await?
            .ok_or(ServiceError::NotFound("customer"))?;

        let mut products = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let product = self
                .products
                .get_in_shop(shop_id, line.product_id)
                .await?
                .ok_or(ServiceError::NotFound("product"))?;
            if !product.is_active {
                return Err(ServiceError::Validation(format!(
                    "{} is no longer for sale",
                    product.name
                )));
            }
            products.push((product, line.quantity));
        }

        let quote = pricing::quote(&QuoteInput {
            lines: products
                .iter()
                .map(|(product, quantity)| QuoteLine {
                    unit_price: product.price,
                    quantity: *quantity,
                })
                .collect(),
            down_payment: input.down_payment,
            interest_rate: input.interest_rate,
            installments: input.installments,
        })?;

        // Reject plans whose due dates run off the calendar before storing.
        InstallmentSchedule::build(
            quote.financed(),
            quote.installments,
            input.frequency,
            input.first_due_date,
        )?;

        let items = products
            .iter()
            .zip(&quote.line_totals)
            .map(|((product, quantity), line_total)| NewPurchaseItem {
                product_id: product.id,
                product_name: product.name.clone(),
                unit_price: product.price.rounded(),
                quantity: *quantity,
                line_total: *line_total,
            })
            .collect();

        let down_payment = quote.down_payment;
        let new_purchase = NewPurchase {
            shop_id,
            customer_id: customer.id,
            purchase_number: references::purchase_number(now),
            quote,
            interest_rate: input.interest_rate,
            frequency: input.frequency,
            first_due_date: input.first_due_date,
            notes: input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(String::from),
            created_by,
            items,
        };

        let mut tx = self.pool.begin().await?;
        let purchase_id = PurchaseRepository::insert_with_items(&mut tx, &new_purchase).await?;

        if down_payment.is_positive() {
            PaymentRepository::insert(
                &mut tx,
                &NewPayment {
                    purchase_id,
                    shop_id,
                    amount: down_payment,
                    method: input.down_payment_method,
                    collector_id: None,
                    recorded_by: created_by,
                    confirmed_by: Some(created_by),
                    reference: references::payment_reference(now),
                    notes: Some("Down payment".to_string()),
                    paid_at: now,
                },
            )
            .await?;
        }
        tx.commit().await?;

        tracing::info!(
            purchase_id = %purchase_id,
            shop_id = %shop_id,
            number = %new_purchase.purchase_number,
            total = %new_purchase.quote.total,
            "Purchase created"
        );

        self.purchases
            .get_in_shop(shop_id, purchase_id)
            .await?
            .ok_or(ServiceError::NotFound("purchase"))
    }

    /// Write off an unpaid purchase.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Rule` if the purchase is already completed.
    pub async fn mark_defaulted(
        &self,
        shop_id: ShopId,
        purchase_id: PurchaseId,
    ) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        let purchase = PurchaseRepository::lock_for_update(&mut tx, shop_id, purchase_id)
            .await?
            .ok_or(ServiceError::NotFound("purchase"))?;

        let status = ledger::mark_defaulted(purchase.status)?;
        PurchaseRepository::set_status(&mut tx, purchase_id, status).await?;
        tx.commit().await?;

        tracing::warn!(purchase_id = %purchase_id, shop_id = %shop_id, "Purchase marked defaulted");
        Ok(())
    }

    /// Move open purchases between pending, active and overdue as due dates
    /// pass. Money never moves here.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Repository` if loading the purchases fails.
    pub async fn refresh_overdue(&self, today: NaiveDate) -> Result<SweepReport, ServiceError> {
        let open = self.purchases.list_open_for_sweep().await?;
        let mut report = SweepReport {
            checked: open.len(),
            ..SweepReport::default()
        };

        for purchase in &open {
            let schedule = match purchase.schedule() {
                Ok(schedule) => schedule,
                Err(e) => {
                    tracing::error!(purchase_id = %purchase.id, error = %e, "Unusable schedule");
                    report.skipped += 1;
                    continue;
                }
            };

            let balance: PurchaseBalance = purchase.balance();
            let status = ledger::refresh_status(&balance, &schedule, today);
            if status == purchase.status {
                continue;
            }

            if self.purchases.set_status_if_unchanged(purchase, status).await? {
                tracing::info!(
                    purchase_id = %purchase.id,
                    from = %purchase.status,
                    to = %status,
                    "Purchase status refreshed"
                );
                report.updated += 1;
            } else {
                report.skipped += 1;
            }
        }

        Ok(report)
    }
}
