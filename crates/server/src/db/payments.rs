//! Payment repository.
//!
//! Payments are listed with their purchase, customer, shop and collector
//! names. Inserts and decisions take a `&mut PgConnection` so they share the
//! caller's transaction with the purchase balance update.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use hire_purchase_core::{
    BusinessId, CustomerId, MembershipId, Money, PaymentId, PaymentMethod, PaymentStatus,
    PurchaseId, ShopId,
};

use super::{ListParams, Page, RepositoryError, conflict_on_unique};
use crate::models::{NewPayment, Payment, PaymentFilter, PaymentLock};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i32,
    purchase_id: i32,
    purchase_number: String,
    shop_id: i32,
    shop_name: String,
    customer_id: i32,
    customer_name: String,
    amount: Money,
    method: PaymentMethod,
    status: PaymentStatus,
    is_confirmed: bool,
    collector_id: Option<i32>,
    collector_name: Option<String>,
    recorded_by_membership_id: i32,
    confirmed_by_membership_id: Option<i32>,
    reference: String,
    notes: Option<String>,
    rejection_reason: Option<String>,
    paid_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: PaymentId::new(row.id),
            purchase_id: PurchaseId::new(row.purchase_id),
            purchase_number: row.purchase_number,
            shop_id: ShopId::new(row.shop_id),
            shop_name: row.shop_name,
            customer_id: CustomerId::new(row.customer_id),
            customer_name: row.customer_name,
            amount: row.amount,
            method: row.method,
            status: row.status,
            is_confirmed: row.is_confirmed,
            collector_id: row.collector_id.map(MembershipId::new),
            collector_name: row.collector_name,
            recorded_by: MembershipId::new(row.recorded_by_membership_id),
            confirmed_by: row.confirmed_by_membership_id.map(MembershipId::new),
            reference: row.reference,
            notes: row.notes,
            rejection_reason: row.rejection_reason,
            paid_at: row.paid_at,
            confirmed_at: row.confirmed_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LockRow {
    id: i32,
    purchase_id: i32,
    amount: Money,
    status: PaymentStatus,
    is_confirmed: bool,
}

const PAYMENT_SELECT: &str = r"
    SELECT pay.id, pay.purchase_id, p.purchase_number, pay.shop_id, s.name AS shop_name,
           p.customer_id, c.name AS customer_name, pay.amount, pay.method, pay.status,
           pay.is_confirmed, pay.collector_id, cu.name AS collector_name,
           pay.recorded_by_membership_id, pay.confirmed_by_membership_id, pay.reference,
           pay.notes, pay.rejection_reason, pay.paid_at, pay.confirmed_at, pay.created_at
    FROM payments pay
    JOIN purchases p ON p.id = pay.purchase_id
    JOIN customers c ON c.id = p.customer_id
    JOIN shops s ON s.id = pay.shop_id
    LEFT JOIN memberships cm ON cm.id = pay.collector_id
    LEFT JOIN users cu ON cu.id = cm.user_id
";

const PAYMENT_JOINS: &str = r"
    FROM payments pay
    JOIN purchases p ON p.id = pay.purchase_id
    JOIN customers c ON c.id = p.customer_id
    JOIN shops s ON s.id = pay.shop_id
    LEFT JOIN memberships cm ON cm.id = pay.collector_id
    LEFT JOIN users cu ON cu.id = cm.user_id
";

// $1 is the tenant (shop or business); the rest are shared by every list.
const FILTER_TAIL: &str = r"
      AND ($2::text IS NULL OR pay.reference ILIKE $2 OR p.purchase_number ILIKE $2
           OR c.name ILIKE $2)
      AND ($3::payment_status IS NULL OR pay.status = $3)
      AND ($4::int IS NULL OR pay.shop_id = $4)
      AND ($5::int IS NULL OR pay.collector_id = $5)
      AND ($6::date IS NULL OR pay.paid_at::date >= $6)
      AND ($7::date IS NULL OR pay.paid_at::date <= $7)
";

const SORTABLE: &[(&str, &str)] = &[
    ("date", "pay.paid_at"),
    ("amount", "pay.amount"),
    ("status", "pay.status"),
    ("customer", "c.name"),
    ("collector", "collector_name"),
    ("reference", "pay.reference"),
    ("shop", "s.name"),
];

// Pending payments need a decision, so they float to the top.
const DEFAULT_ORDER: &str = "(pay.status = 'PENDING') DESC, pay.paid_at DESC";

#[derive(Debug, Clone, Copy)]
enum Tenant {
    Shop(ShopId),
    Business(BusinessId),
}

impl Tenant {
    const fn clause(self) -> &'static str {
        match self {
            Self::Shop(_) => "WHERE pay.shop_id = $1",
            Self::Business(_) => "WHERE s.business_id = $1",
        }
    }

    const fn id(self) -> i32 {
        match self {
            Self::Shop(id) => id.as_i32(),
            Self::Business(id) => id.as_i32(),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for payments.
pub struct PaymentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    async fn list_filtered(
        &self,
        tenant: Tenant,
        params: &ListParams,
        filter: &PaymentFilter,
    ) -> Result<Page<Payment>, RepositoryError> {
        let pattern = params.search_pattern();
        let order = params.order_by(SORTABLE, DEFAULT_ORDER);
        let tenant_clause = tenant.clause();
        let sql = format!(
            "{PAYMENT_SELECT} {tenant_clause} {FILTER_TAIL}
             ORDER BY {order}
             LIMIT $8 OFFSET $9"
        );

        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(tenant.id())
            .bind(pattern.as_deref())
            .bind(filter.status)
            .bind(filter.shop_id)
            .bind(filter.collector_id)
            .bind(filter.from)
            .bind(filter.to)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) {PAYMENT_JOINS} {tenant_clause} {FILTER_TAIL}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(tenant.id())
            .bind(pattern.as_deref())
            .bind(filter.status)
            .bind(filter.shop_id)
            .bind(filter.collector_id)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(self.pool)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }

    /// Payments of one shop. Pending ones come first unless a sort is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        shop_id: ShopId,
        params: &ListParams,
        filter: &PaymentFilter,
    ) -> Result<Page<Payment>, RepositoryError> {
        let filter = PaymentFilter {
            shop_id: None,
            ..*filter
        };
        self.list_filtered(Tenant::Shop(shop_id), params, &filter)
            .await
    }

    /// Payments recorded by one collector.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_collector(
        &self,
        shop_id: ShopId,
        collector: MembershipId,
        params: &ListParams,
        status: Option<PaymentStatus>,
    ) -> Result<Page<Payment>, RepositoryError> {
        let filter = PaymentFilter {
            status,
            collector_id: Some(collector),
            ..PaymentFilter::default()
        };
        self.list_filtered(Tenant::Shop(shop_id), params, &filter)
            .await
    }

    /// Payments across every shop of a business.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_business(
        &self,
        business_id: BusinessId,
        params: &ListParams,
        filter: &PaymentFilter,
    ) -> Result<Page<Payment>, RepositoryError> {
        self.list_filtered(Tenant::Business(business_id), params, filter)
            .await
    }

    async fn report_filtered(
        &self,
        tenant: Tenant,
        filter: &PaymentFilter,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let tenant_clause = tenant.clause();
        let sql = format!(
            "{PAYMENT_SELECT} {tenant_clause} {FILTER_TAIL} ORDER BY pay.paid_at, pay.id"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(tenant.id())
            .bind(Option::<String>::None)
            .bind(filter.status)
            .bind(filter.shop_id)
            .bind(filter.collector_id)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every payment of one shop matching `filter`, for printed reports.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn report(
        &self,
        shop_id: ShopId,
        filter: &PaymentFilter,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let filter = PaymentFilter {
            shop_id: None,
            ..*filter
        };
        self.report_filtered(Tenant::Shop(shop_id), &filter).await
    }

    /// Every payment across a business matching `filter`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn report_for_business(
        &self,
        business_id: BusinessId,
        filter: &PaymentFilter,
    ) -> Result<Vec<Payment>, RepositoryError> {
        self.report_filtered(Tenant::Business(business_id), filter)
            .await
    }

    /// Payments against one purchase, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_purchase(
        &self,
        purchase_id: PurchaseId,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let sql = format!("{PAYMENT_SELECT} WHERE pay.purchase_id = $1 ORDER BY pay.paid_at DESC");
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(purchase_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Payments of one customer across all their purchases, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        shop_id: ShopId,
        customer_id: CustomerId,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let sql = format!(
            "{PAYMENT_SELECT} WHERE pay.shop_id = $1 AND p.customer_id = $2
             ORDER BY pay.paid_at DESC"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(shop_id)
            .bind(customer_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a payment, only if it belongs to `shop_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_in_shop(
        &self,
        shop_id: ShopId,
        id: PaymentId,
    ) -> Result<Option<Payment>, RepositoryError> {
        let sql = format!("{PAYMENT_SELECT} WHERE pay.shop_id = $1 AND pay.id = $2");
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(shop_id)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    // =========================================================================
    // Transactional writes
    // =========================================================================

    /// Insert a payment. With `confirmed_by` set it is stored as completed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate reference.
    pub async fn insert(
        conn: &mut PgConnection,
        payment: &NewPayment,
    ) -> Result<PaymentId, RepositoryError> {
        let status = if payment.confirmed_by.is_some() {
            PaymentStatus::Completed
        } else {
            PaymentStatus::Pending
        };

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO payments
                (purchase_id, shop_id, amount, method, status, is_confirmed, collector_id,
                 recorded_by_membership_id, confirmed_by_membership_id, reference, notes,
                 paid_at, confirmed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    CASE WHEN $6 THEN NOW() END)
            RETURNING id
            ",
        )
        .bind(payment.purchase_id)
        .bind(payment.shop_id)
        .bind(payment.amount)
        .bind(payment.method)
        .bind(status)
        .bind(payment.confirmed_by.is_some())
        .bind(payment.collector_id)
        .bind(payment.recorded_by)
        .bind(payment.confirmed_by)
        .bind(&payment.reference)
        .bind(payment.notes.as_deref())
        .bind(payment.paid_at)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| conflict_on_unique(e, "payment reference"))?;

        Ok(PaymentId::new(id))
    }

    /// Lock a payment row for the rest of the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        shop_id: ShopId,
        id: PaymentId,
    ) -> Result<Option<PaymentLock>, RepositoryError> {
        let row = sqlx::query_as::<_, LockRow>(
            r"
            SELECT id, purchase_id, amount, status, is_confirmed
            FROM payments
            WHERE shop_id = $1 AND id = $2
            FOR UPDATE
            ",
        )
        .bind(shop_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row.map(|r| PaymentLock {
            id: PaymentId::new(r.id),
            purchase_id: PurchaseId::new(r.purchase_id),
            amount: r.amount,
            status: r.status,
            is_confirmed: r.is_confirmed,
        }))
    }

    /// Record the decision on a locked payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the payment does not exist.
    pub async fn mark_decided(
        conn: &mut PgConnection,
        id: PaymentId,
        status: PaymentStatus,
        decided_by: MembershipId,
        rejection_reason: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE payments
            SET status = $2,
                is_confirmed = ($2 = 'COMPLETED'::payment_status),
                confirmed_by_membership_id = $3,
                confirmed_at = NOW(),
                rejection_reason = $4
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status)
        .bind(decided_by)
        .bind(rejection_reason)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
