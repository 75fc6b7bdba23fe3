//! Purchase repository.
//!
//! Reads go through the pool. Writes that move money take a
//! `&mut PgConnection` so the caller can run them inside its transaction,
//! after locking the purchase row with [`PurchaseRepository::lock_for_update`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use hire_purchase_core::ledger::PurchaseBalance;
use hire_purchase_core::{
    CustomerId, InstallmentFrequency, MembershipId, Money, ProductId, PurchaseId, PurchaseItemId,
    PurchaseStatus, ShopId,
};

use super::customers::CustomerRepository;
use super::{ListParams, Page, RepositoryError, conflict_on_unique};
use crate::models::{NewPurchase, Purchase, PurchaseDetail, PurchaseItem};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: i32,
    shop_id: i32,
    customer_id: i32,
    customer_name: String,
    purchase_number: String,
    status: PurchaseStatus,
    subtotal: Money,
    interest_rate: Decimal,
    interest: Money,
    total: Money,
    down_payment: Money,
    amount_paid: Money,
    outstanding_balance: Money,
    installments: i32,
    installment_frequency: InstallmentFrequency,
    installment_amount: Money,
    first_due_date: NaiveDate,
    notes: Option<String>,
    created_by_membership_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = RepositoryError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        let installments = u32::try_from(row.installments).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "purchase {} has {} installments",
                row.id, row.installments
            ))
        })?;

        Ok(Self {
            id: PurchaseId::new(row.id),
            shop_id: ShopId::new(row.shop_id),
            customer_id: CustomerId::new(row.customer_id),
            customer_name: row.customer_name,
            purchase_number: row.purchase_number,
            status: row.status,
            subtotal: row.subtotal,
            interest_rate: row.interest_rate,
            interest: row.interest,
            total: row.total,
            down_payment: row.down_payment,
            amount_paid: row.amount_paid,
            outstanding: row.outstanding_balance,
            installments,
            frequency: row.installment_frequency,
            installment_amount: row.installment_amount,
            first_due_date: row.first_due_date,
            notes: row.notes,
            created_by: MembershipId::new(row.created_by_membership_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseItemRow {
    id: i32,
    purchase_id: i32,
    product_id: Option<i32>,
    product_name: String,
    unit_price: Money,
    quantity: i32,
    line_total: Money,
}

impl From<PurchaseItemRow> for PurchaseItem {
    fn from(row: PurchaseItemRow) -> Self {
        Self {
            id: PurchaseItemId::new(row.id),
            purchase_id: PurchaseId::new(row.purchase_id),
            product_id: row.product_id.map(ProductId::new),
            product_name: row.product_name,
            unit_price: row.unit_price,
            quantity: u32::try_from(row.quantity).unwrap_or(0),
            line_total: row.line_total,
        }
    }
}

const PURCHASE_SELECT: &str = r"
    SELECT p.id, p.shop_id, p.customer_id, c.name AS customer_name, p.purchase_number,
           p.status, p.subtotal, p.interest_rate, p.interest, p.total, p.down_payment,
           p.amount_paid, p.outstanding_balance, p.installments, p.installment_frequency,
           p.installment_amount, p.first_due_date, p.notes, p.created_by_membership_id,
           p.created_at, p.updated_at, p.completed_at
    FROM purchases p
    JOIN customers c ON c.id = p.customer_id
";

const LIST_FILTER: &str = r"
    WHERE p.shop_id = $1
      AND ($2::text IS NULL OR p.purchase_number ILIKE $2 OR c.name ILIKE $2)
      AND ($3::purchase_status IS NULL OR p.status = $3)
";

const SORTABLE: &[(&str, &str)] = &[
    ("number", "p.purchase_number"),
    ("customer", "c.name"),
    ("status", "p.status"),
    ("total", "p.total"),
    ("outstanding", "p.outstanding_balance"),
    ("due", "p.first_due_date"),
    ("created", "p.created_at"),
];

// =============================================================================
// Repository
// =============================================================================

/// Repository for purchases and their items.
pub struct PurchaseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PurchaseRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Search purchases of a shop by number or customer name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        shop_id: ShopId,
        params: &ListParams,
        status: Option<PurchaseStatus>,
    ) -> Result<Page<Purchase>, RepositoryError> {
        let pattern = params.search_pattern();
        let order = params.order_by(SORTABLE, "p.created_at DESC");
        let sql = format!("{PURCHASE_SELECT} {LIST_FILTER} ORDER BY {order} LIMIT $4 OFFSET $5");

        let rows = sqlx::query_as::<_, PurchaseRow>(&sql)
            .bind(shop_id)
            .bind(pattern.as_deref())
            .bind(status)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(self.pool)
            .await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM purchases p JOIN customers c ON c.id = p.customer_id {LIST_FILTER}"
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(shop_id)
            .bind(pattern.as_deref())
            .bind(status)
            .fetch_one(self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, params, total))
    }

    /// All purchases of one customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        shop_id: ShopId,
        customer_id: CustomerId,
    ) -> Result<Vec<Purchase>, RepositoryError> {
        let sql = format!(
            "{PURCHASE_SELECT} WHERE p.shop_id = $1 AND p.customer_id = $2 ORDER BY p.created_at DESC"
        );
        let rows = sqlx::query_as::<_, PurchaseRow>(&sql)
            .bind(shop_id)
            .bind(customer_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a purchase, only if it belongs to `shop_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_in_shop(
        &self,
        shop_id: ShopId,
        id: PurchaseId,
    ) -> Result<Option<Purchase>, RepositoryError> {
        let sql = format!("{PURCHASE_SELECT} WHERE p.shop_id = $1 AND p.id = $2");
        let row = sqlx::query_as::<_, PurchaseRow>(&sql)
            .bind(shop_id)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Purchase with its items and customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_detail(
        &self,
        shop_id: ShopId,
        id: PurchaseId,
    ) -> Result<Option<PurchaseDetail>, RepositoryError> {
        let Some(purchase) = self.get_in_shop(shop_id, id).await? else {
            return Ok(None);
        };
        let customer = CustomerRepository::new(self.pool)
            .get_in_shop(shop_id, purchase.customer_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "purchase {id} references a customer outside its shop"
                ))
            })?;
        let items = self.items(id).await?;

        Ok(Some(PurchaseDetail {
            purchase,
            items,
            customer,
        }))
    }

    /// Line items of a purchase.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, purchase_id: PurchaseId) -> Result<Vec<PurchaseItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, PurchaseItemRow>(
            r"
            SELECT id, purchase_id, product_id, product_name, unit_price, quantity, line_total
            FROM purchase_items
            WHERE purchase_id = $1
            ORDER BY id
            ",
        )
        .bind(purchase_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Purchases that may change status with the passage of time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_open_for_sweep(&self) -> Result<Vec<Purchase>, RepositoryError> {
        let sql = format!(
            "{PURCHASE_SELECT} WHERE p.status IN ('PENDING', 'ACTIVE', 'OVERDUE') ORDER BY p.id"
        );
        let rows = sqlx::query_as::<_, PurchaseRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Change status only if neither status nor paid amount moved since
    /// `observed` was read. Returns whether the row was updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_status_if_unchanged(
        &self,
        observed: &Purchase,
        status: PurchaseStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE purchases
            SET status = $4, updated_at = NOW()
            WHERE id = $1 AND status = $2 AND amount_paid = $3
            ",
        )
        .bind(observed.id)
        .bind(observed.status)
        .bind(observed.amount_paid)
        .bind(status)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // =========================================================================
    // Transactional writes
    // =========================================================================

    /// Insert a priced purchase and its item snapshots.
    ///
    /// The down payment counts as already paid.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate purchase number.
    pub async fn insert_with_items(
        conn: &mut PgConnection,
        purchase: &NewPurchase,
    ) -> Result<PurchaseId, RepositoryError> {
        let quote = &purchase.quote;
        let installments = i32::try_from(quote.installments).map_err(|_| {
            RepositoryError::DataCorruption("installment count out of range".to_string())
        })?;

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO purchases
                (shop_id, customer_id, purchase_number, status, subtotal, interest_rate,
                 interest, total, down_payment, amount_paid, outstanding_balance,
                 installments, installment_frequency, installment_amount, first_due_date,
                 notes, created_by_membership_id, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10, $11, $12, $13, $14, $15, $16,
                    CASE WHEN $4 = 'COMPLETED'::purchase_status THEN NOW() END)
            RETURNING id
            ",
        )
        .bind(purchase.shop_id)
        .bind(purchase.customer_id)
        .bind(&purchase.purchase_number)
        .bind(quote.initial_status)
        .bind(quote.subtotal)
        .bind(purchase.interest_rate)
        .bind(quote.interest)
        .bind(quote.total)
        .bind(quote.down_payment)
        .bind(quote.outstanding)
        .bind(installments)
        .bind(purchase.frequency)
        .bind(quote.installment_amount)
        .bind(purchase.first_due_date)
        .bind(purchase.notes.as_deref())
        .bind(purchase.created_by)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| conflict_on_unique(e, "purchase number"))?;

        for item in &purchase.items {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                RepositoryError::DataCorruption("item quantity out of range".to_string())
            })?;
            sqlx::query(
                r"
                INSERT INTO purchase_items
                    (purchase_id, product_id, product_name, unit_price, quantity, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.unit_price)
            .bind(quantity)
            .bind(item.line_total)
            .execute(&mut *conn)
            .await?;
        }

        Ok(PurchaseId::new(id))
    }

    /// Lock a purchase row for the rest of the transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        shop_id: ShopId,
        id: PurchaseId,
    ) -> Result<Option<Purchase>, RepositoryError> {
        let sql = format!("{PURCHASE_SELECT} WHERE p.shop_id = $1 AND p.id = $2 FOR UPDATE OF p");
        let row = sqlx::query_as::<_, PurchaseRow>(&sql)
            .bind(shop_id)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Store a new balance. Sets `completed_at` when the purchase completes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the purchase does not exist.
    pub async fn update_balance(
        conn: &mut PgConnection,
        id: PurchaseId,
        balance: &PurchaseBalance,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE purchases
            SET amount_paid = $2,
                outstanding_balance = $3,
                status = $4,
                completed_at = CASE WHEN $4 = 'COMPLETED'::purchase_status
                                    THEN COALESCE(completed_at, NOW()) END,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(balance.amount_paid)
        .bind(balance.outstanding)
        .bind(balance.status)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set the status of a locked purchase.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the purchase does not exist.
    pub async fn set_status(
        conn: &mut PgConnection,
        id: PurchaseId,
        status: PurchaseStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE purchases
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
