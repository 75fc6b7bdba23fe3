//! Customer repository. Every query is scoped to one shop.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use hire_purchase_core::{CustomerId, MembershipId, Money, ShopId};

use super::{ListParams, Page, RepositoryError};
use crate::models::{Customer, CustomerInput, CustomerOverview};

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i32,
    shop_id: i32,
    collector_membership_id: Option<i32>,
    collector_name: Option<String>,
    name: String,
    phone: String,
    email: Option<String>,
    address: Option<String>,
    national_id: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: CustomerId::new(row.id),
            shop_id: ShopId::new(row.shop_id),
            collector_membership_id: row.collector_membership_id.map(MembershipId::new),
            collector_name: row.collector_name,
            name: row.name,
            phone: row.phone,
            email: row.email,
            address: row.address,
            national_id: row.national_id,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OverviewRow {
    #[sqlx(flatten)]
    customer: CustomerRow,
    open_purchases: i64,
    outstanding: Money,
}

impl From<OverviewRow> for CustomerOverview {
    fn from(row: OverviewRow) -> Self {
        Self {
            customer: row.customer.into(),
            open_purchases: row.open_purchases,
            outstanding: row.outstanding,
        }
    }
}

const CUSTOMER_COLUMNS: &str = r"
    c.id, c.shop_id, c.collector_membership_id, cu.name AS collector_name,
    c.name, c.phone, c.email, c.address, c.national_id, c.notes, c.created_at
";

const CUSTOMER_JOINS: &str = r"
    FROM customers c
    LEFT JOIN memberships cm ON cm.id = c.collector_membership_id
    LEFT JOIN users cu ON cu.id = cm.user_id
";

const LIST_FILTER: &str = r"
    WHERE c.shop_id = $1
      AND ($2::text IS NULL OR c.name ILIKE $2 OR c.phone ILIKE $2 OR c.national_id ILIKE $2)
      AND ($3::int IS NULL OR c.collector_membership_id = $3)
";

const SORTABLE: &[(&str, &str)] = &[
    ("name", "c.name"),
    ("phone", "c.phone"),
    ("collector", "collector_name"),
    ("outstanding", "outstanding"),
    ("created", "c.created_at"),
];

/// Repository for customers.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Search customers of a shop, optionally only those of one collector.
    ///
    /// Matches name, phone and national ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        shop_id: ShopId,
        params: &ListParams,
        collector: Option<MembershipId>,
    ) -> Result<Page<CustomerOverview>, RepositoryError> {
        let pattern = params.search_pattern();
        let order = params.order_by(SORTABLE, "c.name ASC");
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS},
                    (SELECT COUNT(*) FROM purchases p
                      WHERE p.customer_id = c.id
                        AND p.status IN ('PENDING', 'ACTIVE', 'OVERDUE')) AS open_purchases,
                    (SELECT COALESCE(SUM(p.outstanding_balance), 0) FROM purchases p
                      WHERE p.customer_id = c.id AND p.status <> 'COMPLETED') AS outstanding
             {CUSTOMER_JOINS}
             {LIST_FILTER}
             ORDER BY {order}
             LIMIT $4 OFFSET $5"
        );

        let rows = sqlx::query_as::<_, OverviewRow>(&sql)
            .bind(shop_id)
            .bind(pattern.as_deref())
            .bind(collector)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(self.pool)
            .await?;

        let count_sql = format!("SELECT COUNT(*) {CUSTOMER_JOINS} {LIST_FILTER}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(shop_id)
            .bind(pattern.as_deref())
            .bind(collector)
            .fetch_one(self.pool)
            .await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }

    /// Customers assigned to one collector.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_collector(
        &self,
        shop_id: ShopId,
        collector: MembershipId,
        params: &ListParams,
    ) -> Result<Page<CustomerOverview>, RepositoryError> {
        self.list(shop_id, params, Some(collector)).await
    }

    /// Every customer of a shop by name, for pickers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self, shop_id: ShopId) -> Result<Vec<Customer>, RepositoryError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} {CUSTOMER_JOINS} WHERE c.shop_id = $1 ORDER BY c.name, c.id"
        );
        let rows = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(shop_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a customer, only if it belongs to `shop_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_in_shop(
        &self,
        shop_id: ShopId,
        id: CustomerId,
    ) -> Result<Option<Customer>, RepositoryError> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} {CUSTOMER_JOINS} WHERE c.shop_id = $1 AND c.id = $2"
        );
        let row = sqlx::query_as::<_, CustomerRow>(&sql)
            .bind(shop_id)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Create a customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        shop_id: ShopId,
        input: &CustomerInput,
    ) -> Result<CustomerId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO customers
                (shop_id, collector_membership_id, name, phone, email, address, national_id, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            ",
        )
        .bind(shop_id)
        .bind(input.collector_membership_id)
        .bind(input.name.trim())
        .bind(input.phone.trim())
        .bind(input.email.as_deref())
        .bind(input.address.as_deref())
        .bind(input.national_id.as_deref())
        .bind(input.notes.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(CustomerId::new(id))
    }

    /// Update a customer, including the collector assignment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer is not in the shop.
    pub async fn update(
        &self,
        shop_id: ShopId,
        id: CustomerId,
        input: &CustomerInput,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE customers
            SET collector_membership_id = $3, name = $4, phone = $5, email = $6,
                address = $7, national_id = $8, notes = $9, updated_at = NOW()
            WHERE shop_id = $1 AND id = $2
            ",
        )
        .bind(shop_id)
        .bind(id)
        .bind(input.collector_membership_id)
        .bind(input.name.trim())
        .bind(input.phone.trim())
        .bind(input.email.as_deref())
        .bind(input.address.as_deref())
        .bind(input.national_id.as_deref())
        .bind(input.notes.as_deref())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Assign a customer to a collector, or unassign with `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer is not in the shop.
    pub async fn assign_collector(
        &self,
        shop_id: ShopId,
        id: CustomerId,
        collector: Option<MembershipId>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE customers
            SET collector_membership_id = $3, updated_at = NOW()
            WHERE shop_id = $1 AND id = $2
            ",
        )
        .bind(shop_id)
        .bind(id)
        .bind(collector)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
