//! Business (tenant) repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use hire_purchase_core::{BusinessId, CurrencyCode, Money};

use super::shops::ShopRow;
use super::{RepositoryError, conflict_on_unique};
use crate::models::{Business, ShopSummary};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BusinessRow {
    pub(crate) id: i32,
    pub(crate) name: String,
    pub(crate) slug: String,
    pub(crate) currency_code: String,
    pub(crate) created_at: DateTime<Utc>,
}

impl TryFrom<BusinessRow> for Business {
    type Error = RepositoryError;

    fn try_from(row: BusinessRow) -> Result<Self, Self::Error> {
        let currency = CurrencyCode::parse(&row.currency_code)
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: BusinessId::new(row.id),
            name: row.name,
            slug: row.slug,
            currency,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShopSummaryRow {
    #[sqlx(flatten)]
    shop: ShopRow,
    customers: i64,
    open_purchases: i64,
    overdue_purchases: i64,
    outstanding: Money,
    collected: Money,
    pending_payments: i64,
}

impl From<ShopSummaryRow> for ShopSummary {
    fn from(row: ShopSummaryRow) -> Self {
        Self {
            shop: row.shop.into(),
            customers: row.customers,
            open_purchases: row.open_purchases,
            overdue_purchases: row.overdue_purchases,
            outstanding: row.outstanding,
            collected: row.collected,
            pending_payments: row.pending_payments,
        }
    }
}

/// Repository for businesses.
pub struct BusinessRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BusinessRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a business by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BusinessId) -> Result<Option<Business>, RepositoryError> {
        let row = sqlx::query_as::<_, BusinessRow>(
            r"
            SELECT id, name, slug, currency_code, created_at
            FROM businesses
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a business by its URL slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Business>, RepositoryError> {
        let row = sqlx::query_as::<_, BusinessRow>(
            r"
            SELECT id, name, slug, currency_code, created_at
            FROM businesses
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a business.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(
        &self,
        name: &str,
        slug: &str,
        currency: &CurrencyCode,
    ) -> Result<Business, RepositoryError> {
        let row = sqlx::query_as::<_, BusinessRow>(
            r"
            INSERT INTO businesses (name, slug, currency_code)
            VALUES ($1, $2, $3)
            RETURNING id, name, slug, currency_code, created_at
            ",
        )
        .bind(name)
        .bind(slug)
        .bind(currency.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "business with this slug"))?;

        row.try_into()
    }

    /// Every shop of a business with customer, purchase and payment totals.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_shops_summary(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<ShopSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShopSummaryRow>(
            r"
            SELECT s.id, s.business_id, s.name, s.address, s.phone, s.is_active, s.created_at,
                   (SELECT COUNT(*) FROM customers c WHERE c.shop_id = s.id) AS customers,
                   (SELECT COUNT(*) FROM purchases p
                     WHERE p.shop_id = s.id
                       AND p.status IN ('PENDING', 'ACTIVE', 'OVERDUE')) AS open_purchases,
                   (SELECT COUNT(*) FROM purchases p
                     WHERE p.shop_id = s.id AND p.status = 'OVERDUE') AS overdue_purchases,
                   (SELECT COALESCE(SUM(p.outstanding_balance), 0) FROM purchases p
                     WHERE p.shop_id = s.id
                       AND p.status IN ('PENDING', 'ACTIVE', 'OVERDUE', 'DEFAULTED')) AS outstanding,
                   (SELECT COALESCE(SUM(pay.amount), 0) FROM payments pay
                     WHERE pay.shop_id = s.id AND pay.is_confirmed) AS collected,
                   (SELECT COUNT(*) FROM payments pay
                     WHERE pay.shop_id = s.id AND pay.status = 'PENDING') AS pending_payments
            FROM shops s
            WHERE s.business_id = $1
            ORDER BY s.name
            ",
        )
        .bind(business_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
