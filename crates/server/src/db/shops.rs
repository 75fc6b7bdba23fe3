//! Shop repository. Every query is scoped to one business.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use hire_purchase_core::{BusinessId, ShopId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Shop, ShopInput};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ShopRow {
    pub(crate) id: i32,
    pub(crate) business_id: i32,
    pub(crate) name: String,
    pub(crate) address: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: DateTime<Utc>,
}

impl From<ShopRow> for Shop {
    fn from(row: ShopRow) -> Self {
        Self {
            id: ShopId::new(row.id),
            business_id: BusinessId::new(row.business_id),
            name: row.name,
            address: row.address,
            phone: row.phone,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

/// Repository for shops.
pub struct ShopRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All shops of a business, active first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_business(
        &self,
        business_id: BusinessId,
    ) -> Result<Vec<Shop>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShopRow>(
            r"
            SELECT id, business_id, name, address, phone, is_active, created_at
            FROM shops
            WHERE business_id = $1
            ORDER BY is_active DESC, name
            ",
        )
        .bind(business_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a shop, only if it belongs to `business_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_in_business(
        &self,
        business_id: BusinessId,
        id: ShopId,
    ) -> Result<Option<Shop>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(
            r"
            SELECT id, business_id, name, address, phone, is_active, created_at
            FROM shops
            WHERE business_id = $1 AND id = $2
            ",
        )
        .bind(business_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the business already has a shop
    /// with this name.
    pub async fn create(
        &self,
        business_id: BusinessId,
        input: &ShopInput,
    ) -> Result<Shop, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(
            r"
            INSERT INTO shops (business_id, name, address, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id, business_id, name, address, phone, is_active, created_at
            ",
        )
        .bind(business_id)
        .bind(input.name.trim())
        .bind(input.address.as_deref())
        .bind(input.phone.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "shop with this name"))?;

        Ok(row.into())
    }

    /// Update a shop's details.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop is not in the business.
    /// Returns `RepositoryError::Conflict` on a duplicate name.
    pub async fn update(
        &self,
        business_id: BusinessId,
        id: ShopId,
        input: &ShopInput,
    ) -> Result<Shop, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(
            r"
            UPDATE shops
            SET name = $3, address = $4, phone = $5, updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING id, business_id, name, address, phone, is_active, created_at
            ",
        )
        .bind(business_id)
        .bind(id)
        .bind(input.name.trim())
        .bind(input.address.as_deref())
        .bind(input.phone.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "shop with this name"))?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Activate or deactivate a shop. Staff of inactive shops cannot sign in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop is not in the business.
    pub async fn set_active(
        &self,
        business_id: BusinessId,
        id: ShopId,
        is_active: bool,
    ) -> Result<Shop, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(
            r"
            UPDATE shops
            SET is_active = $3, updated_at = NOW()
            WHERE business_id = $1 AND id = $2
            RETURNING id, business_id, name, address, phone, is_active, created_at
            ",
        )
        .bind(business_id)
        .bind(id)
        .bind(is_active)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }
}
