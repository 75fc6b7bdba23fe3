//! Product repository. Every query is scoped to one shop.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use hire_purchase_core::{Money, ProductId, ShopId};

use super::{ListParams, Page, RepositoryError};
use crate::models::{Product, ProductInput};

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    shop_id: i32,
    name: String,
    sku: Option<String>,
    price: Money,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            shop_id: ShopId::new(row.shop_id),
            name: row.name,
            sku: row.sku,
            price: row.price,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

const SORTABLE: &[(&str, &str)] = &[
    ("name", "name"),
    ("sku", "sku"),
    ("price", "price"),
    ("created", "created_at"),
];

/// Repository for products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Search products by name or SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        shop_id: ShopId,
        params: &ListParams,
    ) -> Result<Page<Product>, RepositoryError> {
        let pattern = params.search_pattern();
        let order = params.order_by(SORTABLE, "is_active DESC, name ASC");
        let sql = format!(
            "SELECT id, shop_id, name, sku, price, is_active, created_at
             FROM products
             WHERE shop_id = $1 AND ($2::text IS NULL OR name ILIKE $2 OR sku ILIKE $2)
             ORDER BY {order}
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(shop_id)
            .bind(pattern.as_deref())
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM products
            WHERE shop_id = $1 AND ($2::text IS NULL OR name ILIKE $2 OR sku ILIKE $2)
            ",
        )
        .bind(shop_id)
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(Page::new(
            rows.into_iter().map(Into::into).collect(),
            params,
            total,
        ))
    }

    /// Active products, for the purchase form.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self, shop_id: ShopId) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, shop_id, name, sku, price, is_active, created_at
            FROM products
            WHERE shop_id = $1 AND is_active
            ORDER BY name
            ",
        )
        .bind(shop_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a product, only if it belongs to `shop_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_in_shop(
        &self,
        shop_id: ShopId,
        id: ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, shop_id, name, sku, price, is_active, created_at
            FROM products
            WHERE shop_id = $1 AND id = $2
            ",
        )
        .bind(shop_id)
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        shop_id: ShopId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO products (shop_id, name, sku, price, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, shop_id, name, sku, price, is_active, created_at
            ",
        )
        .bind(shop_id)
        .bind(input.name.trim())
        .bind(input.sku.as_deref())
        .bind(input.price.rounded())
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Update a product. Existing purchases keep their price snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the shop.
    pub async fn update(
        &self,
        shop_id: ShopId,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE products
            SET name = $3, sku = $4, price = $5, is_active = $6, updated_at = NOW()
            WHERE shop_id = $1 AND id = $2
            RETURNING id, shop_id, name, sku, price, is_active, created_at
            ",
        )
        .bind(shop_id)
        .bind(id)
        .bind(input.name.trim())
        .bind(input.sku.as_deref())
        .bind(input.price.rounded())
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }
}
