//! Database operations for the hire-purchase `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `users` - Staff accounts (argon2 password hashes)
//! - `businesses` - Tenants
//! - `shops` - Branches of a business
//! - `memberships` - User roles inside a business or shop
//! - `customers` - Shop customers, optionally assigned to a collector
//! - `products` - Shop catalogue
//! - `purchases` / `purchase_items` - Hire-purchase agreements
//! - `payments` - Money received, confirmed or pending
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p hire-purchase-cli -- migrate
//! ```
//!
//! Every query made on behalf of a shop role filters by `shop_id`; business
//! admin queries filter by `business_id`.

pub mod businesses;
pub mod customers;
pub mod memberships;
pub mod payments;
pub mod products;
pub mod purchases;
pub mod shops;
pub mod stats;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use businesses::BusinessRepository;
pub use customers::CustomerRepository;
pub use memberships::MembershipRepository;
pub use payments::PaymentRepository;
pub use products::ProductRepository;
pub use purchases::PurchaseRepository;
pub use shops::ShopRepository;
pub use stats::StatsRepository;
pub use users::UserRepository;

/// Rows per page on list screens.
pub const PER_PAGE: u32 = 25;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map unique violations to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(2.min(max_connections))
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Search, sort and paging options shared by list queries.
///
/// `sort` is a column key; each repository maps it through its own
/// whitelist, so arbitrary input never reaches the SQL text.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub descending: bool,
    /// 1-based page number.
    pub page: u32,
}

impl ListParams {
    /// `ILIKE` pattern for the search term, if any.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let escaped = s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
                format!("%{escaped}%")
            })
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(PER_PAGE)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * i64::from(PER_PAGE)
    }

    /// `ORDER BY` clause from a `(key, sql)` whitelist.
    ///
    /// Unknown keys fall back to `default`, which is used verbatim.
    #[must_use]
    pub fn order_by(&self, whitelist: &[(&str, &str)], default: &str) -> String {
        let column = self
            .sort
            .as_deref()
            .and_then(|key| whitelist.iter().find(|(k, _)| *k == key))
            .map(|(_, sql)| *sql);

        match column {
            Some(sql) => {
                let dir = if self.descending { "DESC" } else { "ASC" };
                format!("{sql} {dir}")
            }
            None => default.to_string(),
        }
    }
}

/// One page of list results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, params: &ListParams, total: i64) -> Self {
        Self {
            items,
            page: params.page.max(1),
            total,
        }
    }

    #[must_use]
    pub fn total_pages(&self) -> u32 {
        let per_page = i64::from(PER_PAGE);
        let pages = (self.total + per_page - 1) / per_page;
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let params = ListParams {
            search: Some(" 50%_off ".to_string()),
            ..Default::default()
        };
        assert_eq!(params.search_pattern().as_deref(), Some("%50\\%\\_off%"));

        let blank = ListParams {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.search_pattern().is_none());
    }

    #[test]
    fn test_offset_is_one_based() {
        let mut params = ListParams::default();
        assert_eq!(params.offset(), 0);
        params.page = 3;
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn test_order_by_uses_whitelist() {
        let whitelist = [("name", "c.name"), ("created", "c.created_at")];
        let params = ListParams {
            sort: Some("name".to_string()),
            descending: true,
            ..Default::default()
        };
        assert_eq!(params.order_by(&whitelist, "c.id DESC"), "c.name DESC");

        let injected = ListParams {
            sort: Some("name; DROP TABLE users".to_string()),
            ..Default::default()
        };
        assert_eq!(injected.order_by(&whitelist, "c.id DESC"), "c.id DESC");
    }

    #[test]
    fn test_page_math() {
        let params = ListParams {
            page: 2,
            ..Default::default()
        };
        let page: Page<u8> = Page::new(vec![], &params, 51);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_prev());

        let empty: Page<u8> = Page::new(vec![], &ListParams::default(), 0);
        assert_eq!(empty.total_pages(), 1);
        assert!(!empty.has_next());
        assert!(!empty.has_prev());
    }
}
