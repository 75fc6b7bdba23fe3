//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                   - Portal chooser
//!
//! # Auth (one set per portal)
//! GET  /{portal}/login                     - Login page
//! POST /{portal}/login                     - Login form
//! POST /{portal}/logout                    - Logout
//!
//! # Business admin
//! GET  /business-admin                     - Dashboard
//! GET  /business-admin/shops               - Shop table
//! GET  /business-admin/shops/{id}          - Shop detail
//! GET  /business-admin/payments            - Cross-shop payment report
//! GET  /business-admin/payments/print      - Printable payment report
//!
//! # Shop admin
//! GET  /shop-admin                         - Dashboard
//! GET  /shop-admin/products                - Product table
//! GET  /shop-admin/collectors              - Collector table
//! GET  /shop-admin/customers               - Customer table
//! GET  /shop-admin/customers/{id}          - Customer detail
//! GET  /shop-admin/purchases               - Purchase table
//! GET  /shop-admin/purchases/new           - New purchase form
//! GET  /shop-admin/purchases/{id}          - Purchase detail
//! GET  /shop-admin/purchases/{id}/invoice  - Printable invoice
//! GET  /shop-admin/purchases/{id}/bill     - Printable statement
//! GET  /shop-admin/payments                - Payment table
//! GET  /shop-admin/payments/print          - Printable payment report
//! GET  /shop-admin/payments/{id}/receipt   - Printable receipt
//!
//! # Collector
//! GET  /collector                          - Dashboard
//! GET  /collector/customers                - Assigned customers
//! GET  /collector/customers/{id}           - Customer detail and payment form
//! GET  /collector/payments                 - Own payments
//! GET  /collector/payments/{id}/receipt    - Printable receipt
//!
//! # Actions (JSON in, `ActionResult` out)
//! POST /api/business-admin/shops[/{id}[/active|/admins]]
//! GET  /api/business-admin/stats
//! POST /api/shop-admin/products[/{id}]
//! POST /api/shop-admin/collectors[/{id}/active]
//! POST /api/shop-admin/customers[/{id}[/collector]]
//! POST /api/shop-admin/purchases[/{id}/default]
//! POST /api/shop-admin/payments[/{id}/confirm|/{id}/reject]
//! GET  /api/shop-admin/stats
//! POST /api/collector/payments
//! ```

pub mod auth;
pub mod business_admin;
pub mod collector;
pub mod home;
pub mod print;
pub mod shop_admin;
pub mod views;

use axum::{Router, routing::get};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;

use crate::db::{RepositoryError, StatsRepository};
use crate::error::AppError;
use crate::middleware::{BusinessContext, ShopContext};
use crate::models::{ChartSeries, Portal, StatsScope};
use crate::state::AppState;

/// Months shown on the collections chart.
pub const CHART_MONTHS: u32 = 6;

// =============================================================================
// Page chrome
// =============================================================================

/// Navigation entry in the portal header.
#[derive(Debug, Clone)]
pub struct NavLink {
    pub href: &'static str,
    pub label: &'static str,
    pub active: bool,
}

const BUSINESS_ADMIN_NAV: &[(&str, &str)] = &[
    ("/business-admin", "Dashboard"),
    ("/business-admin/shops", "Shops"),
    ("/business-admin/payments", "Payments"),
];

const SHOP_ADMIN_NAV: &[(&str, &str)] = &[
    ("/shop-admin", "Dashboard"),
    ("/shop-admin/customers", "Customers"),
    ("/shop-admin/purchases", "Purchases"),
    ("/shop-admin/payments", "Payments"),
    ("/shop-admin/products", "Products"),
    ("/shop-admin/collectors", "Collectors"),
];

const COLLECTOR_NAV: &[(&str, &str)] = &[
    ("/collector", "Dashboard"),
    ("/collector/customers", "My customers"),
    ("/collector/payments", "My payments"),
];

/// Header, navigation and currency shared by every portal page.
#[derive(Debug, Clone)]
pub struct PageChrome {
    pub title: String,
    pub portal: Portal,
    pub user_name: String,
    /// Business name, plus the shop for shop portals.
    pub organisation: String,
    pub currency: String,
    pub nav: Vec<NavLink>,
}

impl PageChrome {
    fn build(
        portal: Portal,
        title: &str,
        current: &str,
        user_name: &str,
        organisation: String,
        currency: String,
    ) -> Self {
        let links = match portal {
            Portal::BusinessAdmin => BUSINESS_ADMIN_NAV,
            Portal::ShopAdmin => SHOP_ADMIN_NAV,
            Portal::Collector => COLLECTOR_NAV,
        };
        let nav = links
            .iter()
            .map(|&(href, label)| NavLink {
                href,
                label,
                active: if href == portal.home_path() {
                    current == href
                } else {
                    current.starts_with(href)
                },
            })
            .collect();

        Self {
            title: title.to_string(),
            portal,
            user_name: user_name.to_string(),
            organisation,
            currency,
            nav,
        }
    }

    #[must_use]
    pub fn business_admin(ctx: &BusinessContext, title: &str, current: &str) -> Self {
        Self::build(
            Portal::BusinessAdmin,
            title,
            current,
            &ctx.user_name,
            ctx.business.name.clone(),
            ctx.business.currency.symbol().to_string(),
        )
    }

    #[must_use]
    pub fn shop(portal: Portal, ctx: &ShopContext, title: &str, current: &str) -> Self {
        Self::build(
            portal,
            title,
            current,
            &ctx.user_name,
            format!("{} \u{b7} {}", ctx.business.name, ctx.shop.name),
            ctx.business.currency.symbol().to_string(),
        )
    }

    #[must_use]
    pub const fn logout_path(&self) -> &'static str {
        self.portal.logout_path()
    }
}

#[cfg(test)]
impl PageChrome {
    /// Chrome for rendering a page template without a signed-in context.
    pub(crate) fn for_tests(portal: Portal, current: &str) -> Self {
        Self::build(portal, "Test", current, "Tester", "Acme".to_string(), "KSh".to_string())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Today's date in UTC; due dates and overdue checks use it.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Map a missing row to a 404 page.
pub(crate) fn found<T>(value: Option<T>, what: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::NotFound(what.to_string()))
}

/// Status breakdown and monthly collections for a dashboard chart.
pub(crate) async fn chart_series(
    pool: &PgPool,
    scope: StatsScope,
    today: NaiveDate,
) -> Result<ChartSeries, RepositoryError> {
    let stats = StatsRepository::new(pool);
    Ok(ChartSeries {
        statuses: stats.status_breakdown(scope).await?,
        monthly: stats.monthly_collections(scope, today, CHART_MONTHS).await?,
    })
}

/// Body of the activate/deactivate actions.
#[derive(Debug, Deserialize)]
pub struct ActiveInput {
    pub is_active: bool,
}

/// Trimmed optional text; blank means absent.
pub(crate) fn clean(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// Router
// =============================================================================

/// Create all page and action routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/business-admin", business_admin::routes())
        .nest("/shop-admin", shop_admin::routes())
        .nest("/collector", collector::routes())
        .nest("/api/business-admin", business_admin::api_routes())
        .nest("/api/shop-admin", shop_admin::api_routes())
        .nest("/api/collector", collector::api_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_marks_current_section() {
        let chrome = PageChrome::build(
            Portal::ShopAdmin,
            "Purchases",
            "/shop-admin/purchases/12",
            "Ann",
            "Acme".to_string(),
            "KSh".to_string(),
        );
        let active: Vec<&str> = chrome
            .nav
            .iter()
            .filter(|l| l.active)
            .map(|l| l.label)
            .collect();
        assert_eq!(active, vec!["Purchases"]);
    }

    #[test]
    fn test_dashboard_link_is_exact() {
        let chrome = PageChrome::build(
            Portal::Collector,
            "Dashboard",
            "/collector",
            "Bo",
            "Acme".to_string(),
            "KSh".to_string(),
        );
        assert!(chrome.nav.iter().any(|l| l.label == "Dashboard" && l.active));
        assert!(!chrome.nav.iter().any(|l| l.label == "My payments" && l.active));
        assert_eq!(chrome.logout_path(), "/collector/logout");
    }
}
