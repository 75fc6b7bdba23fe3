//! Shop admin dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, extract::State};
use tracing::instrument;

use hire_purchase_core::{ActionResult, PaymentStatus, PurchaseStatus};

use crate::db::{ListParams, PaymentRepository, PurchaseRepository, StatsRepository};
use crate::error::{ActionResponse, AppError};
use crate::filters;
use crate::middleware::RequireShopAdmin;
use crate::models::{ChartSeries, Payment, PaymentFilter, Portal, Purchase, ShopStats, StatsScope};
use crate::routes::{PageChrome, chart_series, today};
use crate::state::AppState;

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "shop_admin/dashboard.html")]
pub struct DashboardTemplate {
    pub chrome: PageChrome,
    pub stats: ShopStats,
    /// Oldest unconfirmed collector payments.
    pub pending: Vec<Payment>,
    pub overdue: Vec<Purchase>,
    pub chart: ChartSeries,
    pub stats_url: &'static str,
}

/// Confirmation queue, overdue purchases and collection charts.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn index(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
) -> Result<DashboardTemplate, AppError> {
    let today = today();
    let first_page = ListParams::default();

    let stats = StatsRepository::new(state.pool())
        .shop_stats(ctx.shop.id, today)
        .await?;
    let pending = PaymentRepository::new(state.pool())
        .list(
            ctx.shop.id,
            &first_page,
            &PaymentFilter {
                status: Some(PaymentStatus::Pending),
                ..PaymentFilter::default()
            },
        )
        .await?
        .items;
    let overdue = PurchaseRepository::new(state.pool())
        .list(ctx.shop.id, &first_page, Some(PurchaseStatus::Overdue))
        .await?
        .items;
    let chart = chart_series(state.pool(), StatsScope::Shop(ctx.shop.id), today).await?;

    Ok(DashboardTemplate {
        chrome: PageChrome::shop(Portal::ShopAdmin, &ctx, "Dashboard", "/shop-admin"),
        stats,
        pending,
        overdue,
        chart,
        stats_url: "/api/shop-admin/stats",
    })
}

/// Chart series for the dashboard script.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn stats(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
) -> ActionResponse<ChartSeries> {
    let chart = chart_series(state.pool(), StatsScope::Shop(ctx.shop.id), today()).await?;
    Ok(Json(ActionResult::ok(chart)))
}
