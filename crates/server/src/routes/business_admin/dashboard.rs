//! Business admin dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, extract::State};
use tracing::instrument;

use hire_purchase_core::ActionResult;

use crate::db::{BusinessRepository, StatsRepository};
use crate::error::{ActionResponse, AppError};
use crate::filters;
use crate::middleware::RequireBusinessAdmin;
use crate::models::{BusinessStats, ChartSeries, ShopSummary, StatsScope};
use crate::routes::{PageChrome, chart_series, today};
use crate::state::AppState;

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "business_admin/dashboard.html")]
pub struct DashboardTemplate {
    pub chrome: PageChrome,
    pub stats: BusinessStats,
    pub shops: Vec<ShopSummary>,
    pub chart: ChartSeries,
    pub stats_url: &'static str,
}

/// Headline numbers, per-shop summary and charts.
#[instrument(skip(ctx, state), fields(business_id = %ctx.business.id))]
pub async fn index(
    RequireBusinessAdmin(ctx): RequireBusinessAdmin,
    State(state): State<AppState>,
) -> Result<DashboardTemplate, AppError> {
    let today = today();
    let scope = StatsScope::Business(ctx.business.id);

    let stats = StatsRepository::new(state.pool())
        .business_stats(ctx.business.id, today)
        .await?;
    let shops = BusinessRepository::new(state.pool())
        .list_shops_summary(ctx.business.id)
        .await?;
    let chart = chart_series(state.pool(), scope, today).await?;

    Ok(DashboardTemplate {
        chrome: PageChrome::business_admin(&ctx, "Dashboard", "/business-admin"),
        stats,
        shops,
        chart,
        stats_url: "/api/business-admin/stats",
    })
}

/// Chart series for the dashboard script.
#[instrument(skip(ctx, state), fields(business_id = %ctx.business.id))]
pub async fn stats(
    RequireBusinessAdmin(ctx): RequireBusinessAdmin,
    State(state): State<AppState>,
) -> ActionResponse<ChartSeries> {
    let chart = chart_series(state.pool(), StatsScope::Business(ctx.business.id), today()).await?;
    Ok(Json(ActionResult::ok(chart)))
}
