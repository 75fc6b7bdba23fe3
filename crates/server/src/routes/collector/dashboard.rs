//! Collector dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::db::{ListParams, PaymentRepository, StatsRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireCollector;
use crate::models::{CollectorStats, Payment, Portal};
use crate::routes::{PageChrome, today};
use crate::state::AppState;

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "collector/dashboard.html")]
pub struct DashboardTemplate {
    pub chrome: PageChrome,
    pub stats: CollectorStats,
    pub recent: Vec<Payment>,
}

/// Today's collections, pending totals and the latest payments.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id, membership_id = %ctx.membership_id))]
pub async fn index(
    RequireCollector(ctx): RequireCollector,
    State(state): State<AppState>,
) -> Result<DashboardTemplate, AppError> {
    let stats = StatsRepository::new(state.pool())
        .collector_stats(ctx.shop.id, ctx.membership_id, today())
        .await?;
    let recent = PaymentRepository::new(state.pool())
        .list_for_collector(
            ctx.shop.id,
            ctx.membership_id,
            &ListParams {
                sort: Some("date".to_string()),
                descending: true,
                ..ListParams::default()
            },
            None,
        )
        .await?
        .items;

    Ok(DashboardTemplate {
        chrome: PageChrome::shop(Portal::Collector, &ctx, "Dashboard", "/collector"),
        stats,
        recent,
    })
}
