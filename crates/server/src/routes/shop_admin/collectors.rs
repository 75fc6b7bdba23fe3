//! Collector management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use hire_purchase_core::{ActionResult, MembershipId, MembershipRole};

use crate::db::MembershipRepository;
use crate::error::{ActionJson, ActionResponse, AppError};
use crate::filters;
use crate::middleware::RequireShopAdmin;
use crate::models::{CollectorSummary, Portal, StaffMember};
use crate::routes::{ActiveInput, PageChrome};
use crate::services::{StaffInput, StaffService};
use crate::state::AppState;

/// Collector table template.
#[derive(Template, WebTemplate)]
#[template(path = "shop_admin/collectors.html")]
pub struct CollectorsTemplate {
    pub chrome: PageChrome,
    pub collectors: Vec<CollectorSummary>,
}

/// Collectors with their workload and collection totals.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn index(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
) -> Result<CollectorsTemplate, AppError> {
    let collectors = MembershipRepository::new(state.pool())
        .collector_summaries(ctx.shop.id)
        .await?;

    Ok(CollectorsTemplate {
        chrome: PageChrome::shop(Portal::ShopAdmin, &ctx, "Collectors", "/shop-admin/collectors"),
        collectors,
    })
}

/// Add a collector, creating the user if the email is new.
#[instrument(skip(ctx, state, input), fields(shop_id = %ctx.shop.id))]
pub async fn create(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    ActionJson(input): ActionJson<StaffInput>,
) -> ActionResponse<StaffMember> {
    let staff = StaffService::new(state.pool())
        .add(ctx.business.id, ctx.shop.id, MembershipRole::Collector, &input)
        .await?;
    Ok(Json(ActionResult::ok(staff)))
}

/// Activate or deactivate a collector.
///
/// A deactivated collector keeps their customers and history but can no
/// longer sign in or record payments.
#[instrument(skip(ctx, state, input), fields(shop_id = %ctx.shop.id))]
pub async fn set_active(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ActionJson(input): ActionJson<ActiveInput>,
) -> ActionResponse {
    let id = MembershipId::new(id);
    MembershipRepository::new(state.pool())
        .set_active(ctx.shop.id, id, MembershipRole::Collector, input.is_active)
        .await?;

    tracing::info!(membership_id = %id, is_active = input.is_active, "Collector status changed");
    Ok(Json(ActionResult::ok_empty()))
}
