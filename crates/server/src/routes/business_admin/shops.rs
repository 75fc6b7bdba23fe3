//! Shop management for the business admin.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use hire_purchase_core::{ActionResult, MembershipRole, ShopId};

use crate::db::{BusinessRepository, MembershipRepository, ShopRepository, StatsRepository};
use crate::error::{ActionError, ActionJson, ActionResponse, AppError};
use crate::filters;
use crate::middleware::{BusinessContext, RequireBusinessAdmin};
use crate::models::{CollectorSummary, Shop, ShopInput, ShopStats, ShopSummary, StaffMember};
use crate::routes::{ActiveInput, PageChrome, found, today};
use crate::services::{StaffInput, StaffService};
use crate::state::AppState;

/// Shop table template.
#[derive(Template, WebTemplate)]
#[template(path = "business_admin/shops.html")]
pub struct ShopsTemplate {
    pub chrome: PageChrome,
    pub shops: Vec<ShopSummary>,
}

/// Shop detail template.
#[derive(Template, WebTemplate)]
#[template(path = "business_admin/shop_detail.html")]
pub struct ShopDetailTemplate {
    pub chrome: PageChrome,
    pub shop: Shop,
    pub stats: ShopStats,
    pub admins: Vec<StaffMember>,
    pub collectors: Vec<CollectorSummary>,
}

fn validate(input: &ShopInput) -> Result<(), ActionError> {
    if input.name.trim().is_empty() {
        return Err(ActionError::bad_request("Shop name is required"));
    }
    Ok(())
}

async fn shop_of(ctx: &BusinessContext, state: &AppState, id: ShopId) -> Result<Shop, AppError> {
    let shop = ShopRepository::new(state.pool())
        .get_in_business(ctx.business.id, id)
        .await?;
    found(shop, "Shop")
}

/// Every shop with its headline numbers.
#[instrument(skip(ctx, state), fields(business_id = %ctx.business.id))]
pub async fn index(
    RequireBusinessAdmin(ctx): RequireBusinessAdmin,
    State(state): State<AppState>,
) -> Result<ShopsTemplate, AppError> {
    let shops = BusinessRepository::new(state.pool())
        .list_shops_summary(ctx.business.id)
        .await?;

    Ok(ShopsTemplate {
        chrome: PageChrome::business_admin(&ctx, "Shops", "/business-admin/shops"),
        shops,
    })
}

/// One shop: stats, admins and collectors.
#[instrument(skip(ctx, state), fields(business_id = %ctx.business.id))]
pub async fn show(
    RequireBusinessAdmin(ctx): RequireBusinessAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ShopDetailTemplate, AppError> {
    let shop = shop_of(&ctx, &state, ShopId::new(id)).await?;
    let memberships = MembershipRepository::new(state.pool());

    let stats = StatsRepository::new(state.pool())
        .shop_stats(shop.id, today())
        .await?;
    let admins = memberships
        .list_for_shop(shop.id, MembershipRole::ShopAdmin)
        .await?;
    let collectors = memberships.collector_summaries(shop.id).await?;

    Ok(ShopDetailTemplate {
        chrome: PageChrome::business_admin(&ctx, &shop.name, "/business-admin/shops"),
        shop,
        stats,
        admins,
        collectors,
    })
}

/// Create a shop.
#[instrument(skip(ctx, state, input), fields(business_id = %ctx.business.id))]
pub async fn create(
    RequireBusinessAdmin(ctx): RequireBusinessAdmin,
    State(state): State<AppState>,
    ActionJson(input): ActionJson<ShopInput>,
) -> ActionResponse<Shop> {
    validate(&input)?;
    let shop = ShopRepository::new(state.pool())
        .create(ctx.business.id, &input)
        .await?;

    tracing::info!(shop_id = %shop.id, "Shop created");
    Ok(Json(ActionResult::ok(shop)))
}

/// Update a shop's name and contact details.
#[instrument(skip(ctx, state, input), fields(business_id = %ctx.business.id))]
pub async fn update(
    RequireBusinessAdmin(ctx): RequireBusinessAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ActionJson(input): ActionJson<ShopInput>,
) -> ActionResponse<Shop> {
    validate(&input)?;
    let shop = ShopRepository::new(state.pool())
        .update(ctx.business.id, ShopId::new(id), &input)
        .await?;
    Ok(Json(ActionResult::ok(shop)))
}

/// Activate or deactivate a shop.
///
/// Staff of an inactive shop are turned away on their next request.
#[instrument(skip(ctx, state, input), fields(business_id = %ctx.business.id))]
pub async fn set_active(
    RequireBusinessAdmin(ctx): RequireBusinessAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ActionJson(input): ActionJson<ActiveInput>,
) -> ActionResponse<Shop> {
    let shop = ShopRepository::new(state.pool())
        .set_active(ctx.business.id, ShopId::new(id), input.is_active)
        .await?;

    tracing::info!(shop_id = %shop.id, is_active = shop.is_active, "Shop status changed");
    Ok(Json(ActionResult::ok(shop)))
}

/// Add a shop admin, creating the user if the email is new.
#[instrument(skip(ctx, state, input), fields(business_id = %ctx.business.id))]
pub async fn add_admin(
    RequireBusinessAdmin(ctx): RequireBusinessAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ActionJson(input): ActionJson<StaffInput>,
) -> ActionResponse<StaffMember> {
    let shop = shop_of(&ctx, &state, ShopId::new(id)).await?;
    let staff = StaffService::new(state.pool())
        .add(ctx.business.id, shop.id, MembershipRole::ShopAdmin, &input)
        .await?;
    Ok(Json(ActionResult::ok(staff)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shop_name_required() {
        let input = ShopInput {
            name: "  ".to_string(),
            address: None,
            phone: None,
        };
        assert!(validate(&input).is_err());

        let input = ShopInput {
            name: "Westlands".to_string(),
            address: None,
            phone: None,
        };
        assert!(validate(&input).is_ok());
    }
}
