//! Shop catalogue.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::instrument;

use hire_purchase_core::{ActionResult, ProductId};

use crate::components::data_table::products_table_config;
use crate::components::{DataTable, ListQuery};
use crate::db::ProductRepository;
use crate::error::{ActionError, ActionJson, ActionResponse, AppError};
use crate::filters;
use crate::middleware::RequireShopAdmin;
use crate::models::{Portal, Product, ProductInput};
use crate::routes::PageChrome;
use crate::state::AppState;

const PATH: &str = "/shop-admin/products";

/// Product table template.
#[derive(Template, WebTemplate)]
#[template(path = "shop_admin/products.html")]
pub struct ProductsTemplate {
    pub chrome: PageChrome,
    pub table: DataTable,
    pub products: Vec<Product>,
}

fn validate(input: &ProductInput) -> Result<(), ActionError> {
    if input.name.trim().is_empty() {
        return Err(ActionError::bad_request("Product name is required"));
    }
    if !input.price.is_positive() {
        return Err(ActionError::bad_request("Price must be greater than zero"));
    }
    Ok(())
}

/// Every product of the shop, active first.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn index(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ProductsTemplate, AppError> {
    let page = ProductRepository::new(state.pool())
        .list(ctx.shop.id, &query.params())
        .await?;

    Ok(ProductsTemplate {
        chrome: PageChrome::shop(Portal::ShopAdmin, &ctx, "Products", PATH),
        table: DataTable::new(products_table_config(), PATH, query, &page),
        products: page.items,
    })
}

/// Add a product to the catalogue.
#[instrument(skip(ctx, state, input), fields(shop_id = %ctx.shop.id))]
pub async fn create(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    ActionJson(input): ActionJson<ProductInput>,
) -> ActionResponse<Product> {
    validate(&input)?;
    let product = ProductRepository::new(state.pool())
        .create(ctx.shop.id, &input)
        .await?;

    tracing::info!(product_id = %product.id, "Product created");
    Ok(Json(ActionResult::ok(product)))
}

/// Edit a product. Existing purchases keep the name and price they were sold at.
#[instrument(skip(ctx, state, input), fields(shop_id = %ctx.shop.id))]
pub async fn update(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ActionJson(input): ActionJson<ProductInput>,
) -> ActionResponse<Product> {
    validate(&input)?;
    let product = ProductRepository::new(state.pool())
        .update(ctx.shop.id, ProductId::new(id), &input)
        .await?;
    Ok(Json(ActionResult::ok(product)))
}
