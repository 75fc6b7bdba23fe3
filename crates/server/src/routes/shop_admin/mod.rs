//! Shop admin portal.
//!
//! A shop admin runs one shop: catalogue, customers, purchases, collectors,
//! and the confirmation queue for payments collected in the field.

pub mod collectors;
pub mod customers;
pub mod dashboard;
pub mod payments;
pub mod products;
pub mod purchases;

use axum::{
    Router,
    routing::{get, post},
};

use super::auth;
use crate::models::Portal;
use crate::state::AppState;

/// Pages under `/shop-admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/products", get(products::index))
        .route("/collectors", get(collectors::index))
        .route("/customers", get(customers::index))
        .route("/customers/{id}", get(customers::show))
        .route("/purchases", get(purchases::index))
        .route("/purchases/new", get(purchases::new_form))
        .route("/purchases/{id}", get(purchases::show))
        .route("/purchases/{id}/invoice", get(purchases::invoice))
        .route("/purchases/{id}/bill", get(purchases::bill))
        .route("/payments", get(payments::index))
        .route("/payments/print", get(payments::print))
        .route("/payments/{id}/receipt", get(payments::receipt))
        .merge(auth::routes(Portal::ShopAdmin))
}

/// Actions under `/api/shop-admin`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(products::create))
        .route("/products/{id}", post(products::update))
        .route("/collectors", post(collectors::create))
        .route("/collectors/{id}/active", post(collectors::set_active))
        .route("/customers", post(customers::create))
        .route("/customers/{id}", post(customers::update))
        .route("/customers/{id}/collector", post(customers::assign_collector))
        .route("/purchases", post(purchases::create))
        .route("/purchases/{id}/default", post(purchases::mark_defaulted))
        .route("/payments", post(payments::record))
        .route("/payments/{id}/confirm", post(payments::confirm))
        .route("/payments/{id}/reject", post(payments::reject))
        .route("/stats", get(dashboard::stats))
}
