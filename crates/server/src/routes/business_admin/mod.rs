//! Business admin portal.
//!
//! A business admin sees every shop of their business, manages shops and
//! their admins, and reads cross-shop payment reports.

pub mod dashboard;
pub mod payments;
pub mod shops;

use axum::{
    Router,
    routing::{get, post},
};

use super::auth;
use crate::models::Portal;
use crate::state::AppState;

/// Pages under `/business-admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/shops", get(shops::index))
        .route("/shops/{id}", get(shops::show))
        .route("/payments", get(payments::index))
        .route("/payments/print", get(payments::print))
        .merge(auth::routes(Portal::BusinessAdmin))
}

/// Actions under `/api/business-admin`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/shops", post(shops::create))
        .route("/shops/{id}", post(shops::update))
        .route("/shops/{id}/active", post(shops::set_active))
        .route("/shops/{id}/admins", post(shops::add_admin))
        .route("/stats", get(dashboard::stats))
}
