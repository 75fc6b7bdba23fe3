//! Collector portal.
//!
//! Collectors see only the customers assigned to them and record payments
//! in the field. Those payments stay provisional until a shop admin
//! confirms them.

pub mod customers;
pub mod dashboard;
pub mod payments;

use axum::{
    Router,
    routing::{get, post},
};

use super::auth;
use crate::models::Portal;
use crate::state::AppState;

/// Pages under `/collector`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/customers", get(customers::index))
        .route("/customers/{id}", get(customers::show))
        .route("/payments", get(payments::index))
        .route("/payments/{id}/receipt", get(payments::receipt))
        .merge(auth::routes(Portal::Collector))
}

/// Actions under `/api/collector`.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/payments", post(payments::record))
}
