//! Payments recorded by the signed-in collector.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use tracing::instrument;

use hire_purchase_core::{ActionResult, PaymentId};

use crate::components::data_table::collector_payments_table_config;
use crate::components::{DataTable, ListQuery};
use crate::db::PaymentRepository;
use crate::error::{ActionError, ActionJson, ActionResponse, AppError};
use crate::filters;
use crate::middleware::RequireCollector;
use crate::models::{Payment, Portal};
use crate::routes::print::{self, ReceiptTemplate};
use crate::routes::{PageChrome, found};
use crate::services::{PaymentService, RecordPaymentInput};
use crate::state::AppState;

const PATH: &str = "/collector/payments";

/// Payment history template.
#[derive(Template, WebTemplate)]
#[template(path = "collector/payments.html")]
pub struct PaymentsTemplate {
    pub chrome: PageChrome,
    pub table: DataTable,
    pub payments: Vec<Payment>,
}

/// The collector's own payments, pending first.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id, membership_id = %ctx.membership_id))]
pub async fn index(
    RequireCollector(ctx): RequireCollector,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<PaymentsTemplate, AppError> {
    let page = PaymentRepository::new(state.pool())
        .list_for_collector(
            ctx.shop.id,
            ctx.membership_id,
            &query.params(),
            query.payment_status(),
        )
        .await?;

    Ok(PaymentsTemplate {
        chrome: PageChrome::shop(Portal::Collector, &ctx, "My payments", PATH),
        table: DataTable::new(collector_payments_table_config(), PATH, query, &page),
        payments: page.items,
    })
}

/// Receipt of one of the collector's own payments.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id, membership_id = %ctx.membership_id))]
pub async fn receipt(
    RequireCollector(ctx): RequireCollector,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ReceiptTemplate, AppError> {
    let payment = PaymentRepository::new(state.pool())
        .get_in_shop(ctx.shop.id, PaymentId::new(id))
        .await?
        .filter(|p| p.collector_id == Some(ctx.membership_id));
    let payment = found(payment, "Payment")?;
    print::receipt(&ctx, &state, payment).await
}

/// Record a payment collected from an assigned customer.
///
/// The payment is stored unconfirmed; balances move once a shop admin
/// confirms it.
#[instrument(skip(ctx, state, input), fields(shop_id = %ctx.shop.id, membership_id = %ctx.membership_id))]
pub async fn record(
    RequireCollector(ctx): RequireCollector,
    State(state): State<AppState>,
    ActionJson(input): ActionJson<RecordPaymentInput>,
) -> ActionResponse<Payment> {
    if !input.amount().is_positive() {
        return Err(ActionError::bad_request("Amount must be greater than zero"));
    }
    let payment = PaymentService::new(state.pool())
        .record_by_collector(ctx.shop.id, ctx.membership_id, &input, Utc::now())
        .await?;
    Ok(Json(ActionResult::ok(payment)))
}
