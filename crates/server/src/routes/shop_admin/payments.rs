//! Payment table, confirmation queue and receipts for the shop admin.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use hire_purchase_core::{ActionResult, MembershipRole, PaymentId};

use crate::components::data_table::shop_payments_table_config;
use crate::components::{DataTable, FilterOption, ListQuery};
use crate::db::{MembershipRepository, PaymentRepository};
use crate::error::{ActionError, ActionJson, ActionResponse, AppError};
use crate::filters;
use crate::middleware::RequireShopAdmin;
use crate::models::{Payment, Portal, StaffMember};
use crate::routes::print::{self, PaymentsReportTemplate, PrintHeader, ReceiptTemplate, ReportTotals};
use crate::routes::{PageChrome, found};
use crate::services::{PaymentService, RecordPaymentInput};
use crate::state::AppState;

const PATH: &str = "/shop-admin/payments";

/// Payment table template.
#[derive(Template, WebTemplate)]
#[template(path = "shop_admin/payments.html")]
pub struct PaymentsTemplate {
    pub chrome: PageChrome,
    pub table: DataTable,
    pub payments: Vec<Payment>,
    pub print_href: String,
}

/// Body of the reject action.
#[derive(Debug, Default, Deserialize)]
pub struct RejectInput {
    #[serde(default)]
    pub reason: Option<String>,
}

fn validate(input: &RecordPaymentInput) -> Result<(), ActionError> {
    if !input.amount().is_positive() {
        return Err(ActionError::bad_request("Amount must be greater than zero"));
    }
    Ok(())
}

/// Payments of the shop; unconfirmed ones come first.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn index(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<PaymentsTemplate, AppError> {
    let collectors: Vec<StaffMember> = MembershipRepository::new(state.pool())
        .list_for_shop(ctx.shop.id, MembershipRole::Collector)
        .await?;
    let page = PaymentRepository::new(state.pool())
        .list(ctx.shop.id, &query.params(), &query.payment_filter())
        .await?;

    let options = collectors
        .iter()
        .map(|c| FilterOption::new(c.membership_id.to_string(), c.name.clone()))
        .collect();
    let table = DataTable::new(shop_payments_table_config(options), PATH, query, &page);
    let print_href = table.href_with_filters("/shop-admin/payments/print");

    Ok(PaymentsTemplate {
        chrome: PageChrome::shop(Portal::ShopAdmin, &ctx, "Payments", PATH),
        table,
        payments: page.items,
        print_href,
    })
}

/// Printable payment report with the table's filters.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn print(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<PaymentsReportTemplate, AppError> {
    let filter = query.payment_filter();
    let payments = PaymentRepository::new(state.pool())
        .report(ctx.shop.id, &filter)
        .await?;

    let mut filters = PaymentsReportTemplate::describe_filter(&filter);
    if let Some(collector) = filter.collector_id {
        let staff = MembershipRepository::new(state.pool())
            .get_staff_in_shop(ctx.shop.id, collector, MembershipRole::Collector)
            .await?;
        if let Some(staff) = staff {
            filters.push(format!("Collector: {}", staff.name));
        }
    }

    Ok(PaymentsReportTemplate {
        header: PrintHeader::for_shop(&ctx),
        title: "Payment report".to_string(),
        filters,
        totals: ReportTotals::from_payments(&payments),
        show_shop: false,
        payments,
    })
}

/// Printable receipt of any payment in the shop.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn receipt(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<ReceiptTemplate, AppError> {
    let payment = PaymentRepository::new(state.pool())
        .get_in_shop(ctx.shop.id, PaymentId::new(id))
        .await?;
    let payment = found(payment, "Payment")?;
    print::receipt(&ctx, &state, payment).await
}

/// Record a payment taken at the counter. It is confirmed immediately.
#[instrument(skip(ctx, state, input), fields(shop_id = %ctx.shop.id))]
pub async fn record(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    ActionJson(input): ActionJson<RecordPaymentInput>,
) -> ActionResponse<Payment> {
    validate(&input)?;
    let payment = PaymentService::new(state.pool())
        .record_by_shop_admin(ctx.shop.id, ctx.membership_id, &input, Utc::now())
        .await?;
    Ok(Json(ActionResult::ok(payment)))
}

/// Confirm a collector's payment and apply it to the purchase balance.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn confirm(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ActionResponse<Payment> {
    let payment = PaymentService::new(state.pool())
        .confirm(ctx.shop.id, ctx.membership_id, PaymentId::new(id), Utc::now())
        .await?;
    Ok(Json(ActionResult::ok(payment)))
}

/// Reject a collector's payment. The purchase balance is left alone.
#[instrument(skip(ctx, state, input), fields(shop_id = %ctx.shop.id))]
pub async fn reject(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ActionJson(input): ActionJson<RejectInput>,
) -> ActionResponse<Payment> {
    let payment = PaymentService::new(state.pool())
        .reject(
            ctx.shop.id,
            ctx.membership_id,
            PaymentId::new(id),
            input.reason.as_deref(),
        )
        .await?;
    Ok(Json(ActionResult::ok(payment)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_must_be_positive() {
        let input: RecordPaymentInput = serde_json::from_value(serde_json::json!({
            "purchase_id": 4,
            "amount": "0"
        }))
        .unwrap();
        assert!(validate(&input).is_err());

        let input: RecordPaymentInput = serde_json::from_value(serde_json::json!({
            "purchase_id": 4,
            "amount": "2500.50",
            "method": "MOBILE_MONEY"
        }))
        .unwrap();
        assert!(validate(&input).is_ok());
    }

    #[test]
    fn test_reject_reason_is_optional() {
        let input: RejectInput = serde_json::from_str("{}").unwrap();
        assert!(input.reason.is_none());
    }
}
