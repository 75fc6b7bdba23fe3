//! Cross-shop payment report.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use chrono::Utc;
use tracing::instrument;

use crate::components::data_table::business_payments_table_config;
use crate::components::{DataTable, FilterOption, ListQuery};
use crate::db::{PaymentRepository, ShopRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{BusinessContext, RequireBusinessAdmin};
use crate::models::{Payment, Shop};
use crate::routes::PageChrome;
use crate::routes::print::{PaymentsReportTemplate, PrintHeader, ReportTotals};
use crate::state::AppState;

const PATH: &str = "/business-admin/payments";

/// Payment report template.
#[derive(Template, WebTemplate)]
#[template(path = "business_admin/payments.html")]
pub struct PaymentsTemplate {
    pub chrome: PageChrome,
    pub table: DataTable,
    pub payments: Vec<Payment>,
    pub print_href: String,
}

async fn shop_options(ctx: &BusinessContext, state: &AppState) -> Result<Vec<Shop>, AppError> {
    Ok(ShopRepository::new(state.pool())
        .list_for_business(ctx.business.id)
        .await?)
}

/// Payments across every shop, filterable by shop, status and date range.
#[instrument(skip(ctx, state), fields(business_id = %ctx.business.id))]
pub async fn index(
    RequireBusinessAdmin(ctx): RequireBusinessAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<PaymentsTemplate, AppError> {
    let shops = shop_options(&ctx, &state).await?;
    let page = PaymentRepository::new(state.pool())
        .list_for_business(ctx.business.id, &query.params(), &query.payment_filter())
        .await?;

    let options = shops
        .iter()
        .map(|s| FilterOption::new(s.id.to_string(), s.name.clone()))
        .collect();
    let table = DataTable::new(business_payments_table_config(options), PATH, query, &page);
    let print_href = table.href_with_filters("/business-admin/payments/print");

    Ok(PaymentsTemplate {
        chrome: PageChrome::business_admin(&ctx, "Payments", PATH),
        table,
        payments: page.items,
        print_href,
    })
}

/// Printable version of the report with the same filters, unpaged.
#[instrument(skip(ctx, state), fields(business_id = %ctx.business.id))]
pub async fn print(
    RequireBusinessAdmin(ctx): RequireBusinessAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<PaymentsReportTemplate, AppError> {
    let filter = query.payment_filter();
    let payments = PaymentRepository::new(state.pool())
        .report_for_business(ctx.business.id, &filter)
        .await?;

    let shop_name = match filter.shop_id {
        Some(id) => shop_options(&ctx, &state)
            .await?
            .into_iter()
            .find(|s| s.id == id)
            .map(|s| s.name),
        None => None,
    };

    Ok(PaymentsReportTemplate {
        header: PrintHeader {
            business_name: ctx.business.name.clone(),
            shop_name,
            shop_address: None,
            shop_phone: None,
            currency: ctx.business.currency.symbol().to_string(),
            printed_at: Utc::now(),
        },
        title: "Payment report".to_string(),
        filters: PaymentsReportTemplate::describe_filter(&filter),
        totals: ReportTotals::from_payments(&payments),
        show_shop: filter.shop_id.is_none(),
        payments,
    })
}
