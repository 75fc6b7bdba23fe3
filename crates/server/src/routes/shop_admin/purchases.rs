//! Purchases: listing, creation, detail and write-off.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{Months, NaiveDate, Utc};
use serde::Deserialize;
use tracing::instrument;

use hire_purchase_core::{
    ActionResult, CustomerId, InstallmentFrequency, PaymentMethod, PurchaseId,
};

use crate::components::data_table::purchases_table_config;
use crate::components::{DataTable, ListQuery};
use crate::db::{CustomerRepository, PaymentRepository, ProductRepository, PurchaseRepository};
use crate::error::{ActionError, ActionJson, ActionResponse, AppError};
use crate::filters;
use crate::middleware::RequireShopAdmin;
use crate::models::{Customer, Payment, Portal, Product, Purchase, PurchaseDetail};
use crate::routes::print::{self, BillTemplate, InvoiceTemplate};
use crate::routes::views::ScheduleView;
use crate::routes::{PageChrome, found, today};
use crate::services::{CreatePurchaseInput, PurchaseService};
use crate::state::AppState;

const PATH: &str = "/shop-admin/purchases";

/// Purchase table template.
#[derive(Template, WebTemplate)]
#[template(path = "shop_admin/purchases.html")]
pub struct PurchasesTemplate {
    pub chrome: PageChrome,
    pub table: DataTable,
    pub purchases: Vec<Purchase>,
}

/// New purchase form template.
#[derive(Template, WebTemplate)]
#[template(path = "shop_admin/purchase_new.html")]
pub struct NewPurchaseTemplate {
    pub chrome: PageChrome,
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
    pub frequencies: [InstallmentFrequency; 3],
    pub methods: [PaymentMethod; 5],
    /// Customer preselected when coming from a customer page.
    pub selected_customer: Option<CustomerId>,
    pub default_first_due: NaiveDate,
}

impl NewPurchaseTemplate {
    #[must_use]
    pub fn is_selected(&self, customer: &CustomerId) -> bool {
        self.selected_customer == Some(*customer)
    }
}

/// Purchase detail template.
#[derive(Template, WebTemplate)]
#[template(path = "shop_admin/purchase_detail.html")]
pub struct PurchaseDetailTemplate {
    pub chrome: PageChrome,
    pub detail: PurchaseDetail,
    pub schedule: ScheduleView,
    pub payments: Vec<Payment>,
    pub methods: [PaymentMethod; 5],
}

/// Query of the new purchase form.
#[derive(Debug, Deserialize)]
pub struct NewPurchaseQuery {
    pub customer: Option<i32>,
}

fn validate(input: &CreatePurchaseInput) -> Result<(), ActionError> {
    if input.items.is_empty() {
        return Err(ActionError::bad_request("Add at least one product"));
    }
    if input.items.iter().any(|line| line.quantity == 0) {
        return Err(ActionError::bad_request("Quantities must be at least 1"));
    }
    Ok(())
}

/// Purchases of the shop, filterable by status.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn index(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<PurchasesTemplate, AppError> {
    let page = PurchaseRepository::new(state.pool())
        .list(ctx.shop.id, &query.params(), query.purchase_status())
        .await?;

    Ok(PurchasesTemplate {
        chrome: PageChrome::shop(Portal::ShopAdmin, &ctx, "Purchases", PATH),
        table: DataTable::new(purchases_table_config(), PATH, query, &page),
        purchases: page.items,
    })
}

/// Form for a new purchase.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn new_form(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Query(query): Query<NewPurchaseQuery>,
) -> Result<NewPurchaseTemplate, AppError> {
    let customers = CustomerRepository::new(state.pool())
        .list_all(ctx.shop.id)
        .await?;
    let products = ProductRepository::new(state.pool())
        .list_active(ctx.shop.id)
        .await?;
    let today = today();

    Ok(NewPurchaseTemplate {
        chrome: PageChrome::shop(Portal::ShopAdmin, &ctx, "New purchase", PATH),
        customers,
        products,
        frequencies: InstallmentFrequency::ALL,
        methods: PaymentMethod::ALL,
        selected_customer: query.customer.map(CustomerId::new),
        default_first_due: today.checked_add_months(Months::new(1)).unwrap_or(today),
    })
}

/// One purchase: items, installment plan and payments.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn show(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<PurchaseDetailTemplate, AppError> {
    let detail = PurchaseRepository::new(state.pool())
        .get_detail(ctx.shop.id, PurchaseId::new(id))
        .await?;
    let detail = found(detail, "Purchase")?;
    let schedule = ScheduleView::for_purchase(&detail.purchase, today())?;
    let payments = PaymentRepository::new(state.pool())
        .list_for_purchase(detail.purchase.id)
        .await?;

    Ok(PurchaseDetailTemplate {
        chrome: PageChrome::shop(
            Portal::ShopAdmin,
            &ctx,
            &detail.purchase.purchase_number,
            PATH,
        ),
        detail,
        schedule,
        payments,
        methods: PaymentMethod::ALL,
    })
}

/// Printable invoice.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn invoice(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<InvoiceTemplate, AppError> {
    print::invoice(&ctx, &state, PurchaseId::new(id)).await
}

/// Printable statement of account.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn bill(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<BillTemplate, AppError> {
    print::bill(&ctx, &state, PurchaseId::new(id)).await
}

/// Price and store a purchase.
#[instrument(skip(ctx, state, input), fields(shop_id = %ctx.shop.id))]
pub async fn create(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    ActionJson(input): ActionJson<CreatePurchaseInput>,
) -> ActionResponse<Purchase> {
    validate(&input)?;
    let purchase = PurchaseService::new(state.pool())
        .create(ctx.shop.id, ctx.membership_id, &input, Utc::now())
        .await?;
    Ok(Json(ActionResult::ok(purchase)))
}

/// Write a purchase off as defaulted.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn mark_defaulted(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ActionResponse {
    PurchaseService::new(state.pool())
        .mark_defaulted(ctx.shop.id, PurchaseId::new(id))
        .await?;
    Ok(Json(ActionResult::ok_empty()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(items: serde_json::Value) -> CreatePurchaseInput {
        serde_json::from_value(serde_json::json!({
            "customer_id": 3,
            "items": items,
            "down_payment": "1000",
            "installments": 6,
            "first_due_date": "2025-04-01"
        }))
        .unwrap()
    }

    #[test]
    fn test_form_body_parses_with_defaults() {
        let input = input(serde_json::json!([{ "product_id": 7, "quantity": 2 }]));
        assert_eq!(input.customer_id, CustomerId::new(3));
        assert_eq!(input.frequency, InstallmentFrequency::Monthly);
        assert_eq!(input.down_payment_method, PaymentMethod::Cash);
        assert!(validate(&input).is_ok());
    }

    #[test]
    fn test_lines_are_required() {
        assert!(validate(&input(serde_json::json!([]))).is_err());
        assert!(validate(&input(serde_json::json!([{ "product_id": 7, "quantity": 0 }]))).is_err());
    }

    fn customer(id: i32, name: &str) -> Customer {
        Customer {
            id: CustomerId::new(id),
            shop_id: hire_purchase_core::ShopId::new(1),
            collector_membership_id: None,
            collector_name: None,
            name: name.to_string(),
            phone: "0700 000 000".to_string(),
            email: None,
            address: None,
            national_id: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_new_purchase_form_preselects_customer() {
        let template = NewPurchaseTemplate {
            chrome: PageChrome::for_tests(crate::models::Portal::ShopAdmin, PATH),
            customers: vec![customer(1, "Amina"), customer(2, "Baraka")],
            products: Vec::new(),
            frequencies: InstallmentFrequency::ALL,
            methods: PaymentMethod::ALL,
            selected_customer: Some(CustomerId::new(2)),
            default_first_due: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        };

        assert!(template.is_selected(&CustomerId::new(2)));
        assert!(!template.is_selected(&CustomerId::new(1)));

        let html = template.render().unwrap();
        assert!(html.contains(r#"<option value="2" selected>"#));
        assert!(!html.contains(r#"<option value="1" selected>"#));
    }
}
