//! Customer management for the shop admin.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use hire_purchase_core::{ActionResult, CustomerId, Email, MembershipId, MembershipRole};

use crate::components::data_table::customers_table_config;
use crate::components::{DataTable, FilterOption, ListQuery};
use crate::db::{CustomerRepository, MembershipRepository, PaymentRepository, PurchaseRepository};
use crate::error::{ActionError, ActionJson, ActionResponse, AppError};
use crate::filters;
use crate::middleware::{RequireShopAdmin, ShopContext};
use crate::models::{Customer, CustomerInput, CustomerOverview, Payment, Portal, Purchase, StaffMember};
use crate::routes::{PageChrome, clean, found};
use crate::state::AppState;

const PATH: &str = "/shop-admin/customers";

/// Customer table template.
#[derive(Template, WebTemplate)]
#[template(path = "shop_admin/customers.html")]
pub struct CustomersTemplate {
    pub chrome: PageChrome,
    pub table: DataTable,
    pub customers: Vec<CustomerOverview>,
    /// Active collectors, for the new-customer form.
    pub collectors: Vec<StaffMember>,
}

/// Customer detail template.
#[derive(Template, WebTemplate)]
#[template(path = "shop_admin/customer_detail.html")]
pub struct CustomerDetailTemplate {
    pub chrome: PageChrome,
    pub customer: Customer,
    pub purchases: Vec<Purchase>,
    pub payments: Vec<Payment>,
    pub collectors: Vec<StaffMember>,
}

impl CustomerDetailTemplate {
    /// Whether `collector` is the one the customer is assigned to.
    #[must_use]
    pub fn is_assigned(&self, collector: &MembershipId) -> bool {
        self.customer.collector_membership_id == Some(*collector)
    }
}

/// Body of the assign-collector action; `null` unassigns.
#[derive(Debug, Deserialize)]
pub struct AssignInput {
    #[serde(default)]
    pub collector_membership_id: Option<MembershipId>,
}

fn validate(input: &CustomerInput) -> Result<(), ActionError> {
    if input.name.trim().is_empty() {
        return Err(ActionError::bad_request("Customer name is required"));
    }
    if input.phone.trim().is_empty() {
        return Err(ActionError::bad_request("Phone number is required"));
    }
    if let Some(email) = clean(input.email.as_deref()) {
        Email::parse(email).map_err(|e| ActionError::bad_request(e.to_string()))?;
    }
    Ok(())
}

/// Blank optional fields are stored as NULL.
fn normalized(input: CustomerInput) -> CustomerInput {
    let tidy = |value: Option<String>| clean(value.as_deref()).map(String::from);
    CustomerInput {
        email: tidy(input.email),
        address: tidy(input.address),
        national_id: tidy(input.national_id),
        notes: tidy(input.notes),
        ..input
    }
}

/// Collectors customers can be assigned to.
async fn active_collectors(
    ctx: &ShopContext,
    state: &AppState,
) -> Result<Vec<StaffMember>, AppError> {
    let collectors = MembershipRepository::new(state.pool())
        .list_for_shop(ctx.shop.id, MembershipRole::Collector)
        .await?;
    Ok(collectors.into_iter().filter(|c| c.is_active).collect())
}

/// The assigned collector must be an active collector of this shop.
async fn check_collector(
    ctx: &ShopContext,
    state: &AppState,
    collector: Option<MembershipId>,
) -> Result<(), ActionError> {
    let Some(id) = collector else {
        return Ok(());
    };
    let staff = MembershipRepository::new(state.pool())
        .get_staff_in_shop(ctx.shop.id, id, MembershipRole::Collector)
        .await?;
    match staff {
        Some(staff) if staff.is_active => Ok(()),
        Some(_) => Err(ActionError::bad_request("That collector is deactivated")),
        None => Err(ActionError::bad_request("Unknown collector")),
    }
}

/// Customers of the shop, searchable and filterable by collector.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn index(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<CustomersTemplate, AppError> {
    let collectors = active_collectors(&ctx, &state).await?;
    let page = CustomerRepository::new(state.pool())
        .list(ctx.shop.id, &query.params(), query.collector_id())
        .await?;

    let options = collectors
        .iter()
        .map(|c| FilterOption::new(c.membership_id.to_string(), c.name.clone()))
        .collect();

    Ok(CustomersTemplate {
        chrome: PageChrome::shop(Portal::ShopAdmin, &ctx, "Customers", PATH),
        table: DataTable::new(customers_table_config(options), PATH, query, &page),
        customers: page.items,
        collectors,
    })
}

/// One customer with their purchases and payments.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id))]
pub async fn show(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<CustomerDetailTemplate, AppError> {
    let id = CustomerId::new(id);
    let customer = CustomerRepository::new(state.pool())
        .get_in_shop(ctx.shop.id, id)
        .await?;
    let customer = found(customer, "Customer")?;

    let purchases = PurchaseRepository::new(state.pool())
        .list_for_customer(ctx.shop.id, id)
        .await?;
    let payments = PaymentRepository::new(state.pool())
        .list_for_customer(ctx.shop.id, id)
        .await?;
    let collectors = active_collectors(&ctx, &state).await?;

    Ok(CustomerDetailTemplate {
        chrome: PageChrome::shop(Portal::ShopAdmin, &ctx, &customer.name, PATH),
        customer,
        purchases,
        payments,
        collectors,
    })
}

/// Register a customer, optionally assigning a collector.
#[instrument(skip(ctx, state, input), fields(shop_id = %ctx.shop.id))]
pub async fn create(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    ActionJson(input): ActionJson<CustomerInput>,
) -> ActionResponse<Customer> {
    validate(&input)?;
    check_collector(&ctx, &state, input.collector_membership_id).await?;

    let repo = CustomerRepository::new(state.pool());
    let id = repo.create(ctx.shop.id, &normalized(input)).await?;
    let customer = found(repo.get_in_shop(ctx.shop.id, id).await?, "Customer")?;

    tracing::info!(customer_id = %id, "Customer created");
    Ok(Json(ActionResult::ok(customer)))
}

/// Update a customer's details and collector assignment.
#[instrument(skip(ctx, state, input), fields(shop_id = %ctx.shop.id))]
pub async fn update(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ActionJson(input): ActionJson<CustomerInput>,
) -> ActionResponse<Customer> {
    validate(&input)?;
    check_collector(&ctx, &state, input.collector_membership_id).await?;

    let id = CustomerId::new(id);
    let repo = CustomerRepository::new(state.pool());
    repo.update(ctx.shop.id, id, &normalized(input)).await?;
    let customer = found(repo.get_in_shop(ctx.shop.id, id).await?, "Customer")?;
    Ok(Json(ActionResult::ok(customer)))
}

/// Move a customer to another collector, or leave them unassigned.
#[instrument(skip(ctx, state, input), fields(shop_id = %ctx.shop.id))]
pub async fn assign_collector(
    RequireShopAdmin(ctx): RequireShopAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    ActionJson(input): ActionJson<AssignInput>,
) -> ActionResponse {
    check_collector(&ctx, &state, input.collector_membership_id).await?;

    let id = CustomerId::new(id);
    CustomerRepository::new(state.pool())
        .assign_collector(ctx.shop.id, id, input.collector_membership_id)
        .await?;

    tracing::info!(
        customer_id = %id,
        collector = ?input.collector_membership_id,
        "Customer collector changed"
    );
    Ok(Json(ActionResult::ok_empty()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> CustomerInput {
        CustomerInput {
            name: "Amina Njeri".to_string(),
            phone: "0712 000 111".to_string(),
            email: Some("  ".to_string()),
            address: Some(" Kasarani ".to_string()),
            national_id: None,
            notes: Some(String::new()),
            collector_membership_id: None,
        }
    }

    #[test]
    fn test_customer_validation() {
        assert!(validate(&input()).is_ok());

        let mut missing_phone = input();
        missing_phone.phone = " ".to_string();
        assert!(validate(&missing_phone).is_err());

        let mut bad_email = input();
        bad_email.email = Some("not-an-email".to_string());
        assert!(validate(&bad_email).is_err());
    }

    fn staff(id: i32) -> StaffMember {
        StaffMember {
            membership_id: MembershipId::new(id),
            user_id: hire_purchase_core::UserId::new(id),
            name: format!("Collector {id}"),
            email: Email::parse(&format!("collector{id}@example.com")).unwrap(),
            phone: None,
            role: MembershipRole::Collector,
            is_active: true,
        }
    }

    #[test]
    fn test_assigned_collector_is_preselected() {
        let template = CustomerDetailTemplate {
            chrome: PageChrome::for_tests(Portal::ShopAdmin, PATH),
            customer: Customer {
                id: CustomerId::new(1),
                shop_id: hire_purchase_core::ShopId::new(1),
                collector_membership_id: Some(MembershipId::new(8)),
                collector_name: Some("Collector 8".to_string()),
                name: "Amina Njeri".to_string(),
                phone: "0712 000 111".to_string(),
                email: None,
                address: None,
                national_id: None,
                notes: None,
                created_at: chrono::Utc::now(),
            },
            purchases: Vec::new(),
            payments: Vec::new(),
            collectors: vec![staff(7), staff(8)],
        };

        assert!(template.is_assigned(&MembershipId::new(8)));
        assert!(!template.is_assigned(&MembershipId::new(7)));

        let html = template.render().unwrap();
        assert!(html.contains(r#"<option value="8" selected>"#));
        assert!(!html.contains(r#"<option value="7" selected>"#));
    }

    #[test]
    fn test_blank_fields_become_none() {
        let input = normalized(input());
        assert_eq!(input.email, None);
        assert_eq!(input.address.as_deref(), Some("Kasarani"));
        assert_eq!(input.notes, None);
    }
}
