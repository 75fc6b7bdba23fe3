//! Customers assigned to the signed-in collector.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use tracing::instrument;

use hire_purchase_core::{CustomerId, MembershipId, PaymentMethod, PurchaseStatus};

use crate::components::data_table::collector_customers_table_config;
use crate::components::{DataTable, ListQuery};
use crate::db::{CustomerRepository, PaymentRepository, PurchaseRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireCollector;
use crate::models::{Customer, CustomerOverview, Payment, Portal, Purchase};
use crate::routes::{PageChrome, found};
use crate::state::AppState;

const PATH: &str = "/collector/customers";

/// Assigned customers template.
#[derive(Template, WebTemplate)]
#[template(path = "collector/customers.html")]
pub struct CustomersTemplate {
    pub chrome: PageChrome,
    pub table: DataTable,
    pub customers: Vec<CustomerOverview>,
}

/// Customer detail with the record-payment form.
#[derive(Template, WebTemplate)]
#[template(path = "collector/customer_detail.html")]
pub struct CustomerDetailTemplate {
    pub chrome: PageChrome,
    pub customer: Customer,
    /// Purchases that can still take a payment.
    pub payable: Vec<Purchase>,
    pub settled: Vec<Purchase>,
    pub payments: Vec<Payment>,
    pub methods: [PaymentMethod; 5],
    pub collector: MembershipId,
}

impl CustomerDetailTemplate {
    /// Receipts are only offered for the collector's own payments.
    #[must_use]
    #[allow(clippy::ref_option)]
    pub fn is_own(&self, collected_by: &Option<MembershipId>) -> bool {
        *collected_by == Some(self.collector)
    }
}

/// Whether a collector can still take money against a purchase.
const fn accepts_payments(status: PurchaseStatus) -> bool {
    !matches!(status, PurchaseStatus::Completed)
}

/// Customers assigned to the collector.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id, membership_id = %ctx.membership_id))]
pub async fn index(
    RequireCollector(ctx): RequireCollector,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<CustomersTemplate, AppError> {
    let page = CustomerRepository::new(state.pool())
        .list_for_collector(ctx.shop.id, ctx.membership_id, &query.params())
        .await?;

    Ok(CustomersTemplate {
        chrome: PageChrome::shop(Portal::Collector, &ctx, "My customers", PATH),
        table: DataTable::new(collector_customers_table_config(), PATH, query, &page),
        customers: page.items,
    })
}

/// One assigned customer. Customers of other collectors are not found.
#[instrument(skip(ctx, state), fields(shop_id = %ctx.shop.id, membership_id = %ctx.membership_id))]
pub async fn show(
    RequireCollector(ctx): RequireCollector,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<CustomerDetailTemplate, AppError> {
    let id = CustomerId::new(id);
    let customer = CustomerRepository::new(state.pool())
        .get_in_shop(ctx.shop.id, id)
        .await?
        .filter(|c| c.collector_membership_id == Some(ctx.membership_id));
    let customer = found(customer, "Customer")?;

    let (payable, settled): (Vec<Purchase>, Vec<Purchase>) = PurchaseRepository::new(state.pool())
        .list_for_customer(ctx.shop.id, id)
        .await?
        .into_iter()
        .partition(|p| accepts_payments(p.status));
    let payments = PaymentRepository::new(state.pool())
        .list_for_customer(ctx.shop.id, id)
        .await?;

    Ok(CustomerDetailTemplate {
        chrome: PageChrome::shop(Portal::Collector, &ctx, &customer.name, PATH),
        customer,
        payable,
        settled,
        payments,
        methods: PaymentMethod::ALL,
        collector: ctx.membership_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_completed_purchases_are_closed_to_payments() {
        assert!(accepts_payments(PurchaseStatus::Pending));
        assert!(accepts_payments(PurchaseStatus::Overdue));
        assert!(accepts_payments(PurchaseStatus::Defaulted));
        assert!(!accepts_payments(PurchaseStatus::Completed));
    }

    #[test]
    fn test_receipts_only_for_own_payments() {
        let template = CustomerDetailTemplate {
            chrome: PageChrome::for_tests(Portal::Collector, PATH),
            customer: Customer {
                id: CustomerId::new(1),
                shop_id: hire_purchase_core::ShopId::new(1),
                collector_membership_id: Some(MembershipId::new(4)),
                collector_name: None,
                name: "Amina Njeri".to_string(),
                phone: "0712 000 111".to_string(),
                email: None,
                address: None,
                national_id: None,
                notes: None,
                created_at: chrono::Utc::now(),
            },
            payable: Vec::new(),
            settled: Vec::new(),
            payments: Vec::new(),
            methods: PaymentMethod::ALL,
            collector: MembershipId::new(4),
        };

        assert!(template.is_own(&Some(MembershipId::new(4))));
        assert!(!template.is_own(&Some(MembershipId::new(5))));
        assert!(!template.is_own(&None));
    }
}
