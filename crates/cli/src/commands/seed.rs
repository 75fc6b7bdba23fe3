//! Demo data for local development.
//!
//! Creates the `demo-furniture` business once; later runs detect the slug and
//! leave everything as it is.

use chrono::{Months, Utc};
use rust_decimal::Decimal;

use hire_purchase_core::{InstallmentFrequency, MembershipRole, Money, PaymentMethod};
use hire_purchase_server::db::{
    BusinessRepository, CustomerRepository, ProductRepository, ShopRepository,
};
use hire_purchase_server::models::{CustomerInput, ProductInput, ShopInput};
use hire_purchase_server::services::{
    CreatePurchaseInput, PurchaseLineInput, PurchaseService, StaffInput, StaffService,
};

use super::business::{NewBusiness, create_with_pool};
use super::{CommandError, connect};

pub const DEMO_SLUG: &str = "demo-furniture";

const PRODUCTS: &[(&str, &str, i64)] = &[
    ("Three-seater sofa", "SOFA-3", 45_000),
    ("Double bed with mattress", "BED-DBL", 38_500),
    ("32\" LED television", "TV-32", 21_000),
    ("Gas cooker, 4 burner", "COOK-4", 27_800),
];

const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Amina Njeri", "0712 000 111", "Kasarani, Nairobi"),
    ("Peter Otieno", "0722 333 444", "Umoja II, Nairobi"),
    ("Mary Wambui", "0733 555 666", "Ruiru town"),
];

/// `hp-cli seed demo`.
pub async fn demo(password: &str) -> Result<(), CommandError> {
    let pool = connect().await?;

    if BusinessRepository::new(&pool).get_by_slug(DEMO_SLUG).await?.is_some() {
        tracing::info!("Demo business already exists, nothing to do");
        return Ok(());
    }

    let business = create_with_pool(
        &pool,
        &NewBusiness {
            name: "Demo Furniture".to_string(),
            slug: DEMO_SLUG.to_string(),
            currency: "KES".to_string(),
            admin_email: "owner@demo.test".to_string(),
            admin_name: "Grace Wanjiru".to_string(),
            admin_password: password.to_string(),
        },
    )
    .await?;

    let shop = ShopRepository::new(&pool)
        .create(
            business.id,
            &ShopInput {
                name: "Town Branch".to_string(),
                address: Some("Moi Avenue, Nairobi".to_string()),
                phone: Some("0700 100 200".to_string()),
            },
        )
        .await?;

    let staff = StaffService::new(&pool);
    let shop_admin = staff
        .add(
            business.id,
            shop.id,
            MembershipRole::ShopAdmin,
            &StaffInput {
                name: "James Mwangi".to_string(),
                email: "manager@demo.test".to_string(),
                phone: None,
                password: password.to_string(),
            },
        )
        .await?;
    let collector = staff
        .add(
            business.id,
            shop.id,
            MembershipRole::Collector,
            &StaffInput {
                name: "Daniel Kiptoo".to_string(),
                email: "collector@demo.test".to_string(),
                phone: Some("0711 222 333".to_string()),
                password: password.to_string(),
            },
        )
        .await?;

    let products = ProductRepository::new(&pool);
    let mut product_ids = Vec::with_capacity(PRODUCTS.len());
    for (name, sku, price) in PRODUCTS {
        let product = products
            .create(
                shop.id,
                &ProductInput {
                    name: (*name).to_string(),
                    sku: Some((*sku).to_string()),
                    price: Money::from_major(*price),
                    is_active: true,
                },
            )
            .await?;
        product_ids.push(product.id);
    }

    let customers = CustomerRepository::new(&pool);
    let mut customer_ids = Vec::with_capacity(CUSTOMERS.len());
    for (name, phone, address) in CUSTOMERS {
        let id = customers
            .create(
                shop.id,
                &CustomerInput {
                    name: (*name).to_string(),
                    phone: (*phone).to_string(),
                    email: None,
                    address: Some((*address).to_string()),
                    national_id: None,
                    notes: None,
                    collector_membership_id: Some(collector.membership_id),
                },
            )
            .await?;
        customer_ids.push(id);
    }

    let (Some(&customer_id), Some(&sofa), Some(&tv)) =
        (customer_ids.first(), product_ids.first(), product_ids.get(2))
    else {
        return Err(CommandError::InvalidArgument("demo catalogue is empty".to_string()));
    };

    let today = Utc::now().date_naive();
    let purchase = PurchaseService::new(&pool)
        .create(
            shop.id,
            shop_admin.membership_id,
            &CreatePurchaseInput {
                customer_id,
                items: vec![
                    PurchaseLineInput { product_id: sofa, quantity: 1 },
                    PurchaseLineInput { product_id: tv, quantity: 1 },
                ],
                down_payment: Money::from_major(10_000),
                down_payment_method: PaymentMethod::MobileMoney,
                interest_rate: Decimal::new(10, 0),
                installments: 6,
                frequency: InstallmentFrequency::Monthly,
                first_due_date: today.checked_add_months(Months::new(1)).unwrap_or(today),
                notes: Some("Delivered to customer's home".to_string()),
            },
            Utc::now(),
        )
        .await?;

    tracing::info!(
        business_id = %business.id,
        shop_id = %shop.id,
        purchase = %purchase.purchase_number,
        "Demo data created"
    );
    tracing::info!("Sign in with owner@demo.test, manager@demo.test or collector@demo.test");
    Ok(())
}
