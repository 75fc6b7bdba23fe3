//! Printable documents: invoices, statements, receipts and payment reports.
//!
//! Print pages use their own layout without portal navigation. They are
//! rendered on the server so the browser print dialog gets the whole
//! document in one response.

use askama::Template;
use askama_web::WebTemplate;
use chrono::{DateTime, NaiveDate, Utc};

use hire_purchase_core::{Money, PaymentStatus, PurchaseId};

use crate::db::{PaymentRepository, PurchaseRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::ShopContext;
use crate::models::{Payment, PaymentFilter, Purchase, PurchaseDetail};
use crate::routes::views::ScheduleView;
use crate::routes::{found, today};
use crate::state::AppState;

/// Letterhead of every printed document.
#[derive(Debug, Clone)]
pub struct PrintHeader {
    pub business_name: String,
    pub shop_name: Option<String>,
    pub shop_address: Option<String>,
    pub shop_phone: Option<String>,
    pub currency: String,
    pub printed_at: DateTime<Utc>,
}

impl PrintHeader {
    /// Letterhead of the shop the user works in.
    #[must_use]
    pub fn for_shop(ctx: &ShopContext) -> Self {
        Self {
            business_name: ctx.business.name.clone(),
            shop_name: Some(ctx.shop.name.clone()),
            shop_address: ctx.shop.address.clone(),
            shop_phone: ctx.shop.phone.clone(),
            currency: ctx.business.currency.symbol().to_string(),
            printed_at: Utc::now(),
        }
    }
}

// =============================================================================
// Payment report
// =============================================================================

/// Totals printed under a payment report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTotals {
    pub count: usize,
    pub confirmed_count: usize,
    pub confirmed: Money,
    pub pending_count: usize,
    pub pending: Money,
    pub rejected_count: usize,
}

impl ReportTotals {
    #[must_use]
    pub fn from_payments(payments: &[Payment]) -> Self {
        payments
            .iter()
            .fold(Self::default(), |mut totals, payment| {
                totals.count += 1;
                match payment.status {
                    PaymentStatus::Completed => {
                        totals.confirmed_count += 1;
                        totals.confirmed += payment.amount;
                    }
                    PaymentStatus::Pending => {
                        totals.pending_count += 1;
                        totals.pending += payment.amount;
                    }
                    PaymentStatus::Rejected => totals.rejected_count += 1,
                }
                totals
            })
    }
}

/// Payment report template.
#[derive(Template, WebTemplate)]
#[template(path = "print/payments_report.html")]
pub struct PaymentsReportTemplate {
    pub header: PrintHeader,
    pub title: String,
    /// Human-readable filter lines, e.g. `Status: Pending`.
    pub filters: Vec<String>,
    pub totals: ReportTotals,
    /// Add a shop column; set when the report spans shops.
    pub show_shop: bool,
    pub payments: Vec<Payment>,
}

impl PaymentsReportTemplate {
    /// Describe the status and date filters of a report.
    #[must_use]
    pub fn describe_filter(filter: &PaymentFilter) -> Vec<String> {
        let day = |d: NaiveDate| d.format("%d %b %Y").to_string();
        let mut lines = Vec::new();
        if let Some(status) = filter.status {
            lines.push(format!("Status: {}", status.label()));
        }
        match (filter.from, filter.to) {
            (Some(from), Some(to)) => lines.push(format!("Period: {} to {}", day(from), day(to))),
            (Some(from), None) => lines.push(format!("From {}", day(from))),
            (None, Some(to)) => lines.push(format!("Up to {}", day(to))),
            (None, None) => {}
        }
        if lines.is_empty() {
            lines.push("All payments".to_string());
        }
        lines
    }
}

// =============================================================================
// Purchase documents
// =============================================================================

/// Invoice issued when the purchase is made.
#[derive(Template, WebTemplate)]
#[template(path = "print/invoice.html")]
pub struct InvoiceTemplate {
    pub header: PrintHeader,
    pub detail: PurchaseDetail,
    pub schedule: ScheduleView,
}

/// Statement of account: what was bought, what was paid, what is due.
#[derive(Template, WebTemplate)]
#[template(path = "print/bill.html")]
pub struct BillTemplate {
    pub header: PrintHeader,
    pub detail: PurchaseDetail,
    pub schedule: ScheduleView,
    /// Confirmed payments, oldest first.
    pub payments: Vec<Payment>,
    pub statement_date: NaiveDate,
}

/// Receipt for one payment.
#[derive(Template, WebTemplate)]
#[template(path = "print/receipt.html")]
pub struct ReceiptTemplate {
    pub header: PrintHeader,
    pub payment: Payment,
    pub purchase: Purchase,
    /// Not yet confirmed by a shop admin; the balance shown may still change.
    pub provisional: bool,
}

async fn purchase_detail(
    ctx: &ShopContext,
    state: &AppState,
    id: PurchaseId,
) -> Result<PurchaseDetail, AppError> {
    let detail = PurchaseRepository::new(state.pool())
        .get_detail(ctx.shop.id, id)
        .await?;
    found(detail, "Purchase")
}

/// Build the invoice of a purchase in the user's shop.
///
/// # Errors
///
/// Returns `AppError::NotFound` for purchases outside the shop.
pub async fn invoice(
    ctx: &ShopContext,
    state: &AppState,
    id: PurchaseId,
) -> Result<InvoiceTemplate, AppError> {
    let detail = purchase_detail(ctx, state, id).await?;
    let schedule = ScheduleView::for_purchase(&detail.purchase, today())?;

    Ok(InvoiceTemplate {
        header: PrintHeader::for_shop(ctx),
        detail,
        schedule,
    })
}

/// Build the statement of a purchase as of today.
///
/// # Errors
///
/// Returns `AppError::NotFound` for purchases outside the shop.
pub async fn bill(
    ctx: &ShopContext,
    state: &AppState,
    id: PurchaseId,
) -> Result<BillTemplate, AppError> {
    let detail = purchase_detail(ctx, state, id).await?;
    let statement_date = today();
    let schedule = ScheduleView::for_purchase(&detail.purchase, statement_date)?;

    let mut payments: Vec<Payment> = PaymentRepository::new(state.pool())
        .list_for_purchase(detail.purchase.id)
        .await?
        .into_iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .collect();
    payments.reverse();

    Ok(BillTemplate {
        header: PrintHeader::for_shop(ctx),
        detail,
        schedule,
        payments,
        statement_date,
    })
}

/// Build the receipt of a payment.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the purchase behind the payment is gone.
pub async fn receipt(
    ctx: &ShopContext,
    state: &AppState,
    payment: Payment,
) -> Result<ReceiptTemplate, AppError> {
    let purchase = PurchaseRepository::new(state.pool())
        .get_in_shop(ctx.shop.id, payment.purchase_id)
        .await?;
    let purchase = found(purchase, "Purchase")?;

    Ok(ReceiptTemplate {
        header: PrintHeader::for_shop(ctx),
        provisional: !payment.is_confirmed,
        payment,
        purchase,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hire_purchase_core::{
        CustomerId, MembershipId, PaymentId, PaymentMethod, PurchaseId, ShopId,
    };

    fn payment(amount: i64, status: PaymentStatus) -> Payment {
        Payment {
            id: PaymentId::new(1),
            purchase_id: PurchaseId::new(1),
            purchase_number: "HP-1".to_string(),
            shop_id: ShopId::new(1),
            shop_name: "Main".to_string(),
            customer_id: CustomerId::new(1),
            customer_name: "Amina".to_string(),
            amount: Money::from_major(amount),
            method: PaymentMethod::Cash,
            status,
            is_confirmed: status == PaymentStatus::Completed,
            collector_id: None,
            collector_name: None,
            recorded_by: MembershipId::new(1),
            confirmed_by: None,
            reference: "PAY-1".to_string(),
            notes: None,
            rejection_reason: None,
            paid_at: Utc::now(),
            confirmed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_report_totals_split_by_status() {
        let totals = ReportTotals::from_payments(&[
            payment(500, PaymentStatus::Completed),
            payment(250, PaymentStatus::Completed),
            payment(100, PaymentStatus::Pending),
            payment(900, PaymentStatus::Rejected),
        ]);
        assert_eq!(totals.count, 4);
        assert_eq!(totals.confirmed_count, 2);
        assert_eq!(totals.confirmed, Money::from_major(750));
        assert_eq!(totals.pending, Money::from_major(100));
        assert_eq!(totals.rejected_count, 1);
    }

    #[test]
    fn test_describe_filter() {
        assert_eq!(
            PaymentsReportTemplate::describe_filter(&PaymentFilter::default()),
            vec!["All payments".to_string()]
        );

        let filter = PaymentFilter {
            status: Some(PaymentStatus::Pending),
            from: NaiveDate::from_ymd_opt(2025, 3, 1),
            to: NaiveDate::from_ymd_opt(2025, 3, 31),
            ..PaymentFilter::default()
        };
        assert_eq!(
            PaymentsReportTemplate::describe_filter(&filter),
            vec![
                "Status: Pending".to_string(),
                "Period: 01 Mar 2025 to 31 Mar 2025".to_string()
            ]
        );
    }

    #[test]
    fn test_report_renders_totals() {
        let template = PaymentsReportTemplate {
            header: PrintHeader {
                business_name: "Acme Furniture".to_string(),
                shop_name: None,
                shop_address: None,
                shop_phone: None,
                currency: "KSh".to_string(),
                printed_at: Utc::now(),
            },
            title: "Payment report".to_string(),
            filters: vec!["All payments".to_string()],
            totals: ReportTotals::from_payments(&[payment(1500, PaymentStatus::Completed)]),
            show_shop: true,
            payments: vec![payment(1500, PaymentStatus::Completed)],
        };
        let html = template.render().unwrap();
        assert!(html.contains("Acme Furniture"));
        assert!(html.contains("1,500.00"));
        assert!(html.contains("PAY-1"));
    }
}
