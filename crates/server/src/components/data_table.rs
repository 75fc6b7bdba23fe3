//! Data table component types.
//!
//! List pages share one query shape (`q`, `status`, `sort`, `dir`, `page` plus
//! a few table-specific filters). [`DataTableConfig`] describes the columns
//! and filters of a table, and [`DataTable`] pairs it with the current query
//! so templates can build sort, filter and page links.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::Deserialize;

use hire_purchase_core::{MembershipId, PaymentStatus, PurchaseStatus, ShopId};

use crate::db::{ListParams, Page};
use crate::models::PaymentFilter;

// =============================================================================
// Query
// =============================================================================

/// Query string of a list page.
///
/// Every field is kept as text so a malformed value degrades to "no filter"
/// instead of rejecting the whole request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<String>,
    pub collector: Option<String>,
    pub shop: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl ListQuery {
    /// Current value of a query key, empty when unset.
    #[must_use]
    pub fn get(&self, key: &str) -> &str {
        let value = match key {
            "q" => self.q.as_ref(),
            "status" => self.status.as_ref(),
            "sort" => self.sort.as_ref(),
            "dir" => self.dir.as_ref(),
            "page" => self.page.as_ref(),
            "collector" => self.collector.as_ref(),
            "shop" => self.shop.as_ref(),
            "from" => self.from.as_ref(),
            "to" => self.to.as_ref(),
            _ => None,
        };
        non_empty(value).unwrap_or("")
    }

    #[must_use]
    pub fn page_number(&self) -> u32 {
        non_empty(self.page.as_ref())
            .and_then(|p| p.parse::<u32>().ok())
            .unwrap_or(1)
            .max(1)
    }

    #[must_use]
    pub fn is_descending(&self) -> bool {
        non_empty(self.dir.as_ref()).is_some_and(|d| d.eq_ignore_ascii_case("desc"))
    }

    /// Search, sort and paging for the repositories.
    #[must_use]
    pub fn params(&self) -> ListParams {
        ListParams {
            search: non_empty(self.q.as_ref()).map(String::from),
            sort: non_empty(self.sort.as_ref()).map(String::from),
            descending: self.is_descending(),
            page: self.page_number(),
        }
    }

    /// Parsed `status` filter; unknown values mean "all".
    #[must_use]
    pub fn status<T: FromStr>(&self) -> Option<T> {
        non_empty(self.status.as_ref()).and_then(|s| s.parse().ok())
    }

    #[must_use]
    pub fn purchase_status(&self) -> Option<PurchaseStatus> {
        self.status()
    }

    #[must_use]
    pub fn payment_status(&self) -> Option<PaymentStatus> {
        self.status()
    }

    #[must_use]
    pub fn collector_id(&self) -> Option<MembershipId> {
        non_empty(self.collector.as_ref())
            .and_then(|c| c.parse::<i32>().ok())
            .map(MembershipId::new)
    }

    #[must_use]
    pub fn shop_id(&self) -> Option<ShopId> {
        non_empty(self.shop.as_ref())
            .and_then(|s| s.parse::<i32>().ok())
            .map(ShopId::new)
    }

    fn date(value: Option<&String>) -> Option<NaiveDate> {
        non_empty(value).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }

    /// Payment filters taken from `status`, `shop`, `collector`, `from` and `to`.
    #[must_use]
    pub fn payment_filter(&self) -> PaymentFilter {
        PaymentFilter {
            status: self.payment_status(),
            shop_id: self.shop_id(),
            collector_id: self.collector_id(),
            from: Self::date(self.from.as_ref()),
            to: Self::date(self.to.as_ref()),
        }
    }

    /// Query string with some keys replaced; `None` drops the key.
    #[must_use]
    pub fn query_string(&self, overrides: &[(&str, Option<&str>)]) -> String {
        const KEYS: [&str; 9] = [
            "q", "status", "collector", "shop", "from", "to", "sort", "dir", "page",
        ];

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for key in KEYS {
            let value = overrides
                .iter()
                .find(|(k, _)| *k == key)
                .map_or(Some(self.get(key)), |(_, v)| *v);
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }
}

// =============================================================================
// Table configuration
// =============================================================================

/// Column definition for a data table.
#[derive(Debug, Clone)]
pub struct TableColumn {
    /// Sort key, matched against the repository's whitelist.
    pub key: &'static str,
    pub label: &'static str,
    pub sortable: bool,
    /// Right-aligned (amounts).
    pub numeric: bool,
}

impl TableColumn {
    /// Create a new sortable column.
    #[must_use]
    pub const fn sortable(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            sortable: true,
            numeric: false,
        }
    }

    /// Create a new non-sortable column.
    #[must_use]
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            sortable: false,
            numeric: false,
        }
    }

    #[must_use]
    pub const fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }
}

/// Option for select filters.
#[derive(Debug, Clone)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    /// Create a new filter option.
    #[must_use]
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Filter control shown above a table.
#[derive(Debug, Clone)]
pub enum TableFilter {
    Select {
        key: &'static str,
        label: &'static str,
        options: Vec<FilterOption>,
    },
    Date {
        key: &'static str,
        label: &'static str,
    },
}

impl TableFilter {
    /// Create a select filter with an "All" choice.
    #[must_use]
    pub const fn select(key: &'static str, label: &'static str, options: Vec<FilterOption>) -> Self {
        Self::Select {
            key,
            label,
            options,
        }
    }

    #[must_use]
    pub const fn date(key: &'static str, label: &'static str) -> Self {
        Self::Date { key, label }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Select { key, .. } | Self::Date { key, .. } => key,
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Select { label, .. } | Self::Date { label, .. } => label,
        }
    }

    #[must_use]
    pub const fn is_date(&self) -> bool {
        matches!(self, Self::Date { .. })
    }

    #[must_use]
    pub fn options(&self) -> &[FilterOption] {
        match self {
            Self::Select { options, .. } => options,
            Self::Date { .. } => &[],
        }
    }
}

/// Configuration for a data table.
#[derive(Debug, Clone)]
pub struct DataTableConfig {
    pub table_id: &'static str,
    pub columns: Vec<TableColumn>,
    pub filters: Vec<TableFilter>,
    pub search_placeholder: &'static str,
    pub empty_title: &'static str,
}

impl DataTableConfig {
    /// Create a new data table configuration.
    #[must_use]
    pub const fn new(table_id: &'static str) -> Self {
        Self {
            table_id,
            columns: Vec::new(),
            filters: Vec::new(),
            search_placeholder: "Search...",
            empty_title: "Nothing here yet",
        }
    }

    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: TableFilter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub const fn search_placeholder(mut self, placeholder: &'static str) -> Self {
        self.search_placeholder = placeholder;
        self
    }

    #[must_use]
    pub const fn empty_state(mut self, title: &'static str) -> Self {
        self.empty_title = title;
        self
    }
}

fn purchase_status_options() -> Vec<FilterOption> {
    PurchaseStatus::ALL
        .iter()
        .map(|s| FilterOption::new(s.as_str(), s.label()))
        .collect()
}

fn payment_status_options() -> Vec<FilterOption> {
    PaymentStatus::ALL
        .iter()
        .map(|s| FilterOption::new(s.as_str(), s.label()))
        .collect()
}

/// Shop admin customer table; `collectors` feeds the collector filter.
#[must_use]
pub fn customers_table_config(collectors: Vec<FilterOption>) -> DataTableConfig {
    DataTableConfig::new("customers")
        .column(TableColumn::sortable("name", "Customer"))
        .column(TableColumn::sortable("phone", "Phone"))
        .column(TableColumn::sortable("collector", "Collector"))
        .column(TableColumn::new("open", "Open purchases").numeric())
        .column(TableColumn::sortable("outstanding", "Outstanding").numeric())
        .column(TableColumn::sortable("created", "Added"))
        .filter(TableFilter::select("collector", "Collector", collectors))
        .search_placeholder("Search name, phone or ID number")
        .empty_state("No customers found")
}

/// Customers assigned to the signed-in collector.
#[must_use]
pub fn collector_customers_table_config() -> DataTableConfig {
    DataTableConfig::new("assigned-customers")
        .column(TableColumn::sortable("name", "Customer"))
        .column(TableColumn::sortable("phone", "Phone"))
        .column(TableColumn::new("address", "Address"))
        .column(TableColumn::new("open", "Open purchases").numeric())
        .column(TableColumn::sortable("outstanding", "Outstanding").numeric())
        .search_placeholder("Search name or phone")
        .empty_state("No customers are assigned to you")
}

#[must_use]
pub fn products_table_config() -> DataTableConfig {
    DataTableConfig::new("products")
        .column(TableColumn::sortable("name", "Product"))
        .column(TableColumn::sortable("sku", "SKU"))
        .column(TableColumn::sortable("price", "Price").numeric())
        .column(TableColumn::new("active", "Status"))
        .column(TableColumn::sortable("created", "Added"))
        .search_placeholder("Search name or SKU")
        .empty_state("No products yet")
}

#[must_use]
pub fn purchases_table_config() -> DataTableConfig {
    DataTableConfig::new("purchases")
        .column(TableColumn::sortable("number", "Number"))
        .column(TableColumn::sortable("customer", "Customer"))
        .column(TableColumn::sortable("status", "Status"))
        .column(TableColumn::sortable("total", "Total").numeric())
        .column(TableColumn::sortable("outstanding", "Outstanding").numeric())
        .column(TableColumn::sortable("due", "First due"))
        .column(TableColumn::sortable("created", "Created"))
        .filter(TableFilter::select("status", "Status", purchase_status_options()))
        .search_placeholder("Search number or customer")
        .empty_state("No purchases found")
}

/// Shop admin payment table; `collectors` feeds the collector filter.
/// Pending payments sort first by default.
#[must_use]
pub fn shop_payments_table_config(collectors: Vec<FilterOption>) -> DataTableConfig {
    DataTableConfig::new("payments")
        .column(TableColumn::sortable("reference", "Reference"))
        .column(TableColumn::sortable("date", "Date"))
        .column(TableColumn::sortable("customer", "Customer"))
        .column(TableColumn::new("purchase", "Purchase"))
        .column(TableColumn::sortable("collector", "Collector"))
        .column(TableColumn::new("method", "Method"))
        .column(TableColumn::sortable("amount", "Amount").numeric())
        .column(TableColumn::sortable("status", "Status"))
        .filter(TableFilter::select("status", "Status", payment_status_options()))
        .filter(TableFilter::select("collector", "Collector", collectors))
        .filter(TableFilter::date("from", "From"))
        .filter(TableFilter::date("to", "To"))
        .search_placeholder("Search reference, customer or purchase")
        .empty_state("No payments found")
}

#[must_use]
pub fn collector_payments_table_config() -> DataTableConfig {
    DataTableConfig::new("my-payments")
        .column(TableColumn::sortable("reference", "Reference"))
        .column(TableColumn::sortable("date", "Date"))
        .column(TableColumn::sortable("customer", "Customer"))
        .column(TableColumn::new("purchase", "Purchase"))
        .column(TableColumn::sortable("amount", "Amount").numeric())
        .column(TableColumn::sortable("status", "Status"))
        .filter(TableFilter::select("status", "Status", payment_status_options()))
        .search_placeholder("Search reference or customer")
        .empty_state("You have not recorded any payments")
}

/// Cross-shop payment report; `shops` feeds the shop filter.
#[must_use]
pub fn business_payments_table_config(shops: Vec<FilterOption>) -> DataTableConfig {
    DataTableConfig::new("business-payments")
        .column(TableColumn::sortable("reference", "Reference"))
        .column(TableColumn::sortable("date", "Date"))
        .column(TableColumn::sortable("shop", "Shop"))
        .column(TableColumn::sortable("customer", "Customer"))
        .column(TableColumn::sortable("collector", "Collector"))
        .column(TableColumn::sortable("amount", "Amount").numeric())
        .column(TableColumn::sortable("status", "Status"))
        .filter(TableFilter::select("shop", "Shop", shops))
        .filter(TableFilter::select("status", "Status", payment_status_options()))
        .filter(TableFilter::date("from", "From"))
        .filter(TableFilter::date("to", "To"))
        .search_placeholder("Search reference, customer or purchase")
        .empty_state("No payments match these filters")
}

// =============================================================================
// Rendering state
// =============================================================================

/// A table configuration bound to the current request.
#[derive(Debug, Clone)]
pub struct DataTable {
    pub config: DataTableConfig,
    pub query: ListQuery,
    /// Path of the list page, used as the base of every link.
    pub path: String,
    pub page: u32,
    pub total_pages: u32,
    pub total: i64,
}

impl DataTable {
    #[must_use]
    pub fn new<T>(config: DataTableConfig, path: &str, query: ListQuery, page: &Page<T>) -> Self {
        Self {
            config,
            query,
            path: path.to_string(),
            page: page.page,
            total_pages: page.total_pages(),
            total: page.total,
        }
    }

    /// Current search text.
    #[must_use]
    pub fn search(&self) -> &str {
        self.query.get("q")
    }

    /// Link that sorts by `key`, flipping direction when already sorted by it.
    #[must_use]
    pub fn sort_href(&self, key: &str) -> String {
        let descending = self.query.get("sort") == key && !self.query.is_descending();
        let dir = if descending { "desc" } else { "asc" };
        let qs = self
            .query
            .query_string(&[("sort", Some(key)), ("dir", Some(dir)), ("page", None)]);
        format!("{}?{qs}", self.path)
    }

    /// Arrow shown next to the sorted column header.
    #[must_use]
    pub fn sort_indicator(&self, key: &str) -> &'static str {
        if self.query.get("sort") != key {
            ""
        } else if self.query.is_descending() {
            "\u{25bc}"
        } else {
            "\u{25b2}"
        }
    }

    #[must_use]
    pub fn page_href(&self, page: u32) -> String {
        let page = page.to_string();
        let qs = self.query.query_string(&[("page", Some(page.as_str()))]);
        format!("{}?{qs}", self.path)
    }

    /// Link to `target` carrying the current filters, without paging.
    #[must_use]
    pub fn href_with_filters(&self, target: &str) -> String {
        let qs = self.query.query_string(&[("page", None)]);
        if qs.is_empty() {
            target.to_string()
        } else {
            format!("{target}?{qs}")
        }
    }

    /// Whether the filter `key` is currently set to `value`.
    #[must_use]
    pub fn is_selected(&self, key: &str, value: &str) -> bool {
        self.query.get(key) == value
    }

    #[must_use]
    pub fn value(&self, key: &str) -> &str {
        self.query.get(key)
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    #[must_use]
    pub const fn prev_page(&self) -> u32 {
        self.page.saturating_sub(1)
    }

    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.page.saturating_add(1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(pairs: &str) -> ListQuery {
        let parsed: Vec<(String, String)> = url::form_urlencoded::parse(pairs.as_bytes())
            .into_owned()
            .collect();
        let mut q = ListQuery::default();
        for (k, v) in parsed {
            let slot = match k.as_str() {
                "q" => &mut q.q,
                "status" => &mut q.status,
                "sort" => &mut q.sort,
                "dir" => &mut q.dir,
                "page" => &mut q.page,
                "collector" => &mut q.collector,
                "shop" => &mut q.shop,
                "from" => &mut q.from,
                "to" => &mut q.to,
                _ => continue,
            };
            *slot = Some(v);
        }
        q
    }

    #[test]
    fn test_params_from_query() {
        let params = query("q=+jane+&sort=name&dir=DESC&page=3").params();
        assert_eq!(params.search.as_deref(), Some("jane"));
        assert_eq!(params.sort.as_deref(), Some("name"));
        assert!(params.descending);
        assert_eq!(params.page, 3);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let q = query("page=abc&status=LOST&collector=x&from=yesterday");
        assert_eq!(q.params().page, 1);
        assert_eq!(q.purchase_status(), None);
        assert_eq!(q.collector_id(), None);
        assert_eq!(q.payment_filter().from, None);
    }

    #[test]
    fn test_payment_filter() {
        let filter = query("status=pending&shop=4&from=2025-01-01&to=2025-01-31").payment_filter();
        assert_eq!(filter.status, Some(PaymentStatus::Pending));
        assert_eq!(filter.shop_id, Some(ShopId::new(4)));
        assert_eq!(filter.from, NaiveDate::from_ymd_opt(2025, 1, 1));
        assert_eq!(filter.to, NaiveDate::from_ymd_opt(2025, 1, 31));
    }

    #[test]
    fn test_query_string_overrides() {
        let q = query("q=a b&status=OVERDUE&page=2");
        assert_eq!(
            q.query_string(&[("page", None)]),
            "q=a+b&status=OVERDUE"
        );
        assert_eq!(
            q.query_string(&[("sort", Some("total")), ("dir", Some("asc"))]),
            "q=a+b&status=OVERDUE&sort=total&dir=asc&page=2"
        );
    }

    #[test]
    fn test_sort_links_toggle_direction() {
        let page: Page<()> = Page::new(vec![], &ListParams::default(), 0);
        let table = DataTable::new(
            purchases_table_config(),
            "/shop-admin/purchases",
            query("sort=total&dir=asc&page=4"),
            &page,
        );
        assert_eq!(
            table.sort_href("total"),
            "/shop-admin/purchases?sort=total&dir=desc"
        );
        assert_eq!(
            table.sort_href("customer"),
            "/shop-admin/purchases?sort=customer&dir=asc"
        );
        assert_eq!(table.sort_indicator("total"), "\u{25b2}");
        assert_eq!(table.sort_indicator("customer"), "");
    }

    #[test]
    fn test_paging() {
        let params = ListParams {
            page: 2,
            ..ListParams::default()
        };
        let page: Page<()> = Page::new(vec![], &params, 120);
        let table = DataTable::new(
            products_table_config(),
            "/shop-admin/products",
            query("page=2"),
            &page,
        );
        assert!(table.has_prev());
        assert_eq!(table.page_href(table.next_page()), "/shop-admin/products?page=3");
        assert_eq!(table.href_with_filters("/print"), "/print");
    }
}
