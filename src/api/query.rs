use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::domain::order::{Order, OrderStatus, PaymentMethod};

// ============================================================================
// Order Table Query
// ============================================================================
//
// Filters are ANDed together and an absent filter leaves its field
// unconstrained. Any change to a filter or to the search term sends the
// table back to page 1; page and ordering never touch the filters.
//
// ============================================================================

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilters {
    pub status: Option<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub is_cod: Option<bool>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
}

impl OrderFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Local evaluation of the filters, used by the in-memory backend
    pub fn matches(&self, order: &Order) -> bool {
        if self.status.is_some_and(|s| order.status != s) {
            return false;
        }
        if self.payment_method.is_some_and(|m| order.payment_method != m) {
            return false;
        }
        if self.is_cod.is_some_and(|cod| order.is_cash_on_delivery() != cod) {
            return false;
        }
        let created = order.created_at.date_naive();
        if self.date_from.is_some_and(|from| created < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| created > to) {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let haystacks = [
                Some(order.order_number.as_str()),
                Some(order.customer_name.as_str()),
                order.customer_phone.as_deref(),
            ];
            if !haystacks
                .into_iter()
                .flatten()
                .any(|h| h.to_lowercase().contains(&term))
            {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    TotalAmount,
    OrderNumber,
    Status,
}

impl SortField {
    fn as_str(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::TotalAmount => "total_amount",
            SortField::OrderNumber => "order_number",
            SortField::Status => "status",
        }
    }
}

/// Table ordering, rendered as `field` or `-field`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    pub fn newest_first() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }

    pub fn compare(&self, a: &Order, b: &Order) -> std::cmp::Ordering {
        let ordering = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::TotalAmount => a.total_amount.cmp(&b.total_amount),
            SortField::OrderNumber => a.order_number.cmp(&b.order_number),
            SortField::Status => a.status.as_str().cmp(b.status.as_str()),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            f.write_str("-")?;
        }
        f.write_str(self.field.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match name {
            "created_at" => SortField::CreatedAt,
            "total_amount" => SortField::TotalAmount,
            "order_number" => SortField::OrderNumber,
            "status" => SortField::Status,
            other => return Err(format!("unknown sort field: {other}")),
        };
        Ok(Self { field, descending })
    }
}

/// Filter, page and ordering state of the order table
#[derive(Debug, Clone, PartialEq)]
pub struct OrderQuery {
    filters: OrderFilters,
    page: u32,
    page_size: u32,
    ordering: Option<SortKey>,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl OrderQuery {
    pub fn new(page_size: u32) -> Self {
        Self {
            filters: OrderFilters::default(),
            page: 1,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            ordering: None,
        }
    }

    pub fn filters(&self) -> &OrderFilters {
        &self.filters
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn ordering(&self) -> Option<SortKey> {
        self.ordering
    }

    fn update_filter<T: PartialEq>(page: &mut u32, slot: &mut T, value: T) {
        if *slot != value {
            *slot = value;
            *page = 1;
        }
    }

    pub fn set_status(&mut self, status: Option<OrderStatus>) {
        Self::update_filter(&mut self.page, &mut self.filters.status, status);
    }

    pub fn set_payment_method(&mut self, method: Option<PaymentMethod>) {
        Self::update_filter(&mut self.page, &mut self.filters.payment_method, method);
    }

    pub fn set_is_cod(&mut self, is_cod: Option<bool>) {
        Self::update_filter(&mut self.page, &mut self.filters.is_cod, is_cod);
    }

    pub fn set_date_from(&mut self, date: Option<NaiveDate>) {
        Self::update_filter(&mut self.page, &mut self.filters.date_from, date);
    }

    pub fn set_date_to(&mut self, date: Option<NaiveDate>) {
        Self::update_filter(&mut self.page, &mut self.filters.date_to, date);
    }

    /// Blank terms clear the search
    pub fn set_search(&mut self, term: impl AsRef<str>) {
        let term = term.as_ref().trim();
        let term = (!term.is_empty()).then(|| term.to_string());
        Self::update_filter(&mut self.page, &mut self.filters.search, term);
    }

    pub fn clear_filters(&mut self) {
        Self::update_filter(&mut self.page, &mut self.filters, OrderFilters::default());
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        if page_size != self.page_size {
            self.page_size = page_size;
            self.page = 1;
        }
    }

    pub fn set_ordering(&mut self, ordering: Option<SortKey>) {
        self.ordering = ordering;
    }

    pub fn validate(&self) -> Result<(), String> {
        if let (Some(from), Some(to)) = (self.filters.date_from, self.filters.date_to) {
            if from > to {
                return Err(format!("date_from {from} is after date_to {to}"));
            }
        }
        Ok(())
    }

    /// Query-string pairs for `GET /orders/`
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let filters = &self.filters;
        let mut pairs = Vec::new();

        if let Some(status) = filters.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        if let Some(method) = filters.payment_method {
            pairs.push(("payment_method", method.as_str().to_string()));
        }
        if let Some(is_cod) = filters.is_cod {
            pairs.push(("is_cod", is_cod.to_string()));
        }
        if let Some(from) = filters.date_from {
            pairs.push(("date_from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = filters.date_to {
            pairs.push(("date_to", to.format("%Y-%m-%d").to_string()));
        }
        if let Some(search) = &filters.search {
            pairs.push(("search", search.clone()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("page_size", self.page_size.to_string()));
        if let Some(ordering) = self.ordering {
            pairs.push(("ordering", ordering.to_string()));
        }

        pairs
    }
}

/// One page of the order table
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    /// Records dropped because they failed validation
    pub quarantined: usize,
}

impl OrderPage {
    pub fn total_pages(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.count.div_ceil(u64::from(self.page_size.max(1)))
        }
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_change_resets_page_and_keeps_filters() {
        let mut query = OrderQuery::default();
        query.set_status(Some(OrderStatus::Pending));
        query.set_is_cod(Some(true));
        query.set_page(4);

        query.set_search("SHO");

        assert_eq!(query.page(), 1);
        assert_eq!(query.filters().status, Some(OrderStatus::Pending));
        assert_eq!(query.filters().is_cod, Some(true));
        assert_eq!(query.filters().search.as_deref(), Some("SHO"));
    }

    #[test]
    fn test_unchanged_filter_keeps_page() {
        let mut query = OrderQuery::default();
        query.set_status(Some(OrderStatus::Processing));
        query.set_page(3);

        query.set_status(Some(OrderStatus::Processing));
        assert_eq!(query.page(), 3);

        query.set_search("   ");
        assert_eq!(query.page(), 3);
        assert!(query.filters().search.is_none());
    }

    #[test]
    fn test_every_filter_change_resets_page() {
        let mut query = OrderQuery::default();
        let edits: [fn(&mut OrderQuery); 5] = [
            |q| q.set_payment_method(Some(PaymentMethod::MtnMomo)),
            |q| q.set_is_cod(Some(false)),
            |q| q.set_date_from(NaiveDate::from_ymd_opt(2024, 5, 1)),
            |q| q.set_date_to(NaiveDate::from_ymd_opt(2024, 5, 31)),
            |q| q.set_page_size(50),
        ];

        for edit in edits {
            query.set_page(5);
            edit(&mut query);
            assert_eq!(query.page(), 1);

            // same value again is not a change
            query.set_page(5);
            edit(&mut query);
            assert_eq!(query.page(), 5);
        }

        let filters = query.filters();
        assert_eq!(filters.payment_method, Some(PaymentMethod::MtnMomo));
        assert_eq!(filters.is_cod, Some(false));
        assert!(filters.date_from.is_some() && filters.date_to.is_some());
        assert!(!filters.is_empty());
        assert_eq!(query.page_size(), 50);

        query.clear_filters();
        assert!(query.filters().is_empty());
        assert_eq!(query.page(), 1);
        assert_eq!(query.page_size(), 50);

        query.set_page(2);
        query.clear_filters();
        assert_eq!(query.page(), 2);
    }

    #[test]
    fn test_page_and_ordering_do_not_touch_filters() {
        let mut query = OrderQuery::default();
        query.set_payment_method(Some(PaymentMethod::AirtelMoney));
        let filters = query.filters().clone();

        query.set_page(2);
        query.set_ordering(Some(SortKey::newest_first()));

        assert_eq!(query.filters(), &filters);
        assert_eq!(query.page(), 2);
    }

    #[test]
    fn test_query_pairs() {
        let mut query = OrderQuery::new(50);
        query.set_status(Some(OrderStatus::OutForDelivery));
        query.set_is_cod(Some(true));
        query.set_date_from(NaiveDate::from_ymd_opt(2024, 5, 1));
        query.set_ordering(Some("-total_amount".parse().unwrap()));

        assert_eq!(
            query.to_query_pairs(),
            vec![
                ("status", "out_for_delivery".to_string()),
                ("is_cod", "true".to_string()),
                ("date_from", "2024-05-01".to_string()),
                ("page", "1".to_string()),
                ("page_size", "50".to_string()),
                ("ordering", "-total_amount".to_string()),
            ]
        );
    }

    #[test]
    fn test_reversed_date_range_is_invalid() {
        let mut query = OrderQuery::default();
        query.set_date_from(NaiveDate::from_ymd_opt(2024, 6, 1));
        query.set_date_to(NaiveDate::from_ymd_opt(2024, 5, 1));
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(OrderQuery::new(0).page_size(), 1);
        assert_eq!(OrderQuery::new(500).page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_total_pages() {
        let page = OrderPage {
            orders: Vec::new(),
            count: 41,
            page: 2,
            page_size: 20,
            quarantined: 0,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
    }
}
