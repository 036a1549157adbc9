//! In-memory backend of record
//!
//! Applies the same aggregate rules the REST backend enforces, so the desk
//! can run end-to-end without a server. Used by `order-desk --demo` and by
//! the workflow tests, which also use its failure injection and request
//! counter.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::cod::{CodCommand, CodError, CodEvent};
use crate::domain::core::Aggregate;
use crate::domain::order::{
    Order, OrderCommand, OrderError, OrderEvent, OrderId, OrderItem, OrderStatus, PaymentMethod,
};
use super::dto::NewNote;
use super::error::ApiError;
use super::query::{OrderPage, OrderQuery, SortKey};
use super::OrderApi;

/// Status the in-memory backend answers with when a rule rejects a request
const RULE_VIOLATION_STATUS: u16 = 400;

pub struct InMemoryOrderApi {
    orders: Mutex<BTreeMap<OrderId, Order>>,
    failures: Mutex<HashMap<OrderId, (u16, String)>>,
    requests: AtomicUsize,
    actor: String,
}

impl Default for InMemoryOrderApi {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderApi {
    pub fn new() -> Self {
        Self::with_actor("admin")
    }

    /// `actor` is recorded as `changed_by` / `created_by` on server-side changes
    pub fn with_actor(actor: impl Into<String>) -> Self {
        Self {
            orders: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(HashMap::new()),
            requests: AtomicUsize::new(0),
            actor: actor.into(),
        }
    }

    pub fn with_orders(self, orders: impl IntoIterator<Item = Order>) -> Self {
        for order in orders {
            self.insert(order);
        }
        self
    }

    pub fn insert(&self, order: Order) {
        self.lock_orders().insert(order.id, order);
    }

    /// Make every mutation against `id` fail with the given HTTP status
    pub fn fail_mutations_for(&self, id: OrderId, status: u16, message: impl Into<String>) {
        self.lock_failures().insert(id, (status, message.into()));
    }

    pub fn clear_failure(&self, id: OrderId) {
        self.lock_failures().remove(&id);
    }

    /// Number of backend calls served so far, reads included
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Current authoritative copy of an order
    pub fn snapshot(&self, id: OrderId) -> Option<Order> {
        self.lock_orders().get(&id).cloned()
    }

    fn lock_orders(&self) -> MutexGuard<'_, BTreeMap<OrderId, Order>> {
        self.orders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_failures(&self) -> MutexGuard<'_, HashMap<OrderId, (u16, String)>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn count_request(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    /// Run a mutation against the stored order, all-or-nothing
    fn mutate<E, F>(&self, id: OrderId, operation: F) -> Result<Order, ApiError>
    where
        E: std::fmt::Display,
        F: FnOnce(&mut Order) -> Result<(), E>,
    {
        self.count_request();

        if let Some((status, message)) = self.lock_failures().get(&id).cloned() {
            return Err(ApiError::from_status(status, &message));
        }

        let mut orders = self.lock_orders();
        let stored = orders
            .get_mut(&id)
            .ok_or_else(|| ApiError::NotFound(format!("order {id}")))?;

        let mut updated = stored.clone();
        operation(&mut updated).map_err(|e| ApiError::Server {
            status: RULE_VIOLATION_STATUS,
            message: e.to_string(),
        })?;

        *stored = updated.clone();
        Ok(updated)
    }

    fn transition(&self, id: OrderId, target: OrderStatus, notes: Option<&str>) -> Result<Order, ApiError> {
        let command = OrderCommand::transition(target, self.actor.clone(), notes.map(str::to_string));
        self.mutate(id, |order| {
            let events = order.execute(&command)?;
            log_applied(id, events.iter().map(OrderEvent::event_type));
            Ok::<_, OrderError>(())
        })
    }

    fn cod(&self, id: OrderId, command: CodCommand) -> Result<Order, ApiError> {
        self.mutate(id, |order| {
            let events = order.execute_cod_command(&command)?;
            log_applied(id, events.iter().map(CodEvent::event_type));
            Ok::<_, CodError>(())
        })
    }
}

fn log_applied<'a>(id: OrderId, event_types: impl Iterator<Item = &'a str>) {
    for event_type in event_types {
        tracing::debug!(order_id = %id, event = event_type, "Applied event");
    }
}

#[async_trait]
impl OrderApi for InMemoryOrderApi {
    async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, ApiError> {
        self.count_request();

        let mut matching: Vec<Order> = self
            .lock_orders()
            .values()
            .filter(|order| query.filters().matches(order))
            .cloned()
            .collect();

        let ordering = query.ordering().unwrap_or_else(SortKey::newest_first);
        matching.sort_by(|a, b| ordering.compare(a, b));

        let count = matching.len() as u64;
        let offset = (query.page() as usize - 1) * query.page_size() as usize;
        let orders = matching
            .into_iter()
            .skip(offset)
            .take(query.page_size() as usize)
            .collect();

        Ok(OrderPage {
            orders,
            count,
            page: query.page(),
            page_size: query.page_size(),
            quarantined: 0,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        self.count_request();
        self.snapshot(id)
            .ok_or_else(|| ApiError::NotFound(format!("order {id}")))
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        admin_notes: Option<&str>,
    ) -> Result<Order, ApiError> {
        self.transition(id, status, admin_notes)
    }

    async fn confirm(&self, id: OrderId) -> Result<Order, ApiError> {
        self.transition(id, OrderStatus::Confirmed, None)
    }

    async fn mark_delivered(&self, id: OrderId) -> Result<Order, ApiError> {
        self.transition(id, OrderStatus::Delivered, None)
    }

    async fn verify_cod(&self, id: OrderId, notes: Option<&str>) -> Result<Order, ApiError> {
        self.cod(
            id,
            CodCommand::Verify {
                actor: self.actor.clone(),
                notes: notes.map(str::to_string),
            },
        )
    }

    async fn reject_cod(&self, id: OrderId, notes: &str) -> Result<Order, ApiError> {
        self.cod(
            id,
            CodCommand::Reject {
                actor: self.actor.clone(),
                notes: notes.to_string(),
            },
        )
    }

    async fn mark_cod_paid(&self, id: OrderId) -> Result<Order, ApiError> {
        self.cod(
            id,
            CodCommand::MarkDeliveredPaid {
                actor: self.actor.clone(),
            },
        )
    }

    async fn add_note(&self, id: OrderId, note: &NewNote) -> Result<Order, ApiError> {
        let command = OrderCommand::AddNote {
            note_type: note.note_type,
            note: note.note.clone(),
            is_internal: note.is_internal,
            actor: self.actor.clone(),
        };
        self.mutate(id, |order| {
            let events = order.execute(&command)?;
            log_applied(id, events.iter().map(OrderEvent::event_type));
            Ok::<_, OrderError>(())
        })
    }
}

// ============================================================================
// Demo Data
// ============================================================================

fn item(name: &str, quantity: u32, unit_price: i64) -> OrderItem {
    OrderItem {
        product_name: name.to_string(),
        quantity,
        unit_price: Decimal::new(unit_price, 0),
    }
}

const HAPPY_PATH: [OrderStatus; 4] = [
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
];

/// Walk a freshly placed order along the happy path up to `target`
fn advance(order: &mut Order, target: OrderStatus) {
    let path: &[OrderStatus] = match target {
        OrderStatus::Cancelled => &[OrderStatus::Cancelled],
        _ => match HAPPY_PATH.iter().position(|s| *s == target) {
            Some(end) => &HAPPY_PATH[..=end],
            None => &[],
        },
    };

    for status in path {
        if let Err(e) = order.execute(&OrderCommand::transition(*status, "system", None)) {
            tracing::warn!(order_id = %order.id, error = %e, "Could not seed demo order status");
            return;
        }
    }
}

/// A small shop's worth of orders in every interesting state
pub fn seeded_demo() -> InMemoryOrderApi {
    let now = Utc::now();
    let seeds = [
        (1, "SHO001", "Nakato Sarah", "0772 123 456", PaymentMethod::CashOnDelivery, OrderStatus::Pending,
            vec![item("Matooke bunch", 2, 15_000), item("Groundnut paste 500g", 1, 8_500)]),
        (2, "SHO002", "Okello Brian", "0752 987 654", PaymentMethod::MtnMomo, OrderStatus::Confirmed,
            vec![item("Rolex maker pan", 1, 45_000)]),
        (3, "SHO003", "Namubiru Grace", "+256 701 555 010", PaymentMethod::AirtelMoney, OrderStatus::Processing,
            vec![item("Kitenge fabric 6 yards", 2, 60_000)]),
        (4, "SHO004", "Mugisha Allan", "0788 444 321", PaymentMethod::CashOnDelivery, OrderStatus::OutForDelivery,
            vec![item("Solar lantern", 1, 85_000), item("Phone charger", 2, 12_000)]),
        (5, "SHO005", "Auma Esther", "0772 000 111", PaymentMethod::CashOnDelivery, OrderStatus::Delivered,
            vec![item("Sugar 2kg", 3, 9_000)]),
        (6, "SHO006", "Ssemakula Peter", "0705 222 333", PaymentMethod::MtnMomo, OrderStatus::Cancelled,
            vec![item("Jerrycan 20L", 2, 14_000)]),
        (7, "SHO007", "Achieng Mercy", "0776 888 999", PaymentMethod::CashOnDelivery, OrderStatus::Pending,
            vec![item("Rice 5kg", 1, 32_000)]),
        (8, "SHO008", "Kato Daniel", "0741 321 654", PaymentMethod::AirtelMoney, OrderStatus::Pending,
            vec![item("Bodaboda helmet", 1, 70_000)]),
    ];

    let orders = seeds
        .into_iter()
        .map(|(id, number, customer, phone, method, status, items)| {
            let mut order = Order::new(OrderId(id), number, customer, method, items, Decimal::new(5_000, 0));
            order.customer_phone = Some(crate::domain::phone::PhoneNumber::normalize(phone));
            order.delivery_address = Some("Kampala".to_string());
            order.created_at = now - Duration::hours(id as i64 * 6);
            advance(&mut order, status);
            order
        })
        .collect::<Vec<_>>();

    InMemoryOrderApi::new().with_orders(orders)
}
