use std::sync::Arc;

use crate::api::{NewNote, OrderApi, OrderPage, OrderQuery};
use crate::domain::core::Aggregate;
use crate::domain::order::{NoteType, Order, OrderCommand, OrderId, OrderStatus};
use crate::metrics::Metrics;
use crate::workflow::{
    BulkAction, BulkOperationCoordinator, BulkOutcome, CodVerificationTracker, InFlightOrders,
    Notifier, OrderQueryView, OrderStatusMachine, RefreshBus, RefreshSignal, Severity,
    WorkflowContext, WorkflowError,
};

// ============================================================================
// Order Desk - Application state
// ============================================================================
//
// Owns the backend handle, the notifier, the refresh bus, the busy guard,
// the order table and the row selection. Every operator action goes through
// here.
//
// ============================================================================

pub struct OrderDesk {
    ctx: WorkflowContext,
    status: OrderStatusMachine,
    cod: CodVerificationTracker,
    bulk: BulkOperationCoordinator,
    view: OrderQueryView,
    selection: Vec<OrderId>,
    actor: String,
}

impl OrderDesk {
    pub fn new(
        api: Arc<dyn OrderApi>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<Metrics>,
        actor: impl Into<String>,
        page_size: u32,
    ) -> Self {
        let ctx = WorkflowContext::new(api, notifier, metrics);
        let view = OrderQueryView::new(Arc::clone(&ctx.api), &ctx.bus, OrderQuery::new(page_size));

        Self {
            status: OrderStatusMachine::new(ctx.clone()),
            cod: CodVerificationTracker::new(ctx.clone()),
            bulk: BulkOperationCoordinator::new(ctx.clone()),
            view,
            selection: Vec::new(),
            actor: actor.into(),
            ctx,
        }
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn bus(&self) -> &RefreshBus {
        &self.ctx.bus
    }

    pub fn in_flight(&self) -> &InFlightOrders {
        &self.ctx.in_flight
    }

    pub fn metrics(&self) -> &Metrics {
        &self.ctx.metrics
    }

    // ------------------------------------------------------------------------
    // Single-order actions
    // ------------------------------------------------------------------------

    pub async fn fetch_order(&self, id: OrderId) -> Result<Order, WorkflowError> {
        Ok(self.ctx.api.get_order(id).await?)
    }

    pub async fn request_transition(
        &self,
        order: &Order,
        target: OrderStatus,
        notes: Option<&str>,
    ) -> Result<Order, WorkflowError> {
        self.status
            .request_transition(order, target, &self.actor, notes)
            .await
    }

    pub async fn confirm(&self, order: &Order) -> Result<Order, WorkflowError> {
        self.status.confirm(order, &self.actor).await
    }

    pub async fn mark_delivered(&self, order: &Order) -> Result<Order, WorkflowError> {
        self.status.mark_delivered(order, &self.actor).await
    }

    pub async fn cancel(&self, order: &Order, notes: Option<&str>) -> Result<Order, WorkflowError> {
        self.status.cancel(order, &self.actor, notes).await
    }

    pub async fn verify_cod(&self, order: &Order, notes: Option<&str>) -> Result<Order, WorkflowError> {
        self.cod.verify(order, &self.actor, notes).await
    }

    pub async fn reject_cod(&self, order: &Order, notes: &str) -> Result<Order, WorkflowError> {
        self.cod.reject(order, &self.actor, notes).await
    }

    pub async fn mark_cod_paid(&self, order: &Order) -> Result<Order, WorkflowError> {
        self.cod.mark_paid(order, &self.actor).await
    }

    pub async fn add_note(
        &self,
        order: &Order,
        note_type: NoteType,
        note: &str,
        is_internal: bool,
    ) -> Result<Order, WorkflowError> {
        let result = self.add_note_quietly(order, note_type, note, is_internal).await;
        if let Err(e) = &result {
            self.ctx.notifier.notify(
                &format!("Could not add note to order {}: {e}", order.order_number),
                Severity::Error,
            );
        }
        result
    }

    async fn add_note_quietly(
        &self,
        order: &Order,
        note_type: NoteType,
        note: &str,
        is_internal: bool,
    ) -> Result<Order, WorkflowError> {
        let _guard = self.ctx.in_flight.acquire(order.id)?;

        order.handle_command(&OrderCommand::AddNote {
            note_type,
            note: note.to_string(),
            is_internal,
            actor: self.actor.clone(),
        })?;

        let request = NewNote {
            note_type,
            note: note.trim().to_string(),
            is_internal,
        };
        let returned = self.ctx.api.add_note(order.id, &request).await?;
        let fresh = self.ctx.refetch(order.id, returned).await;

        tracing::info!(order_id = %order.id, note_type = ?note_type, internal = is_internal, "Note added");
        self.ctx.bus.publish(RefreshSignal::OrderChanged(order.id));
        Ok(fresh)
    }

    // ------------------------------------------------------------------------
    // Selection and bulk actions
    // ------------------------------------------------------------------------

    pub fn selection(&self) -> &[OrderId] {
        &self.selection
    }

    pub fn select(&mut self, id: OrderId) {
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    pub fn deselect(&mut self, id: OrderId) {
        self.selection.retain(|selected| *selected != id);
    }

    pub fn toggle(&mut self, id: OrderId) {
        if self.selection.contains(&id) {
            self.deselect(id);
        } else {
            self.select(id);
        }
    }

    /// Select every row of the cached page
    pub fn select_page(&mut self) {
        let ids: Vec<OrderId> = self
            .view
            .current_page()
            .map(|page| page.orders.iter().map(|o| o.id).collect())
            .unwrap_or_default();
        for id in ids {
            self.select(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Apply `action` to `order_ids`, then clear the selection and notify
    /// a one-line summary
    pub async fn apply_bulk(
        &mut self,
        order_ids: &[OrderId],
        action: &BulkAction,
    ) -> Result<BulkOutcome, WorkflowError> {
        let outcome = match self.bulk.apply_bulk(order_ids, action, &self.actor).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.ctx.notifier.notify(&format!("Bulk {action} not started: {e}"), Severity::Warning);
                return Err(e);
            }
        };

        self.selection.clear();
        let (message, severity) = outcome.summary();
        self.ctx.notifier.notify(&message, severity);
        Ok(outcome)
    }

    pub async fn apply_bulk_to_selection(&mut self, action: &BulkAction) -> Result<BulkOutcome, WorkflowError> {
        let ids = self.selection.clone();
        self.apply_bulk(&ids, action).await
    }

    // ------------------------------------------------------------------------
    // Order table
    // ------------------------------------------------------------------------

    pub fn query(&self) -> &OrderQuery {
        self.view.query()
    }

    pub fn update_query(&mut self, edit: impl FnOnce(&mut OrderQuery)) {
        self.view.update_query(edit);
    }

    /// Current page, refetched when the query or any order changed
    pub async fn list(&mut self) -> Result<&OrderPage, WorkflowError> {
        self.view.refresh_if_stale().await?;
        self.view
            .current_page()
            .ok_or_else(|| WorkflowError::InvalidQuery("no page loaded".to_string()))
    }
}
