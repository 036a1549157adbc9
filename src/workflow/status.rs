use crate::domain::core::Aggregate;
use crate::domain::order::{Order, OrderCommand, OrderStatus};
use super::error::WorkflowError;
use super::notify::Severity;
use super::signals::RefreshSignal;
use super::WorkflowContext;

/// Validates status transitions locally and requests them from the backend
#[derive(Clone)]
pub struct OrderStatusMachine {
    ctx: WorkflowContext,
}

impl OrderStatusMachine {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    /// Move `order` to `target`, returning the refetched record
    ///
    /// Failures are reported through the notifier and returned; the caller's
    /// copy of the order is never touched.
    pub async fn request_transition(
        &self,
        order: &Order,
        target: OrderStatus,
        actor: &str,
        notes: Option<&str>,
    ) -> Result<Order, WorkflowError> {
        let result = self.transition_quietly(order, target, actor, notes).await;
        if let Err(e) = &result {
            self.ctx.notifier.notify(
                &format!("Could not move order {} to {}: {e}", order.order_number, target),
                Severity::Error,
            );
        }
        result
    }

    pub async fn confirm(&self, order: &Order, actor: &str) -> Result<Order, WorkflowError> {
        self.request_transition(order, OrderStatus::Confirmed, actor, None).await
    }

    pub async fn mark_delivered(&self, order: &Order, actor: &str) -> Result<Order, WorkflowError> {
        self.request_transition(order, OrderStatus::Delivered, actor, None).await
    }

    pub async fn cancel(
        &self,
        order: &Order,
        actor: &str,
        notes: Option<&str>,
    ) -> Result<Order, WorkflowError> {
        self.request_transition(order, OrderStatus::Cancelled, actor, notes).await
    }

    /// Same flow without the failure notification, for bulk runs
    pub(crate) async fn transition_quietly(
        &self,
        order: &Order,
        target: OrderStatus,
        actor: &str,
        notes: Option<&str>,
    ) -> Result<Order, WorkflowError> {
        let _guard = self.ctx.in_flight.acquire(order.id)?;
        let from = order.status;

        let command = OrderCommand::transition(target, actor, notes.map(str::to_string));
        if let Err(e) = order.handle_command(&command) {
            tracing::info!(order_id = %order.id, from = %from, to = %target, error = %e, "Transition rejected locally");
            self.ctx.metrics.record_transition_failure("rule");
            return Err(e.into());
        }

        let api = &self.ctx.api;
        // The sugar endpoints take no body, so notes force the PATCH route.
        let response = match (target, notes) {
            (OrderStatus::Confirmed, None) => api.confirm(order.id).await,
            (OrderStatus::Delivered, None) => api.mark_delivered(order.id).await,
            _ => api.update_status(order.id, target, notes).await,
        };

        let returned = match response {
            Ok(returned) => returned,
            Err(e) => {
                tracing::warn!(order_id = %order.id, from = %from, to = %target, error = %e, "Backend refused transition");
                self.ctx.metrics.record_transition_failure(e.kind());
                return Err(e.into());
            }
        };

        let fresh = self.ctx.refetch(order.id, returned).await;

        tracing::info!(order_id = %order.id, from = %from, to = %fresh.status, actor = actor, "Order status changed");
        self.ctx.metrics.record_transition(from.as_str(), target.as_str());
        self.ctx.bus.publish(RefreshSignal::OrderChanged(order.id));

        Ok(fresh)
    }
}
