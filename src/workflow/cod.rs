use crate::domain::cod::CodCommand;
use crate::domain::order::Order;
use super::error::WorkflowError;
use super::notify::Severity;
use super::signals::RefreshSignal;
use super::WorkflowContext;

// ============================================================================
// COD Verification Tracker
// ============================================================================
//
// Drives the verification sub-state of cash-on-delivery orders. Nothing here
// changes the order's fulfillment status; confirming and verifying an order
// are two separate calls.
//
// ============================================================================

#[derive(Clone)]
pub struct CodVerificationTracker {
    ctx: WorkflowContext,
}

impl CodVerificationTracker {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self { ctx }
    }

    pub async fn verify(
        &self,
        order: &Order,
        actor: &str,
        notes: Option<&str>,
    ) -> Result<Order, WorkflowError> {
        let command = CodCommand::Verify {
            actor: actor.to_string(),
            notes: notes.map(str::to_string),
        };
        self.run(order, command).await
    }

    /// Notes are mandatory when rejecting
    pub async fn reject(&self, order: &Order, actor: &str, notes: &str) -> Result<Order, WorkflowError> {
        let command = CodCommand::Reject {
            actor: actor.to_string(),
            notes: notes.to_string(),
        };
        self.run(order, command).await
    }

    pub async fn mark_paid(&self, order: &Order, actor: &str) -> Result<Order, WorkflowError> {
        let command = CodCommand::MarkDeliveredPaid {
            actor: actor.to_string(),
        };
        self.run(order, command).await
    }

    async fn run(&self, order: &Order, command: CodCommand) -> Result<Order, WorkflowError> {
        let action = command.action_name();
        let result = self.execute_quietly(order, &command).await;
        if let Err(e) = &result {
            self.ctx.notifier.notify(
                &format!("COD {action} failed for order {}: {e}", order.order_number),
                Severity::Error,
            );
        }
        result
    }

    pub(crate) async fn execute_quietly(
        &self,
        order: &Order,
        command: &CodCommand,
    ) -> Result<Order, WorkflowError> {
        let _guard = self.ctx.in_flight.acquire(order.id)?;
        let action = command.action_name();

        if let Err(e) = order.handle_cod_command(command) {
            tracing::info!(order_id = %order.id, action = action, error = %e, "COD action rejected locally");
            self.ctx.metrics.record_cod_action(action, false);
            return Err(e.into());
        }

        let api = &self.ctx.api;
        let response = match command {
            CodCommand::Verify { notes, .. } => api.verify_cod(order.id, notes.as_deref()).await,
            CodCommand::Reject { notes, .. } => api.reject_cod(order.id, notes.trim()).await,
            CodCommand::MarkDeliveredPaid { .. } => api.mark_cod_paid(order.id).await,
        };

        let returned = match response {
            Ok(returned) => returned,
            Err(e) => {
                tracing::warn!(order_id = %order.id, action = action, error = %e, "Backend refused COD action");
                self.ctx.metrics.record_cod_action(action, false);
                return Err(e.into());
            }
        };

        let fresh = self.ctx.refetch(order.id, returned).await;

        tracing::info!(
            order_id = %order.id,
            action = action,
            verification = ?fresh.cod_status(),
            "COD verification updated"
        );
        self.ctx.metrics.record_cod_action(action, true);
        self.ctx.bus.publish(RefreshSignal::OrderChanged(order.id));

        Ok(fresh)
    }
}
