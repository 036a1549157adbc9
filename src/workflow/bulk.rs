use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

use crate::domain::cod::{CodCommand, CodError};
use crate::domain::order::{OrderId, OrderStatus};
use super::cod::CodVerificationTracker;
use super::error::WorkflowError;
use super::notify::Severity;
use super::signals::RefreshSignal;
use super::status::OrderStatusMachine;
use super::WorkflowContext;

// ============================================================================
// Bulk Operations
// ============================================================================
//
// One action applied to many orders, strictly one after another. A failing
// item is recorded and the run moves on; partial failure is part of the
// outcome, never an error.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum BulkAction {
    SetStatus {
        status: OrderStatus,
        notes: Option<String>,
    },
    VerifyCod {
        notes: Option<String>,
    },
    RejectCod {
        notes: String,
    },
    MarkCodPaid,
}

impl BulkAction {
    /// Checks that need no order: a blank reject note fails every item alike
    pub fn validate(&self) -> Result<(), WorkflowError> {
        match self {
            BulkAction::RejectCod { notes } if notes.trim().is_empty() => {
                Err(CodError::EmptyRejectionNotes.into())
            }
            _ => Ok(()),
        }
    }

    /// Parse an action name: a status (`delivered`) or `verify_cod`,
    /// `reject_cod`, `cod_paid`
    pub fn parse(action: &str, notes: Option<String>) -> Result<Self, WorkflowError> {
        let name = action.trim().to_lowercase().replace('-', "_");
        match name.as_str() {
            "verify_cod" | "verify" => Ok(BulkAction::VerifyCod { notes }),
            "reject_cod" | "reject" => Ok(BulkAction::RejectCod {
                notes: notes.unwrap_or_default(),
            }),
            "cod_paid" | "mark_cod_paid" | "mark_paid" => Ok(BulkAction::MarkCodPaid),
            other => other
                .parse::<OrderStatus>()
                .map(|status| BulkAction::SetStatus { status, notes })
                .map_err(|_| WorkflowError::UnknownAction(action.to_string())),
        }
    }
}

impl fmt::Display for BulkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkAction::SetStatus { status, .. } => write!(f, "set status {status}"),
            BulkAction::VerifyCod { .. } => f.write_str("verify COD"),
            BulkAction::RejectCod { .. } => f.write_str("reject COD"),
            BulkAction::MarkCodPaid => f.write_str("mark COD paid"),
        }
    }
}

#[derive(Debug)]
pub struct BulkItemResult {
    pub order_id: OrderId,
    pub error: Option<WorkflowError>,
}

impl BulkItemResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug)]
pub struct BulkOutcome {
    pub id: Uuid,
    pub success_count: usize,
    pub error_count: usize,
    /// One entry per unique order id, in submission order
    pub results: Vec<BulkItemResult>,
}

impl BulkOutcome {
    pub fn get(&self, order_id: OrderId) -> Option<&BulkItemResult> {
        self.results.iter().find(|r| r.order_id == order_id)
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Summary line and severity for the operator
    pub fn summary(&self) -> (String, Severity) {
        let message = format!("updated {} of {} orders", self.success_count, self.total());
        let severity = if self.error_count == 0 {
            Severity::Success
        } else if self.success_count == 0 {
            Severity::Error
        } else {
            Severity::Warning
        };
        (message, severity)
    }
}

/// Unique ids, first occurrence wins
pub fn dedup_order_ids(order_ids: &[OrderId]) -> Vec<OrderId> {
    let mut seen = HashSet::new();
    order_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

#[derive(Clone)]
pub struct BulkOperationCoordinator {
    ctx: WorkflowContext,
    status: OrderStatusMachine,
    cod: CodVerificationTracker,
}

impl BulkOperationCoordinator {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self {
            status: OrderStatusMachine::new(ctx.clone()),
            cod: CodVerificationTracker::new(ctx.clone()),
            ctx,
        }
    }

    pub async fn apply_bulk(
        &self,
        order_ids: &[OrderId],
        action: &BulkAction,
        actor: &str,
    ) -> Result<BulkOutcome, WorkflowError> {
        if order_ids.is_empty() {
            return Err(WorkflowError::EmptySelection);
        }
        action.validate()?;

        let operation_id = Uuid::new_v4();
        let order_ids = dedup_order_ids(order_ids);
        tracing::info!(
            operation_id = %operation_id,
            action = %action,
            orders = order_ids.len(),
            "Starting bulk operation"
        );

        let mut results = Vec::with_capacity(order_ids.len());
        for order_id in order_ids {
            let error = self.apply_one(order_id, action, actor).await.err();
            if let Some(e) = &error {
                tracing::warn!(operation_id = %operation_id, order_id = %order_id, error = %e, "Bulk item failed");
            }
            self.ctx.metrics.record_bulk_item(error.is_none());
            results.push(BulkItemResult { order_id, error });
        }

        let success_count = results.iter().filter(|r| r.is_success()).count();
        let outcome = BulkOutcome {
            id: operation_id,
            success_count,
            error_count: results.len() - success_count,
            results,
        };

        tracing::info!(
            operation_id = %operation_id,
            success_count = outcome.success_count,
            error_count = outcome.error_count,
            "Bulk operation finished"
        );

        self.ctx.bus.publish(RefreshSignal::BulkCompleted {
            operation_id,
            success_count: outcome.success_count,
            error_count: outcome.error_count,
        });
        self.ctx.bus.publish(RefreshSignal::ListInvalidated);

        Ok(outcome)
    }

    async fn apply_one(
        &self,
        order_id: OrderId,
        action: &BulkAction,
        actor: &str,
    ) -> Result<(), WorkflowError> {
        let order = self.ctx.api.get_order(order_id).await?;

        match action {
            BulkAction::SetStatus { status, notes } => {
                self.status
                    .transition_quietly(&order, *status, actor, notes.as_deref())
                    .await?;
            }
            BulkAction::VerifyCod { notes } => {
                let command = CodCommand::Verify {
                    actor: actor.to_string(),
                    notes: notes.clone(),
                };
                self.cod.execute_quietly(&order, &command).await?;
            }
            BulkAction::RejectCod { notes } => {
                let command = CodCommand::Reject {
                    actor: actor.to_string(),
                    notes: notes.clone(),
                };
                self.cod.execute_quietly(&order, &command).await?;
            }
            BulkAction::MarkCodPaid => {
                let command = CodCommand::MarkDeliveredPaid {
                    actor: actor.to_string(),
                };
                self.cod.execute_quietly(&order, &command).await?;
            }
        }
        Ok(())
    }
}
