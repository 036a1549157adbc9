use crate::api::ApiError;
use crate::domain::cod::CodError;
use crate::domain::order::{OrderError, OrderId};

// ============================================================================
// Workflow Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Cod(#[from] CodError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Order {0} already has a request in flight")]
    Busy(OrderId),

    #[error("No orders selected")]
    EmptySelection,

    #[error("Unknown bulk action: {0}")]
    UnknownAction(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl WorkflowError {
    /// Short label for the failure metrics
    pub fn reason(&self) -> &'static str {
        match self {
            WorkflowError::Order(_) | WorkflowError::Cod(_) => "rule",
            WorkflowError::Api(e) => e.kind(),
            WorkflowError::Busy(_) => "busy",
            WorkflowError::EmptySelection => "empty_selection",
            WorkflowError::UnknownAction(_) => "unknown_action",
            WorkflowError::InvalidQuery(_) => "invalid_query",
        }
    }
}
