// ============================================================================
// Order Workflows
// ============================================================================
//
// Client-side flow shared by every mutation:
//
//   busy guard -> local rule check -> backend call -> refetch -> signal
//
// A request the local aggregate rejects never reaches the backend. Records
// are always refetched after a mutation; nothing is patched optimistically.
//
// ============================================================================

pub mod bulk;
pub mod cod;
pub mod error;
pub mod in_flight;
pub mod notify;
pub mod query_view;
pub mod signals;
pub mod status;

use std::sync::Arc;

use crate::api::OrderApi;
use crate::domain::order::{Order, OrderId};
use crate::metrics::Metrics;

pub use bulk::{BulkAction, BulkItemResult, BulkOperationCoordinator, BulkOutcome};
pub use cod::CodVerificationTracker;
pub use error::WorkflowError;
pub use in_flight::{InFlightGuard, InFlightOrders};
pub use notify::{Notifier, RecordingNotifier, Severity, TracingNotifier};
pub use query_view::OrderQueryView;
pub use signals::{RefreshBus, RefreshSignal};
pub use status::OrderStatusMachine;

/// Collaborators every workflow needs
#[derive(Clone)]
pub struct WorkflowContext {
    pub api: Arc<dyn OrderApi>,
    pub notifier: Arc<dyn Notifier>,
    pub bus: RefreshBus,
    pub in_flight: InFlightOrders,
    pub metrics: Arc<Metrics>,
}

impl WorkflowContext {
    pub fn new(api: Arc<dyn OrderApi>, notifier: Arc<dyn Notifier>, metrics: Arc<Metrics>) -> Self {
        Self {
            api,
            notifier,
            bus: RefreshBus::default(),
            in_flight: InFlightOrders::new(),
            metrics,
        }
    }

    /// Authoritative copy after a mutation, falling back to the mutation's
    /// own response when the refetch fails
    pub(crate) async fn refetch(&self, id: OrderId, returned: Order) -> Order {
        match self.api.get_order(id).await {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(order_id = %id, error = %e, "Refetch after mutation failed, using response body");
                returned
            }
        }
    }
}
