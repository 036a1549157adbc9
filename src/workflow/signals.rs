use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::order::OrderId;

// ============================================================================
// Refresh Signals
// ============================================================================
//
// Every successful mutation publishes on the bus; views holding a receiver
// mark themselves stale and refetch on their next refresh.
//
// ============================================================================

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshSignal {
    OrderChanged(OrderId),
    ListInvalidated,
    BulkCompleted {
        operation_id: Uuid,
        success_count: usize,
        error_count: usize,
    },
}

#[derive(Debug, Clone)]
pub struct RefreshBus {
    sender: broadcast::Sender<RefreshSignal>,
}

impl Default for RefreshBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RefreshBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshSignal> {
        self.sender.subscribe()
    }

    /// Returns the number of receivers reached; publishing with none is fine
    pub fn publish(&self, signal: RefreshSignal) -> usize {
        tracing::trace!(signal = ?signal, "Publishing refresh signal");
        self.sender.send(signal).unwrap_or(0)
    }
}
