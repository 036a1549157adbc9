use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::order::OrderId;
use super::error::WorkflowError;

/// Orders with a mutation outstanding from this desk
#[derive(Debug, Clone, Default)]
pub struct InFlightOrders {
    busy: Arc<Mutex<HashSet<OrderId>>>,
}

/// Releases the order when dropped
#[derive(Debug)]
pub struct InFlightGuard {
    id: OrderId,
    busy: Arc<Mutex<HashSet<OrderId>>>,
}

impl InFlightOrders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, id: OrderId) -> Result<InFlightGuard, WorkflowError> {
        if !lock(&self.busy).insert(id) {
            tracing::debug!(order_id = %id, "Rejected mutation, order busy");
            return Err(WorkflowError::Busy(id));
        }
        Ok(InFlightGuard {
            id,
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self, id: OrderId) -> bool {
        lock(&self.busy).contains(&id)
    }

    pub fn len(&self) -> usize {
        lock(&self.busy).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InFlightGuard {
    pub fn order_id(&self) -> OrderId {
        self.id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.busy).remove(&self.id);
    }
}

fn lock(busy: &Mutex<HashSet<OrderId>>) -> MutexGuard<'_, HashSet<OrderId>> {
    busy.lock().unwrap_or_else(PoisonError::into_inner)
}
