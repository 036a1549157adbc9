use std::sync::Arc;

use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::api::{OrderApi, OrderPage, OrderQuery};
use super::error::WorkflowError;
use super::signals::{RefreshBus, RefreshSignal};

/// Filtered, paginated order table backed by the API
///
/// The cached page goes stale when the query changes or when any refresh
/// signal arrives on the bus.
pub struct OrderQueryView {
    api: Arc<dyn OrderApi>,
    query: OrderQuery,
    page: Option<OrderPage>,
    stale: bool,
    signals: broadcast::Receiver<RefreshSignal>,
}

impl OrderQueryView {
    pub fn new(api: Arc<dyn OrderApi>, bus: &RefreshBus, query: OrderQuery) -> Self {
        Self {
            api,
            query,
            page: None,
            stale: true,
            signals: bus.subscribe(),
        }
    }

    pub fn query(&self) -> &OrderQuery {
        &self.query
    }

    /// Edit the query; the cached page is only invalidated on a real change
    pub fn update_query(&mut self, edit: impl FnOnce(&mut OrderQuery)) {
        let before = self.query.clone();
        edit(&mut self.query);
        if self.query != before {
            self.stale = true;
        }
    }

    pub fn current_page(&self) -> Option<&OrderPage> {
        self.page.as_ref()
    }

    pub fn is_stale(&mut self) -> bool {
        self.drain_signals();
        self.stale
    }

    pub fn apply_signal(&mut self, signal: &RefreshSignal) {
        tracing::trace!(signal = ?signal, "Order table invalidated");
        self.stale = true;
    }

    fn drain_signals(&mut self) {
        loop {
            match self.signals.try_recv() {
                Ok(signal) => self.apply_signal(&signal),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped = skipped, "Refresh signals lagged");
                    self.stale = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    /// Fetch the current page unconditionally
    pub async fn fetch(&mut self) -> Result<&OrderPage, WorkflowError> {
        self.query.validate().map_err(WorkflowError::InvalidQuery)?;

        // signals published while the request is in flight stay queued
        self.drain_signals();
        let page = self.api.list_orders(&self.query).await?;
        if page.quarantined > 0 {
            tracing::warn!(quarantined = page.quarantined, page = page.page, "Order page had malformed records");
        }
        tracing::debug!(count = page.count, page = page.page, rows = page.orders.len(), "Order page loaded");

        self.stale = false;
        Ok(self.page.insert(page))
    }

    /// Refetch only when stale; returns whether a fetch happened
    pub async fn refresh_if_stale(&mut self) -> Result<bool, WorkflowError> {
        if self.is_stale() || self.page.is_none() {
            self.fetch().await?;
            return Ok(true);
        }
        Ok(false)
    }
}
