// ============================================================================
// Backend Boundary
// ============================================================================
//
// `OrderApi` is the seam between the desk and the backend of record. The
// HTTP implementation talks to the REST API; the in-memory implementation
// applies the same domain rules locally and backs the demo and the tests.
//
// ============================================================================

pub mod dto;
pub mod error;
pub mod http;
pub mod memory;
pub mod query;

use async_trait::async_trait;

use crate::domain::order::{Order, OrderId, OrderStatus};

pub use dto::NewNote;
pub use error::ApiError;
pub use http::HttpOrderApi;
pub use memory::InMemoryOrderApi;
pub use query::{OrderFilters, OrderPage, OrderQuery, SortField, SortKey};

#[async_trait]
pub trait OrderApi: Send + Sync {
    /// `GET /orders/?...`
    async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, ApiError>;

    /// `GET /orders/{id}/`
    async fn get_order(&self, id: OrderId) -> Result<Order, ApiError>;

    /// `PATCH /orders/{id}/`
    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        admin_notes: Option<&str>,
    ) -> Result<Order, ApiError>;

    /// `POST /orders/{id}/confirm/`
    async fn confirm(&self, id: OrderId) -> Result<Order, ApiError>;

    /// `POST /orders/{id}/delivered/`
    async fn mark_delivered(&self, id: OrderId) -> Result<Order, ApiError>;

    /// `POST /orders/{id}/verify-cod/`
    async fn verify_cod(&self, id: OrderId, notes: Option<&str>) -> Result<Order, ApiError>;

    /// `POST /orders/{id}/reject-cod/`
    async fn reject_cod(&self, id: OrderId, notes: &str) -> Result<Order, ApiError>;

    /// `POST /orders/{id}/cod-paid/`
    async fn mark_cod_paid(&self, id: OrderId) -> Result<Order, ApiError>;

    /// `POST /orders/{id}/notes/`
    async fn add_note(&self, id: OrderId, note: &NewNote) -> Result<Order, ApiError>;
}
