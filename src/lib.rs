//! Administrative core of the order dashboard: status transitions, COD
//! verification, bulk actions and the order table, on top of the REST
//! backend that owns the records.

pub mod api;
pub mod config;
pub mod desk;
pub mod domain;
pub mod metrics;
pub mod utils;
pub mod workflow;

pub use desk::OrderDesk;
