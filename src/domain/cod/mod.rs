// ============================================================================
// COD Domain - Cash-on-delivery verification sub-state
// ============================================================================
//
// Verification is orthogonal to the order's fulfillment status: nothing in
// here reads or writes `Order::status`.
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;

pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
