// ============================================================================
// Order Domain - Fulfillment status state machine
// ============================================================================
//
// - Value objects (OrderStatus, PaymentMethod, OrderItem, StatusChange, ...)
// - Events (StatusChanged, NoteAdded)
// - Commands (RequestTransition and its quick-action constructors, AddNote)
// - Errors (OrderError)
// - Aggregate (Order with the transition rules)
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
pub use aggregate::*;
