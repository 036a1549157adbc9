// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Local models of the backend's order rules. Each aggregate has its own
// subdirectory with value objects, events, commands, errors and the
// aggregate implementation. Nothing here performs I/O.
//
// ============================================================================

pub mod core;
pub mod order;
pub mod cod;
pub mod phone;
