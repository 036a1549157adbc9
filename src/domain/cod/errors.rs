use crate::domain::order::{OrderId, PaymentMethod};
use super::value_objects::VerificationStatus;

// ============================================================================
// COD Verification Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodError {
    #[error("Order {order_id} is paid with {payment_method}, not cash on delivery")]
    NotCodOrder {
        order_id: OrderId,
        payment_method: PaymentMethod,
    },

    #[error("COD verification already resolved as {current}")]
    AlreadyVerified { current: VerificationStatus },

    #[error("Rejecting a COD order requires notes")]
    EmptyRejectionNotes,

    #[error("Cannot move COD verification from {from} to {to}")]
    InvalidTransition {
        from: VerificationStatus,
        to: VerificationStatus,
    },
}
