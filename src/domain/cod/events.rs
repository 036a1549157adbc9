use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// COD Verification Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CodEvent {
    Verified(CodDecision),
    Rejected(CodDecision),
    DeliveredPaid(CodPaid),
}

impl CodEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            CodEvent::Verified(_) => "CodVerified",
            CodEvent::Rejected(_) => "CodRejected",
            CodEvent::DeliveredPaid(_) => "CodDeliveredPaid",
        }
    }
}

/// A human decision on a pending COD order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodDecision {
    pub decided_by: String,
    pub decided_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Cash collected for a verified COD order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodPaid {
    pub confirmed_by: String,
    pub paid_at: DateTime<Utc>,
}
