use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// COD Verification Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    DeliveredPaid,
    Rejected,
}

impl VerificationStatus {
    /// Terminal for verification only; the order status is independent
    pub fn is_terminal(&self) -> bool {
        matches!(self, VerificationStatus::DeliveredPaid | VerificationStatus::Rejected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
            VerificationStatus::DeliveredPaid => "delivered_paid",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verification record owned by a cash-on-delivery order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodVerification {
    pub verification_status: VerificationStatus,
    pub verified_by: Option<String>,
    pub verification_date: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    /// Who collected the cash, once delivered and paid
    #[serde(default)]
    pub paid_by: Option<String>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

impl CodVerification {
    pub fn pending() -> Self {
        Self {
            verification_status: VerificationStatus::Pending,
            verified_by: None,
            verification_date: None,
            verification_notes: None,
            paid_by: None,
            paid_at: None,
        }
    }
}
