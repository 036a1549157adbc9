use chrono::Utc;

use crate::domain::core::Aggregate;
use crate::domain::order::Order;
use super::commands::CodCommand;
use super::errors::CodError;
use super::events::{CodDecision, CodEvent, CodPaid};
use super::value_objects::{CodVerification, VerificationStatus};

// ============================================================================
// COD Verification Aggregate
// ============================================================================
//
// pending  -> verified | rejected
// verified -> delivered_paid
//
// ============================================================================

impl CodVerification {
    fn require_pending(&self) -> Result<(), CodError> {
        match self.verification_status {
            VerificationStatus::Pending => Ok(()),
            current => Err(CodError::AlreadyVerified { current }),
        }
    }
}

impl Aggregate for CodVerification {
    type Event = CodEvent;
    type Command = CodCommand;
    type Error = CodError;

    fn apply_event(&mut self, event: &Self::Event) {
        match event {
            CodEvent::Verified(decision) => {
                self.verification_status = VerificationStatus::Verified;
                self.verified_by = Some(decision.decided_by.clone());
                self.verification_date = Some(decision.decided_at);
                self.verification_notes = decision.notes.clone();
            }
            CodEvent::Rejected(decision) => {
                self.verification_status = VerificationStatus::Rejected;
                self.verified_by = Some(decision.decided_by.clone());
                self.verification_date = Some(decision.decided_at);
                self.verification_notes = decision.notes.clone();
            }
            CodEvent::DeliveredPaid(paid) => {
                self.verification_status = VerificationStatus::DeliveredPaid;
                self.paid_by = Some(paid.confirmed_by.clone());
                self.paid_at = Some(paid.paid_at);
            }
        }
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CodCommand::Verify { actor, notes } => {
                self.require_pending()?;

                Ok(vec![CodEvent::Verified(CodDecision {
                    decided_by: actor.clone(),
                    decided_at: Utc::now(),
                    notes: notes
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string),
                })])
            }

            CodCommand::Reject { actor, notes } => {
                self.require_pending()?;

                let notes = notes.trim();
                if notes.is_empty() {
                    return Err(CodError::EmptyRejectionNotes);
                }

                Ok(vec![CodEvent::Rejected(CodDecision {
                    decided_by: actor.clone(),
                    decided_at: Utc::now(),
                    notes: Some(notes.to_string()),
                })])
            }

            CodCommand::MarkDeliveredPaid { actor } => {
                if self.verification_status != VerificationStatus::Verified {
                    return Err(CodError::InvalidTransition {
                        from: self.verification_status,
                        to: VerificationStatus::DeliveredPaid,
                    });
                }

                Ok(vec![CodEvent::DeliveredPaid(CodPaid {
                    confirmed_by: actor.clone(),
                    paid_at: Utc::now(),
                })])
            }
        }
    }
}

// ============================================================================
// Order-level entry points
// ============================================================================

impl Order {
    /// Validate a COD command against this order's verification record
    pub fn handle_cod_command(&self, command: &CodCommand) -> Result<Vec<CodEvent>, CodError> {
        if !self.is_cash_on_delivery() {
            return Err(CodError::NotCodOrder {
                order_id: self.id,
                payment_method: self.payment_method,
            });
        }

        match &self.cod_verification {
            Some(verification) => verification.handle_command(command),
            None => CodVerification::pending().handle_command(command),
        }
    }

    /// Validate and apply a COD command; the order status is left untouched
    pub fn execute_cod_command(&mut self, command: &CodCommand) -> Result<Vec<CodEvent>, CodError> {
        let events = self.handle_cod_command(command)?;
        let verification = self
            .cod_verification
            .get_or_insert_with(CodVerification::pending);
        for event in &events {
            verification.apply_event(event);
        }
        Ok(events)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
