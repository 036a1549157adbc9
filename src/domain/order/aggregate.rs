use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cod::{CodVerification, VerificationStatus};
use crate::domain::core::Aggregate;
use super::commands::OrderCommand;
use super::errors::OrderError;
use super::events::OrderEvent;
use super::value_objects::{OrderId, OrderItem, OrderNote, OrderStatus, PaymentMethod, StatusChange};

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    // Identity
    pub id: OrderId,
    pub order_number: String,

    // Current State
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub cod_verification: Option<CodVerification>,

    // Customer
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub delivery_address: Option<String>,

    // Money
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub tax_amount: Decimal,
    pub flash_sale_savings: Decimal,
    pub total_amount: Decimal,

    pub items: Vec<OrderItem>,

    // Audit Trail (append-only)
    pub notes: Vec<OrderNote>,
    pub status_history: Vec<StatusChange>,

    // Lifecycle timestamps, each stamped once
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// A freshly placed order, as checkout would create it
    pub fn new(
        id: OrderId,
        order_number: impl Into<String>,
        customer_name: impl Into<String>,
        payment_method: PaymentMethod,
        items: Vec<OrderItem>,
        delivery_fee: Decimal,
    ) -> Self {
        let subtotal: Decimal = items.iter().map(OrderItem::line_total).sum();
        Self {
            id,
            order_number: order_number.into(),
            status: OrderStatus::Pending,
            payment_method,
            cod_verification: payment_method
                .is_cash_on_delivery()
                .then(CodVerification::pending),
            customer_name: customer_name.into(),
            customer_phone: None,
            delivery_address: None,
            subtotal,
            delivery_fee,
            tax_amount: Decimal::ZERO,
            flash_sale_savings: Decimal::ZERO,
            total_amount: subtotal + delivery_fee,
            items,
            notes: Vec::new(),
            status_history: Vec::new(),
            created_at: Utc::now(),
            confirmed_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    pub fn is_cash_on_delivery(&self) -> bool {
        self.payment_method.is_cash_on_delivery()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the customer-facing cancel action is offered
    pub fn can_be_cancelled(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing
        )
    }

    pub fn cod_status(&self) -> Option<VerificationStatus> {
        self.cod_verification.as_ref().map(|v| v.verification_status)
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Check a transition without producing any event
    pub fn check_transition(&self, target: OrderStatus) -> Result<(), OrderError> {
        if self.status.can_transition_to(target) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            })
        }
    }

    fn stamp(slot: &mut Option<DateTime<Utc>>, at: DateTime<Utc>) {
        if slot.is_none() {
            *slot = Some(at);
        }
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl Aggregate for Order {
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn apply_event(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::StatusChanged(change) => {
                self.status = change.new_status;
                match change.new_status {
                    OrderStatus::Confirmed => Self::stamp(&mut self.confirmed_at, change.created_at),
                    OrderStatus::Delivered => Self::stamp(&mut self.delivered_at, change.created_at),
                    OrderStatus::Cancelled => Self::stamp(&mut self.cancelled_at, change.created_at),
                    _ => {}
                }
                self.status_history.push(change.clone());
            }
            OrderEvent::NoteAdded(note) => {
                self.notes.push(note.clone());
            }
        }
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::RequestTransition { target, actor, notes } => {
                self.check_transition(*target)?;

                Ok(vec![OrderEvent::StatusChanged(StatusChange {
                    previous_status: self.status,
                    new_status: *target,
                    changed_by: actor.clone(),
                    notes: notes
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string),
                    created_at: Utc::now(),
                })])
            }

            OrderCommand::AddNote { note_type, note, is_internal, actor } => {
                let note = note.trim();
                if note.is_empty() {
                    return Err(OrderError::EmptyNote);
                }

                Ok(vec![OrderEvent::NoteAdded(OrderNote {
                    note_type: *note_type,
                    note: note.to_string(),
                    is_internal: *is_internal,
                    created_by: actor.clone(),
                    created_at: Utc::now(),
                })])
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
