use serde::{Deserialize, Serialize};

use super::value_objects::{OrderNote, StatusChange};

// ============================================================================
// Order Events - Facts recorded against an order
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    StatusChanged(StatusChange),
    NoteAdded(OrderNote),
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::StatusChanged(_) => "OrderStatusChanged",
            OrderEvent::NoteAdded(_) => "OrderNoteAdded",
        }
    }
}
