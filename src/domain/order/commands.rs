use super::value_objects::{NoteType, OrderStatus};

// ============================================================================
// Order Commands - Represent admin intent
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum OrderCommand {
    RequestTransition {
        target: OrderStatus,
        actor: String,
        notes: Option<String>,
    },
    AddNote {
        note_type: NoteType,
        note: String,
        is_internal: bool,
        actor: String,
    },
}

impl OrderCommand {
    pub fn transition(target: OrderStatus, actor: impl Into<String>, notes: Option<String>) -> Self {
        OrderCommand::RequestTransition {
            target,
            actor: actor.into(),
            notes,
        }
    }

    // Quick actions are plain transitions with a fixed target.

    pub fn confirm(actor: impl Into<String>) -> Self {
        Self::transition(OrderStatus::Confirmed, actor, None)
    }

    pub fn mark_delivered(actor: impl Into<String>) -> Self {
        Self::transition(OrderStatus::Delivered, actor, None)
    }

    pub fn cancel(actor: impl Into<String>, notes: Option<String>) -> Self {
        Self::transition(OrderStatus::Cancelled, actor, notes)
    }
}
