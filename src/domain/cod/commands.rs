// ============================================================================
// COD Verification Commands
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CodCommand {
    Verify {
        actor: String,
        notes: Option<String>,
    },
    Reject {
        actor: String,
        notes: String,
    },
    MarkDeliveredPaid {
        actor: String,
    },
}

impl CodCommand {
    pub fn action_name(&self) -> &'static str {
        match self {
            CodCommand::Verify { .. } => "verify",
            CodCommand::Reject { .. } => "reject",
            CodCommand::MarkDeliveredPaid { .. } => "mark_paid",
        }
    }
}
