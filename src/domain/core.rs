// ============================================================================
// Aggregate Pattern - Local State Machines
// ============================================================================
//
// Commands are validated against the current state and turned into events;
// events are the only thing that mutates state. The backend of record runs
// the same rules, so the client can reject an illegal request before any
// network round trip.
//
// ============================================================================

/// Generic aggregate trait shared by the order and COD verification models
///
/// Type Parameters:
/// - `Event`: the fact recorded when a command is accepted
/// - `Command`: the requested change
/// - `Error`: the business rule violation returned on rejection
pub trait Aggregate: Sized + Send + Sync {
    type Event;
    type Command;
    type Error;

    /// Apply an accepted event to the current state
    fn apply_event(&mut self, event: &Self::Event);

    /// Validate a command and emit the events it produces (business logic)
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Validate and immediately apply a command, returning the applied events
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle_command(command)?;
        for event in &events {
            self.apply_event(event);
        }
        Ok(events)
    }
}
