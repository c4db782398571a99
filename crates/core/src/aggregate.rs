//! Aggregate root traits for domain models with guarded state transitions.

/// Aggregate root marker + minimal interface.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state
    /// (+1 per applied event).
    fn version(&self) -> u64;
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd, grant)` returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Every command must be accompanied by a `Grant`: a capability token computed
/// by the policy layer for this aggregate and actor. Aggregates reject commands
/// the grant does not cover, so a mutation cannot happen without the policy
/// having been consulted first.
///
/// Aggregates must not perform IO or side effects.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Grant: core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state, a command and the
    /// caller's grant. Must not mutate state.
    fn handle(
        &self,
        command: &Self::Command,
        grant: &Self::Grant,
    ) -> Result<Vec<Self::Event>, Self::Error>;

    /// Handle a command and apply the resulting events in order.
    fn execute(
        &mut self,
        command: &Self::Command,
        grant: &Self::Grant,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle(command, grant)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }
}
