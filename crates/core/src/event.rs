//! Domain events emitted by aggregates.

use chrono::{DateTime, Utc};

/// A fact produced by handling a command.
///
/// Events are applied in order and never rewritten; a sales order keeps the
/// ones that matter as its status history and reopen log.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable name, e.g. `sales.order.status_changed`.
    fn event_type(&self) -> &'static str;

    /// Business time of the fact.
    fn occurred_at(&self) -> DateTime<Utc>;
}
