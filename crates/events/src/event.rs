use chrono::{DateTime, Utc};

/// A domain event: an immutable fact about something that already happened.
///
/// Events are versioned for schema evolution and are only ever appended.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "invoicing.invoice.sent").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// Business time at which the fact occurred.
    fn occurred_at(&self) -> DateTime<Utc>;
}
