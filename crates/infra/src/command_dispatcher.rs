//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the aggregate's stream
//!   ↓
//! 2. Rehydrate (apply history in sequence order)
//!   ↓
//! 3. Handle (pure decision, produces events)
//!   ↓
//! 4. Append with `ExpectedVersion::Exact(loaded_version)`
//!   ↓
//! 5. Apply the committed events and return the new snapshot
//! ```
//!
//! A concurrent writer that got there first makes step 4 fail with a
//! conflict. The dispatcher never retries; callers reload and decide.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use billbook_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ErrorKind, ExpectedVersion};
use billbook_events::{Event, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The command was rejected by the aggregate, or lost a concurrency race.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The stored stream is unusable (gaps, foreign events, undecodable payloads).
    #[error("corrupted stream: {0}")]
    Corrupted(String),

    /// Persisting to the event store failed.
    #[error("event store failure: {0}")]
    Store(EventStoreError),
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Domain(DomainError::conflict(msg)),
            EventStoreError::Decode(msg) => DispatchError::Corrupted(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl DispatchError {
    /// The domain error behind this failure, if any.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            DispatchError::Domain(err) => Some(err),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.domain().map(DomainError::kind)
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            DispatchError::Domain(err) => err.kind().as_str(),
            DispatchError::Corrupted(_) => "corrupted_stream",
            DispatchError::Store(_) => "store",
        }
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone)]
pub struct Dispatched<A: Aggregate> {
    /// Snapshot after the committed events were applied.
    pub aggregate: A,
    /// Committed events, in stream order. Empty when the command was a no-op.
    pub events: Vec<EventEnvelope<A::Event>>,
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Generic over the store so tests run on `InMemoryEventStore` and other
/// backends can be swapped in without touching domain code.
#[derive(Debug)]
pub struct CommandDispatcher<S> {
    store: S,
}

impl<S> CommandDispatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> CommandDispatcher<S>
where
    S: EventStore,
{
    /// Rebuild the current snapshot of an aggregate from its stream.
    ///
    /// A stream that was never written yields `make_aggregate(id)` untouched.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;

        let mut aggregate = make_aggregate(aggregate_id);
        for stored in &history {
            let envelope = stored.to_envelope::<A::Event>()?;
            aggregate.apply(envelope.payload());
        }

        debug!(
            aggregate_id = %aggregate_id,
            events = history.len(),
            version = aggregate.version(),
            "aggregate rehydrated"
        );
        Ok(aggregate)
    }

    /// Dispatch a command through the full pipeline.
    ///
    /// Returns the new snapshot and the committed events. A command that
    /// decides nothing returns the loaded snapshot and no events, and nothing
    /// is appended.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Dispatched<A>, DispatchError>
    where
        A: Aggregate,
        A::Event: Event + Serialize + DeserializeOwned,
    {
        let current = self.load(aggregate_id, make_aggregate)?;
        let expected = ExpectedVersion::Exact(current.version());

        let decided = current.handle(&command)?;
        if decided.is_empty() {
            return Ok(Dispatched {
                aggregate: current,
                events: vec![],
            });
        }

        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;

        let mut aggregate = current;
        let mut events = Vec::with_capacity(committed.len());
        for (stored, event) in committed.iter().zip(decided) {
            aggregate.apply(&event);
            events.push(EventEnvelope::wrap(
                stored.event_id,
                stored.aggregate_id,
                stored.aggregate_type.clone(),
                stored.sequence_number,
                event,
            ));
        }

        Ok(Dispatched { aggregate, events })
    }
}

fn validate_loaded_stream(aggregate_id: AggregateId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Corrupted(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number != last + 1 {
            return Err(DispatchError::Corrupted(format!(
                "non-contiguous sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}
