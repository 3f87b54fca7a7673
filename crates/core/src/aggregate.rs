//! Aggregate traits: identity, versioning and the decide/evolve split.

use crate::error::{DomainError, DomainResult};

/// An aggregate root: the consistency boundary that commands are issued against.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;

    /// Number of events applied to this snapshot so far.
    ///
    /// Persisting a change requires the stored stream to still be at this
    /// version; see [`ExpectedVersion`].
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for a write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// The stream must not exist yet (version 0).
    NoStream,
    /// Require the stream to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::NoStream => actual == 0,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "stale snapshot (expected: {self:?}, actual: {actual})"
            )))
        }
    }
}

/// Pure, deterministic command execution.
///
/// - `handle(&self, cmd)` validates a command against the current snapshot and
///   returns the events it implies. It never mutates.
/// - `apply(&mut self, event)` evolves state and bumps `version()` by one.
///
/// Aggregates perform no IO: the clock and id generation live with the caller,
/// which stamps them into commands.
pub trait Aggregate: AggregateRoot + Clone {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> DomainResult<Vec<Self::Event>>;

    /// Run `handle` and fold the resulting events into a copy of `self`.
    ///
    /// On error the receiver is untouched, so a rejected command never leaves a
    /// half-applied snapshot behind.
    fn execute(&self, command: &Self::Command) -> DomainResult<(Self, Vec<Self::Event>)> {
        let events = self.handle(command)?;
        let mut next = self.clone();
        for event in &events {
            next.apply(event);
        }
        Ok((next, events))
    }

    /// Fold a history of events into `self` in order.
    fn replay<'a, I>(&mut self, history: I)
    where
        I: IntoIterator<Item = &'a Self::Event>,
        Self::Event: 'a,
    {
        for event in history {
            self.apply(event);
        }
    }
}
