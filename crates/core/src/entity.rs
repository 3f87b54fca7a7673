//! Entity trait: identity that survives state changes.

/// An object identified by id rather than by its attribute values.
///
/// Line items and payments are entities owned by an invoice: replacing a line
/// item keeps its id even though every other field may change.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
