//! Value object trait: equality by value, not identity.

/// Marker for immutable values compared by their attributes.
///
/// `Money`, `Rate` and `Currency` are value objects: two amounts of
/// 1000 minor units of `USD` are the same amount. To "change" a value object,
/// build a new one.
///
/// ```ignore
/// let a = Money::from_minor(1000, Currency::usd());
/// let b = Money::from_minor(1000, Currency::usd());
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
