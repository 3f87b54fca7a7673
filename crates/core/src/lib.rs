//! Domain building blocks shared by every billbook crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the error taxonomy, aggregate traits and exact money.

pub mod aggregate;
pub mod clock;
pub mod currency;
pub mod entity;
pub mod error;
pub mod id;
pub mod locale;
pub mod money;
pub mod rate;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use clock::{Clock, FixedClock, SystemClock};
pub use currency::Currency;
pub use entity::Entity;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{AggregateId, CustomerId, LineItemId, PaymentId};
pub use locale::Locale;
pub use money::Money;
pub use rate::Rate;
pub use value_object::ValueObject;
