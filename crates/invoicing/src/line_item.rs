//! Billable lines owned by an invoice.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use billbook_core::{DomainError, DomainResult, Entity, LineItemId, Money, ValueObject};

/// Longest accepted line description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Thousandths per unit of quantity.
const MILLI: i64 = 1_000;

/// A strictly positive quantity with three fractional digits (`1.5` = 1500 milli).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl ValueObject for Quantity {}

impl Quantity {
    pub fn from_milli(milli: i64) -> DomainResult<Self> {
        if milli <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(Self(milli))
    }

    pub fn whole(units: u32) -> DomainResult<Self> {
        Self::from_milli(i64::from(units) * MILLI)
    }

    /// Boundary conversion from a plain number; rounds to the nearest thousandth.
    pub fn from_f64(value: f64) -> DomainResult<Self> {
        if !value.is_finite() {
            return Err(DomainError::validation("quantity must be a finite number"));
        }
        let milli = (value * MILLI as f64).round();
        if milli.abs() >= 9_007_199_254_740_992.0 {
            return Err(DomainError::validation("quantity out of range"));
        }
        Self::from_milli(milli as i64)
    }

    pub fn milli(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / MILLI as f64
    }
}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_milli(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl FromStr for Quantity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || DomainError::validation(format!("invalid quantity '{s}'"));
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() || frac.len() > 3 {
            return Err(invalid());
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<3}").parse().map_err(|_| invalid())?
        };
        let milli = whole
            .checked_mul(MILLI)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(invalid)?;
        Self::from_milli(milli)
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let whole = self.0 / MILLI;
        let frac = self.0 % MILLI;
        if frac == 0 {
            write!(f, "{whole}")
        } else {
            write!(f, "{whole}.{}", format!("{frac:03}").trim_end_matches('0'))
        }
    }
}

/// A validated billable line.
///
/// `amount` is fixed when the line is built (`quantity × unit_price`, rounded
/// half up) and never recomputed; revising a line yields a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    id: LineItemId,
    description: String,
    quantity: Quantity,
    unit_price: Money,
    amount: Money,
}

impl Entity for LineItem {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl LineItem {
    pub fn create(
        id: LineItemId,
        description: &str,
        quantity: Quantity,
        unit_price: Money,
    ) -> DomainResult<Self> {
        let description = description.trim();
        if description.is_empty() {
            return Err(DomainError::validation("line item description must not be empty"));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(DomainError::validation(format!(
                "line item description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        if unit_price.is_negative() {
            return Err(DomainError::validation("line item unit_price must not be negative"));
        }

        let amount = unit_price.multiply_fraction(quantity.milli(), MILLI)?;

        Ok(Self {
            id,
            description: description.to_string(),
            quantity,
            unit_price,
            amount,
        })
    }

    /// Validate new values exactly like `create` and return a replacement line
    /// carrying the same id.
    pub fn revise(
        &self,
        description: &str,
        quantity: Quantity,
        unit_price: Money,
    ) -> DomainResult<Self> {
        Self::create(self.id, description, quantity, unit_price)
    }

    pub fn line_item_id(&self) -> LineItemId {
        self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn amount(&self) -> Money {
        self.amount
    }
}
