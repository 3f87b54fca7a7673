//! Exact monetary amounts.
//!
//! All arithmetic runs on integer minor units (cents for `USD`). Floating point
//! appears only in [`Money::from_major`] / [`Money::to_major`], which exist for
//! the serialization boundary and round to the nearest minor unit.

use core::cmp::Ordering;
use serde::{Deserialize, Serialize};

use crate::currency::Currency;
use crate::error::{DomainError, DomainResult};
use crate::locale::Locale;
use crate::rate::{PPM, Rate};
use crate::value_object::ValueObject;

/// An amount of money in a single currency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor_units: i64,
    currency: Currency,
}

impl ValueObject for Money {}

impl Money {
    pub const fn from_minor(minor_units: i64, currency: Currency) -> Self {
        Self {
            minor_units,
            currency,
        }
    }

    pub const fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    /// Boundary conversion from a plain major-unit number (`12.34` dollars).
    pub fn from_major(amount: f64, currency: Currency) -> DomainResult<Self> {
        if !amount.is_finite() {
            return Err(DomainError::validation(format!(
                "amount must be a finite number, got {amount}"
            )));
        }
        let minor = (amount * currency.minor_per_major() as f64).round();
        if minor.abs() >= 9_007_199_254_740_992.0 {
            return Err(DomainError::validation("amount out of range"));
        }
        Ok(Self::from_minor(minor as i64, currency))
    }

    pub const fn minor_units(&self) -> i64 {
        self.minor_units
    }

    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Boundary conversion to a plain major-unit number.
    pub fn to_major(&self) -> f64 {
        self.minor_units as f64 / self.currency.minor_per_major() as f64
    }

    pub fn is_zero(&self) -> bool {
        self.minor_units == 0
    }

    pub fn is_negative(&self) -> bool {
        self.minor_units < 0
    }

    pub fn is_positive(&self) -> bool {
        self.minor_units > 0
    }

    fn ensure_same_currency(&self, other: &Money) -> DomainResult<()> {
        if self.currency != other.currency {
            return Err(DomainError::currency_mismatch(
                self.currency.code(),
                other.currency.code(),
            ));
        }
        Ok(())
    }

    pub fn add(&self, other: &Money) -> DomainResult<Money> {
        self.ensure_same_currency(other)?;
        let minor = self
            .minor_units
            .checked_add(other.minor_units)
            .ok_or_else(|| DomainError::invariant("money addition overflow"))?;
        Ok(Self::from_minor(minor, self.currency))
    }

    pub fn subtract(&self, other: &Money) -> DomainResult<Money> {
        self.ensure_same_currency(other)?;
        let minor = self
            .minor_units
            .checked_sub(other.minor_units)
            .ok_or_else(|| DomainError::invariant("money subtraction overflow"))?;
        Ok(Self::from_minor(minor, self.currency))
    }

    /// Multiply by `numerator / denominator`, rounding half up to a whole minor unit.
    pub fn multiply_fraction(&self, numerator: i64, denominator: i64) -> DomainResult<Money> {
        if denominator <= 0 {
            return Err(DomainError::invariant("fraction denominator must be positive"));
        }
        let product = i128::from(self.minor_units) * i128::from(numerator);
        let rounded = round_half_up_div(product, i128::from(denominator));
        let minor = i64::try_from(rounded)
            .map_err(|_| DomainError::invariant("money multiplication overflow"))?;
        Ok(Self::from_minor(minor, self.currency))
    }

    /// `self × rate`, rounded half up to the nearest minor unit.
    pub fn multiply_by_rate(&self, rate: Rate) -> DomainResult<Money> {
        self.multiply_fraction(i64::from(rate.ppm()), i64::from(PPM))
    }

    /// Sum a sequence of amounts; an empty sequence is zero in `currency`.
    pub fn sum<I>(currency: Currency, amounts: I) -> DomainResult<Money>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.add(&m))
    }

    pub fn compare(&self, other: &Money) -> DomainResult<Ordering> {
        self.ensure_same_currency(other)?;
        Ok(self.minor_units.cmp(&other.minor_units))
    }

    /// Locale-aware display string, e.g. `$1,234.56` or `1.234,56 €`.
    pub fn format(&self, locale: Locale) -> String {
        let exponent = self.currency.exponent();
        let scale = self.currency.minor_per_major().unsigned_abs();
        let abs = self.minor_units.unsigned_abs();
        let whole = group_digits(abs / scale, locale.grouping_separator());

        let mut number = whole;
        if exponent > 0 {
            number.push_str(locale.decimal_separator());
            number.push_str(&format!("{:0width$}", abs % scale, width = exponent as usize));
        }

        let sign = if self.is_negative() { "-" } else { "" };
        let symbol = self.currency.symbol();
        if locale.symbol_after_amount() {
            format!("{sign}{number}\u{a0}{symbol}")
        } else {
            format!("{sign}{symbol}{number}")
        }
    }
}

impl PartialOrd for Money {
    /// Amounts in different currencies are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.currency != other.currency {
            return None;
        }
        Some(self.minor_units.cmp(&other.minor_units))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.format(Locale::EnUs))
    }
}

/// `n / d` rounded half up (toward positive infinity on ties); `d` must be positive.
fn round_half_up_div(n: i128, d: i128) -> i128 {
    (2 * n + d).div_euclid(2 * d)
}

fn group_digits(value: u64, separator: &str) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * separator.len());
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}
