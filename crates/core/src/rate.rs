//! Non-negative rates (tax rates, fractions) in exact integer form.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// Parts-per-million denominator.
pub const PPM: u32 = 1_000_000;

/// A non-negative rate stored as integer parts-per-million (`0.10` = 100_000).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(u32);

impl ValueObject for Rate {}

impl Rate {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn one() -> Self {
        Self(PPM)
    }

    pub const fn from_ppm(ppm: u32) -> Self {
        Self(ppm)
    }

    /// 1 basis point = 0.01% = 100 ppm.
    pub fn from_basis_points(bps: u32) -> Result<Self, DomainError> {
        bps.checked_mul(100)
            .map(Self)
            .ok_or_else(|| DomainError::validation("rate out of range"))
    }

    /// Boundary conversion from a plain number; rounds to the nearest ppm.
    pub fn from_f64(value: f64) -> Result<Self, DomainError> {
        if !value.is_finite() || value < 0.0 {
            return Err(DomainError::validation(format!(
                "rate must be a non-negative number, got {value}"
            )));
        }
        let ppm = (value * f64::from(PPM)).round();
        if ppm > f64::from(u32::MAX) {
            return Err(DomainError::validation("rate out of range"));
        }
        Ok(Self(ppm as u32))
    }

    pub const fn ppm(&self) -> u32 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / f64::from(PPM)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// True for rates in `[0, 1]`.
    pub fn is_fraction(&self) -> bool {
        self.0 <= PPM
    }
}

impl FromStr for Rate {
    type Err = DomainError;

    /// Parses a plain decimal such as `"0.0875"` (at most six fractional digits).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || DomainError::validation(format!("invalid rate '{s}'"));

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > 6 || !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac_ppm: u64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<6}");
            padded.parse().map_err(|_| invalid())?
        };

        let ppm = whole
            .checked_mul(u64::from(PPM))
            .and_then(|w| w.checked_add(frac_ppm))
            .filter(|v| *v <= u64::from(u32::MAX))
            .ok_or_else(|| DomainError::validation("rate out of range"))?;
        Ok(Self(ppm as u32))
    }
}

impl core::fmt::Display for Rate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let whole = self.0 / PPM;
        let frac = self.0 % PPM;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:06}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("0.10".parse::<Rate>().unwrap().ppm(), 100_000);
        assert_eq!("0.08875".parse::<Rate>().unwrap().ppm(), 88_750);
        assert_eq!("1".parse::<Rate>().unwrap(), Rate::one());
        assert_eq!(".5".parse::<Rate>().unwrap().ppm(), 500_000);
    }

    #[test]
    fn rejects_bad_strings() {
        for bad in ["", ".", "-0.1", "0.1234567", "abc", "1.2.3"] {
            assert!(bad.parse::<Rate>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Rate::from_ppm(100_000).to_string(), "0.1");
        assert_eq!(Rate::from_ppm(88_750).to_string(), "0.08875");
        assert_eq!(Rate::one().to_string(), "1");
    }

    #[test]
    fn f64_boundary_rounds_to_ppm() {
        assert_eq!(Rate::from_f64(0.1).unwrap().ppm(), 100_000);
        assert_eq!(Rate::from_f64(Rate::from_ppm(88_750).as_f64()).unwrap().ppm(), 88_750);
        assert!(Rate::from_f64(-0.01).is_err());
        assert!(Rate::from_f64(f64::NAN).is_err());
    }

    #[test]
    fn fraction_bounds() {
        assert!(Rate::one().is_fraction());
        assert!(!Rate::from_ppm(PPM + 1).is_fraction());
        assert_eq!(Rate::from_basis_points(1000).unwrap().ppm(), 100_000);
    }
}
