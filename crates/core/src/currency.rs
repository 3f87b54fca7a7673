//! Currency codes and their minor-unit exponents.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// Three-letter uppercase currency code (ISO-4217 style).
///
/// Stored inline so `Currency` (and therefore `Money`) stays `Copy`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl ValueObject for Currency {}

impl Currency {
    pub fn new(code: &str) -> Result<Self, DomainError> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(DomainError::validation(format!(
                "currency code must be three uppercase letters, got '{code}'"
            )));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    pub const fn usd() -> Self {
        Self(*b"USD")
    }

    pub const fn eur() -> Self {
        Self(*b"EUR")
    }

    pub const fn gbp() -> Self {
        Self(*b"GBP")
    }

    pub const fn jpy() -> Self {
        Self(*b"JPY")
    }

    pub fn code(&self) -> &str {
        // Constructed only from validated ASCII.
        core::str::from_utf8(&self.0).unwrap_or("XXX")
    }

    /// Number of decimal digits in the minor unit (cents = 2).
    pub fn exponent(&self) -> u32 {
        match &self.0 {
            b"JPY" | b"KRW" | b"VND" | b"CLP" | b"ISK" => 0,
            b"KWD" | b"BHD" | b"OMR" | b"JOD" | b"TND" => 3,
            _ => 2,
        }
    }

    /// Minor units per major unit (100 for cents).
    pub fn minor_per_major(&self) -> i64 {
        10i64.pow(self.exponent())
    }

    /// Display symbol; codes without a well-known symbol render as the code.
    pub fn symbol(&self) -> &str {
        match &self.0 {
            b"USD" => "$",
            b"EUR" => "€",
            b"GBP" => "£",
            b"JPY" => "¥",
            b"CAD" => "CA$",
            b"AUD" => "A$",
            _ => self.code(),
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.trim())
    }
}

impl TryFrom<String> for Currency {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_codes() {
        assert!(Currency::new("usd").is_err());
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("USDX").is_err());
        assert!(Currency::new("U$D").is_err());
    }

    #[test]
    fn exponents() {
        assert_eq!(Currency::usd().exponent(), 2);
        assert_eq!(Currency::jpy().exponent(), 0);
        assert_eq!(Currency::new("KWD").unwrap().exponent(), 3);
        assert_eq!(Currency::new("SEK").unwrap().exponent(), 2);
    }

    #[test]
    fn serializes_as_plain_code() {
        let json = serde_json::to_string(&Currency::eur()).unwrap();
        assert_eq!(json, "\"EUR\"");
        let back: Currency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Currency::eur());
        assert!(serde_json::from_str::<Currency>("\"eur\"").is_err());
    }
}
