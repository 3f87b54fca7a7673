//! Display locales for money and dates.

use serde::{Deserialize, Serialize};

/// Supported display locales. Unknown tags fall back to [`Locale::EnUs`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Locale {
    #[default]
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "en-GB")]
    EnGb,
    #[serde(rename = "de-DE")]
    DeDe,
    #[serde(rename = "fr-FR")]
    FrFr,
    #[serde(rename = "ja-JP")]
    JaJp,
}

impl Locale {
    /// Accepts BCP-47 style tags with either `-` or `_` (`de_DE`, `de-de`).
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().replace('_', "-").to_ascii_lowercase();
        match normalized.as_str() {
            "en-gb" => Locale::EnGb,
            "de-de" | "de" => Locale::DeDe,
            "fr-fr" | "fr" => Locale::FrFr,
            "ja-jp" | "ja" => Locale::JaJp,
            _ => Locale::EnUs,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Locale::EnUs => "en-US",
            Locale::EnGb => "en-GB",
            Locale::DeDe => "de-DE",
            Locale::FrFr => "fr-FR",
            Locale::JaJp => "ja-JP",
        }
    }

    pub fn grouping_separator(&self) -> &'static str {
        match self {
            Locale::EnUs | Locale::EnGb | Locale::JaJp => ",",
            Locale::DeDe => ".",
            Locale::FrFr => "\u{202f}",
        }
    }

    pub fn decimal_separator(&self) -> &'static str {
        match self {
            Locale::EnUs | Locale::EnGb | Locale::JaJp => ".",
            Locale::DeDe | Locale::FrFr => ",",
        }
    }

    /// Whether the currency symbol follows the number (`12,00 €`).
    pub fn symbol_after_amount(&self) -> bool {
        matches!(self, Locale::DeDe | Locale::FrFr)
    }

    /// `chrono` strftime pattern for calendar dates.
    pub fn date_pattern(&self) -> &'static str {
        match self {
            Locale::EnUs => "%m/%d/%Y",
            Locale::EnGb | Locale::FrFr => "%d/%m/%Y",
            Locale::DeDe => "%d.%m.%Y",
            Locale::JaJp => "%Y/%m/%d",
        }
    }
}

impl From<String> for Locale {
    fn from(tag: String) -> Self {
        Locale::from_tag(&tag)
    }
}

impl core::fmt::Display for Locale {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.tag())
    }
}
