//! Application settings.
//!
//! Sources, later ones winning: built-in defaults, an optional `billbook`
//! config file (`billbook.toml`, `.yaml`, ...) in the working directory, then
//! `BILLBOOK_*` environment variables (`__` separates nested keys). A `.env`
//! file is loaded into the environment first when present.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use billbook_core::{Currency, Locale};
use billbook_observability::LogFormat;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Currency for invoices created without an explicit one.
    #[serde(default = "default_currency")]
    pub default_currency: Currency,

    #[serde(default = "default_invoice_number_prefix")]
    pub invoice_number_prefix: String,

    /// Days between issue and due date when the caller gives no due date.
    #[serde(default = "default_payment_terms_days")]
    pub default_payment_terms_days: u32,

    /// Locale for summaries requested without one. Unknown tags read as en-US.
    #[serde(default)]
    pub default_locale: Locale,

    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_currency() -> Currency {
    Currency::usd()
}

fn default_invoice_number_prefix() -> String {
    "INV".to_string()
}

fn default_payment_terms_days() -> u32 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_currency: default_currency(),
            invoice_number_prefix: default_invoice_number_prefix(),
            default_payment_terms_days: default_payment_terms_days(),
            default_locale: Locale::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("billbook").required(false))
            .add_source(
                Environment::with_prefix("BILLBOOK")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Self::from_config(config)
    }

    /// Deserialize and validate an already-assembled configuration.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let prefix = self.invoice_number_prefix.trim();
        if prefix.is_empty() {
            return Err(ConfigError::Message(
                "invoice_number_prefix must not be empty".to_string(),
            ));
        }
        if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Message(format!(
                "invoice_number_prefix '{prefix}' must be ASCII letters and digits"
            )));
        }
        if self.default_payment_terms_days > 3650 {
            return Err(ConfigError::Message(format!(
                "default_payment_terms_days {} is out of range",
                self.default_payment_terms_days
            )));
        }
        Ok(())
    }
}
