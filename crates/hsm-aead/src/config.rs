//! Configuration loading and validation.
//!
//! All values are read from `HSM_AEAD_*` environment variables. The binary
//! exits with a clear error message if any required variable is missing.

use std::fmt;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::token::TokenConfig;

/// Environment variable prefix, e.g. `HSM_AEAD_KEY_LABEL`.
pub const ENV_PREFIX: &str = "HSM_AEAD";

/// Validated configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Path to the PKCS#11 module, e.g. `/usr/lib/softhsm/libsofthsm2.so`. **Required.**
    pub pkcs11_module: String,

    /// Label of the token holding the key. **Required.**
    pub token_label: String,

    /// User PIN for the token. **Required.**
    pub pin: String,

    /// Label of the AES key used for encryption. Required unless supplied
    /// on the command line.
    #[serde(default)]
    pub key_label: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_source(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_source(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg.try_deserialize().context(
            "failed to deserialise configuration \
             (HSM_AEAD_PKCS11_MODULE, HSM_AEAD_TOKEN_LABEL and HSM_AEAD_PIN are required)",
        )?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    pub fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.pkcs11_module, "HSM_AEAD_PKCS11_MODULE")?;
        ensure_non_empty(&self.token_label, "HSM_AEAD_TOKEN_LABEL")?;
        ensure_non_empty(&self.pin, "HSM_AEAD_PIN")?;
        Ok(())
    }

    /// Resolve the key label, preferring `override_label` over the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if neither source provides a non-empty label.
    pub fn key_label<'a>(&'a self, override_label: Option<&'a str>) -> Result<&'a str> {
        let label = override_label
            .or(self.key_label.as_deref())
            .unwrap_or_default();
        ensure_non_empty(label, "HSM_AEAD_KEY_LABEL")?;
        Ok(label)
    }

    /// Token selection and login settings.
    pub fn token(&self) -> TokenConfig {
        TokenConfig {
            module: self.pkcs11_module.clone().into(),
            token_label: self.token_label.clone(),
            pin: self.pin.clone(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("pkcs11_module", &self.pkcs11_module)
            .field("token_label", &self.token_label)
            .field("pin", &"[REDACTED]")
            .field("key_label", &self.key_label)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
