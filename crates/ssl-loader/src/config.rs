//! Configuration loading and validation for the SSL loader.
//!
//! Values come from an optional TOML file, then environment variables with the
//! `SSL_` prefix (`SSL_ENABLE`, `SSL_KEYSTORE_FILE`, ...), which take precedence.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Prefix of every environment variable read by [`Config::load`].
pub const ENV_PREFIX: &str = "SSL";

/// Validated SSL configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Whether SSL should be configured at all.
    #[serde(default)]
    pub enable: bool,

    /// Path to the JKS keystore. **Required** when `enable` is set.
    #[serde(default)]
    pub keystore_file: Option<PathBuf>,

    /// Keystore password. Absent means the keystore is opened without one.
    #[serde(default)]
    pub keystore_pass: Option<String>,

    /// Key password. Absent means the key is unwrapped with an empty password.
    #[serde(default)]
    pub key_pass: Option<String>,

    /// Alias of the key entry. Absent means the first alias in the keystore.
    #[serde(default)]
    pub key_alias: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable: false,
            keystore_file: None,
            keystore_pass: None,
            key_pass: None,
            key_alias: None,
            log_level: default_log_level(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Config")
            .field("enable", &self.enable)
            .field("keystore_file", &self.keystore_file)
            .field("keystore_pass", &redact(&self.keystore_pass))
            .field("key_pass", &redact(&self.key_pass))
            .field("key_alias", &self.key_alias)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables only.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or validation fails.
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load and validate configuration from `file` (TOML) overlaid with the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unparsable, a variable cannot
    /// be parsed, or validation fails.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let cfg = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("failed to build SSL configuration")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise SSL configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.enable {
            match &self.keystore_file {
                Some(path) if !path.as_os_str().is_empty() => {}
                _ => anyhow::bail!(
                    "SSL_KEYSTORE_FILE is required and must not be empty when SSL is enabled"
                ),
            }
        }
        if let Some(alias) = &self.key_alias {
            ensure_non_blank(alias, "SSL_KEY_ALIAS")?;
        }
        Ok(())
    }
}

fn ensure_non_blank(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} must not be blank when set");
    }
    Ok(())
}
