//! The settings the SSL pipeline consumes, independent of where they come from.

use std::path::Path;

use crate::config::Config;

/// Read-only view of the SSL settings.
///
/// Optional values are `None` when not configured; an empty string is a
/// configured (empty) value, not an absent one.
pub trait SslSettings {
    /// Whether SSL should be configured.
    fn is_ssl_enabled(&self) -> bool;
    /// Path to the keystore file.
    fn keystore_file(&self) -> &Path;
    /// Keystore password, if configured.
    fn keystore_pass(&self) -> Option<&str>;
    /// Key password, if configured.
    fn key_pass(&self) -> Option<&str>;
    /// Key alias, if configured.
    fn key_alias(&self) -> Option<&str>;
}

impl SslSettings for Config {
    fn is_ssl_enabled(&self) -> bool {
        self.enable
    }

    fn keystore_file(&self) -> &Path {
        self.keystore_file.as_deref().unwrap_or_else(|| Path::new(""))
    }

    fn keystore_pass(&self) -> Option<&str> {
        self.keystore_pass.as_deref()
    }

    fn key_pass(&self) -> Option<&str> {
        self.key_pass.as_deref()
    }

    fn key_alias(&self) -> Option<&str> {
        self.key_alias.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_exposes_optional_values() {
        let cfg = Config {
            enable: true,
            keystore_file: Some("/etc/ssl/server.jks".into()),
            keystore_pass: Some(String::new()),
            key_pass: None,
            key_alias: Some("server".into()),
            ..Config::default()
        };
        assert!(cfg.is_ssl_enabled());
        assert_eq!(cfg.keystore_file(), Path::new("/etc/ssl/server.jks"));
        assert_eq!(cfg.keystore_pass(), Some(""));
        assert_eq!(cfg.key_pass(), None);
        assert_eq!(cfg.key_alias(), Some("server"));
    }

    #[test]
    fn unset_keystore_file_is_empty_path() {
        assert_eq!(Config::default().keystore_file(), Path::new(""));
    }
}
