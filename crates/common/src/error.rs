//! Common error types shared across crates.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level SSL bootstrap error type.
///
/// Variants map to short machine-readable codes used in log fields:
/// - [`SslError::SettingsMalformed`] → `settings_malformed`
/// - [`SslError::KeystoreLoadFailure`] → `keystore_load_failure`
/// - [`SslError::PrivilegeDenied`] → `privilege_denied`
/// - [`SslError::SinkFailure`] → `sink_failure`
#[derive(Debug, Error)]
pub enum SslError {
    /// The keystore opened fine but holds no usable alias or no key under the
    /// resolved alias.
    #[error("settings malformed: {0}")]
    SettingsMalformed(String),

    /// The keystore file is missing, the password is wrong, or the container is corrupt.
    #[error("keystore load failure: {0}")]
    KeystoreLoadFailure(String),

    /// Access to the keystore (or the privileged scope itself) was refused.
    #[error("privilege denied for keystore {}: {reason}", path.display())]
    PrivilegeDenied {
        /// Configured keystore path, reported as the operator hint.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// The context sink rejected the PEM material.
    #[error("context sink failure: {0}")]
    SinkFailure(String),
}

impl SslError {
    /// Returns the short code recorded in the `code` log field.
    pub fn code(&self) -> &'static str {
        match self {
            SslError::SettingsMalformed(_) => "settings_malformed",
            SslError::KeystoreLoadFailure(_) => "keystore_load_failure",
            SslError::PrivilegeDenied { .. } => "privilege_denied",
            SslError::SinkFailure(_) => "sink_failure",
        }
    }

    /// The keystore path to point operators at, for denied-access failures.
    pub fn access_hint(&self) -> Option<&std::path::Path> {
        match self {
            SslError::PrivilegeDenied { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }
}
