//! Errors produced while reading, unlocking, or writing a keystore.

use thiserror::Error;

/// Keystore error type.
#[derive(Debug, Error)]
pub enum KeystoreError {
    /// The keystore file could not be read.
    #[error("failed to read keystore: {0}")]
    Io(#[from] std::io::Error),

    /// The leading magic number is not a keystore magic.
    #[error("not a JKS keystore (magic {0:#010x})")]
    BadMagic(u32),

    /// A recognised container whose format is not supported.
    #[error("unsupported keystore format: {0}")]
    UnsupportedFormat(&'static str),

    /// The JKS version field is neither 1 nor 2.
    #[error("unsupported JKS version {0}")]
    UnsupportedVersion(u32),

    /// The data ended before a complete field could be read.
    #[error("keystore data truncated")]
    Truncated,

    /// A DER structure inside an entry could not be parsed or written.
    #[error("invalid DER in key entry: {0}")]
    Der(#[from] der::Error),

    /// A field is structurally invalid.
    #[error("malformed keystore: {0}")]
    Malformed(String),

    /// The trailing digest does not match: wrong password or tampered file.
    #[error("keystore integrity check failed: wrong password or tampered file")]
    IntegrityCheckFailed,

    /// The key entry could not be unwrapped with the given key password.
    #[error("cannot recover key for alias {0}: wrong key password")]
    UnrecoverableKey(String),

    /// The key entry is protected with an algorithm other than the JKS key protector.
    #[error("unsupported key protection algorithm {0}")]
    UnsupportedKeyProtection(String),
}

/// Result alias for keystore operations.
pub type Result<T> = std::result::Result<T, KeystoreError>;
