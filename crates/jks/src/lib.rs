//! Reader and writer for Java KeyStore (JKS) containers.
//!
//! A JKS file holds named entries, each either a password-protected private key
//! with its certificate chain or a single trusted certificate, sealed by a
//! SHA-1 integrity digest keyed with the store password.
//!
//! # Security invariants
//!
//! - Unwrapped key bytes live in zeroizing buffers and are redacted from `Debug`.
//! - Nothing in this crate logs.

mod asn1;
mod codec;
pub mod error;
mod keystore;
mod protector;

pub use error::{KeystoreError, Result};
pub use keystore::{Certificate, KeyStore, PrivateKeyMaterial, JCEKS_MAGIC, JKS_MAGIC};
