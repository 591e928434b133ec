//! Reads the private key and certificate chain for the resolved alias.

use common::SslError;
use jks::{Certificate, KeyStore, PrivateKeyMaterial};
use sha2::{Digest, Sha256};
use tracing::info;

/// Key and chain owned independently of the keystore they came from.
#[derive(Debug)]
pub struct KeyAndChain {
    /// Unwrapped private key.
    pub key: PrivateKeyMaterial,
    /// Certificates, leaf first, in keystore order.
    pub chain: Vec<Certificate>,
}

/// Extract the key and chain under `alias`.
///
/// An absent `key_pass` unwraps with the empty password. A key with an empty
/// chain is accepted.
///
/// # Errors
///
/// Returns [`SslError::SettingsMalformed`] if the alias holds no private key and
/// [`SslError::KeystoreLoadFailure`] if the key cannot be unwrapped.
pub fn extract(ks: &KeyStore, alias: &str, key_pass: Option<&str>) -> Result<KeyAndChain, SslError> {
    let key = ks
        .key(alias, key_pass.unwrap_or_default())
        .map_err(|e| SslError::KeystoreLoadFailure(e.to_string()))?
        .ok_or_else(|| {
            SslError::SettingsMalformed(format!(
                "private key not found in keystore for alias: {alias}"
            ))
        })?;
    info!(
        alias,
        encoding = key.encoding(),
        algorithm = key.algorithm().unwrap_or("unknown"),
        "discovered key from keystore"
    );

    let chain = ks.certificate_chain(alias);
    info!(
        alias,
        certificates = chain.len(),
        leaf_sha256 = %chain.first().map(fingerprint).unwrap_or_default(),
        "discovered certificate chain from keystore"
    );

    Ok(KeyAndChain { key, chain })
}

/// Lower-case hex SHA-256 of a certificate's DER bytes.
pub fn fingerprint(cert: &Certificate) -> String {
    Sha256::digest(cert.der())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
