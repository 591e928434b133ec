//! DER structures of JKS key entries.
//!
//! A key entry is stored as
//!
//! ```text
//! EncryptedPrivateKeyInfo ::= SEQUENCE {
//!     encryptionAlgorithm  AlgorithmIdentifier,
//!     encryptedData        OCTET STRING }
//! ```
//!
//! and the unwrapped payload is a PKCS#8 `PrivateKeyInfo`, whose algorithm
//! identifier is read to report the key algorithm.

use der::asn1::{AnyRef, ObjectIdentifier, OctetStringRef};
use der::{Decode, Encode, Sequence};
use pkcs8::PrivateKeyInfo;
use spki::AlgorithmIdentifierRef;

use crate::error::Result;

/// The proprietary JKS key protector.
pub(crate) const KEY_PROTECTOR_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.42.2.17.1.1");

const KNOWN_KEY_ALGORITHMS: &[(ObjectIdentifier, &str)] = &[
    (ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1"), "RSA"),
    (ObjectIdentifier::new_unwrap("1.2.840.10045.2.1"), "EC"),
    (ObjectIdentifier::new_unwrap("1.2.840.10040.4.1"), "DSA"),
    (ObjectIdentifier::new_unwrap("1.3.101.112"), "Ed25519"),
    (ObjectIdentifier::new_unwrap("1.3.101.113"), "Ed448"),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Sequence)]
struct EncryptedPrivateKeyInfo<'a> {
    encryption_algorithm: AlgorithmIdentifierRef<'a>,
    encrypted_data: OctetStringRef<'a>,
}

/// Parse an `EncryptedPrivateKeyInfo`, returning its algorithm OID and encrypted bytes.
pub(crate) fn decode_encrypted_private_key_info(bytes: &[u8]) -> Result<(ObjectIdentifier, Vec<u8>)> {
    let info = EncryptedPrivateKeyInfo::from_der(bytes)?;
    Ok((
        info.encryption_algorithm.oid,
        info.encrypted_data.as_bytes().to_vec(),
    ))
}

/// Wrap protected key bytes as an `EncryptedPrivateKeyInfo` using the JKS key protector OID.
pub(crate) fn encode_encrypted_private_key_info(data: &[u8]) -> Result<Vec<u8>> {
    let info = EncryptedPrivateKeyInfo {
        encryption_algorithm: AlgorithmIdentifierRef {
            oid: KEY_PROTECTOR_OID,
            parameters: Some(AnyRef::NULL),
        },
        encrypted_data: OctetStringRef::new(data)?,
    };
    Ok(info.to_der()?)
}

/// Algorithm name of a PKCS#8 `PrivateKeyInfo`, if it is one of the well-known key types.
pub(crate) fn private_key_algorithm(pkcs8: &[u8]) -> Option<&'static str> {
    let info = PrivateKeyInfo::try_from(pkcs8).ok()?;
    KNOWN_KEY_ALGORITHMS
        .iter()
        .find(|(oid, _)| *oid == info.algorithm.oid)
        .map(|(_, name)| *name)
}
