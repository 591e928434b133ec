//! In-memory keystore: load, query, and store JKS containers.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

use crate::codec::{self, Reader};
use crate::asn1;
use crate::error::{KeystoreError, Result};
use crate::protector::{self, DIGEST_LEN};

/// Magic number opening every JKS file.
pub const JKS_MAGIC: u32 = 0xfeed_feed;
/// Magic number of the JCEKS variant, recognised only to be rejected.
pub const JCEKS_MAGIC: u32 = 0xcece_cece;

const VERSION_1: u32 = 1;
const VERSION_2: u32 = 2;

const TAG_PRIVATE_KEY: u32 = 1;
const TAG_TRUSTED_CERT: u32 = 2;

const CERT_TYPE_X509: &str = "X.509";

/// Mixed into the integrity digest after the password.
const INTEGRITY_WHITENER: &[u8] = b"Mighty Aphrodite";

/// A DER-encoded certificate as stored in the keystore.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Wrap DER bytes. The contents are not parsed.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self { der: der.into() }
    }

    /// Raw DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

impl AsRef<[u8]> for Certificate {
    fn as_ref(&self) -> &[u8] {
        &self.der
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// Unwrapped private key bytes together with their encoding scheme.
///
/// The bytes are zeroed when dropped and never appear in `Debug` output.
pub struct PrivateKeyMaterial {
    encoded: Zeroizing<Vec<u8>>,
}

impl PrivateKeyMaterial {
    /// Encoding scheme of [`PrivateKeyMaterial::encoded`].
    pub const ENCODING: &'static str = "PKCS#8";

    /// The PKCS#8 `PrivateKeyInfo` bytes.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Always [`PrivateKeyMaterial::ENCODING`].
    pub fn encoding(&self) -> &'static str {
        Self::ENCODING
    }

    /// Key algorithm (`"RSA"`, `"EC"`, ...) when recognisable from the PKCS#8 header.
    pub fn algorithm(&self) -> Option<&'static str> {
        asn1::private_key_algorithm(&self.encoded)
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKeyMaterial([REDACTED])")
    }
}

#[derive(Clone)]
enum Entry {
    PrivateKey {
        created: u64,
        protected: Vec<u8>,
        chain: Vec<Certificate>,
    },
    TrustedCertificate {
        created: u64,
        certificate: Certificate,
    },
}

/// A JKS keystore held in memory.
///
/// Aliases are case-insensitive: they are stored lower-cased and enumerated in
/// lexical order, so the "first" alias is stable for a given set of entries.
#[derive(Clone, Default)]
pub struct KeyStore {
    entries: BTreeMap<String, Entry>,
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("aliases", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn normalise_alias(alias: &str) -> String {
    alias.to_lowercase()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn integrity_digest(password: &str, body: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha1::new();
    hasher.update(protector::password_bytes(password).as_slice());
    hasher.update(INTEGRITY_WHITENER);
    hasher.update(body);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn read_certificate(r: &mut Reader<'_>, version: u32) -> Result<Certificate> {
    if version == VERSION_2 {
        let cert_type = r.utf()?;
        if cert_type != CERT_TYPE_X509 {
            return Err(KeystoreError::Malformed(format!(
                "unsupported certificate type {cert_type:?}"
            )));
        }
    }
    Ok(Certificate::from_der(r.length_prefixed()?))
}

fn write_certificate(out: &mut Vec<u8>, cert: &Certificate) -> Result<()> {
    codec::put_utf(out, CERT_TYPE_X509)?;
    codec::put_length_prefixed(out, cert.der())
}

impl KeyStore {
    /// Create an empty keystore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and open the keystore file at `path`.
    ///
    /// See [`KeyStore::from_bytes`] for password semantics.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::Io`] if the file cannot be read, otherwise any
    /// error from [`KeyStore::from_bytes`].
    pub fn load<P: AsRef<Path>>(path: P, password: Option<&str>) -> Result<Self> {
        let data = Zeroizing::new(std::fs::read(path)?);
        Self::from_bytes(&data, password)
    }

    /// Parse a keystore image.
    ///
    /// With `Some(password)` the trailing integrity digest is verified. With
    /// `None` the entries are read without checking integrity.
    ///
    /// # Errors
    ///
    /// Returns an error if the magic or version is wrong, the data is
    /// truncated or malformed, or the integrity digest does not match.
    pub fn from_bytes(data: &[u8], password: Option<&str>) -> Result<Self> {
        let mut r = Reader::new(data);

        match r.u32()? {
            JKS_MAGIC => {}
            JCEKS_MAGIC => return Err(KeystoreError::UnsupportedFormat("JCEKS")),
            other => return Err(KeystoreError::BadMagic(other)),
        }
        let version = r.u32()?;
        if version != VERSION_1 && version != VERSION_2 {
            return Err(KeystoreError::UnsupportedVersion(version));
        }

        let count = r.u32()?;
        let mut entries = BTreeMap::new();
        for _ in 0..count {
            let tag = r.u32()?;
            let alias = r.utf()?;
            let created = r.u64()?;
            let entry = match tag {
                TAG_PRIVATE_KEY => {
                    let protected = r.length_prefixed()?.to_vec();
                    let chain_len = r.u32()?;
                    let mut chain = Vec::new();
                    for _ in 0..chain_len {
                        chain.push(read_certificate(&mut r, version)?);
                    }
                    Entry::PrivateKey {
                        created,
                        protected,
                        chain,
                    }
                }
                TAG_TRUSTED_CERT => Entry::TrustedCertificate {
                    created,
                    certificate: read_certificate(&mut r, version)?,
                },
                other => {
                    return Err(KeystoreError::Malformed(format!(
                        "unknown entry tag {other}"
                    )))
                }
            };
            entries.insert(normalise_alias(&alias), entry);
        }

        if let Some(password) = password {
            let body = &data[..r.position()];
            let stored = r.bytes(DIGEST_LEN)?;
            if integrity_digest(password, body).as_slice() != stored {
                return Err(KeystoreError::IntegrityCheckFailed);
            }
        }

        Ok(Self { entries })
    }

    /// All aliases, lower-cased, in lexical order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the keystore has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` if `alias` names any entry.
    pub fn contains_alias(&self, alias: &str) -> bool {
        self.entries.contains_key(&normalise_alias(alias))
    }

    /// `true` if `alias` names a private key entry.
    pub fn is_key_entry(&self, alias: &str) -> bool {
        matches!(
            self.entries.get(&normalise_alias(alias)),
            Some(Entry::PrivateKey { .. })
        )
    }

    /// Unwrap the private key stored under `alias`.
    ///
    /// Returns `Ok(None)` when the alias is unknown or names a trusted certificate.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::UnrecoverableKey`] for a wrong key password and
    /// [`KeystoreError::UnsupportedKeyProtection`] if the entry was not written
    /// with the JKS key protector.
    pub fn key(&self, alias: &str, password: &str) -> Result<Option<PrivateKeyMaterial>> {
        let protected = match self.entries.get(&normalise_alias(alias)) {
            Some(Entry::PrivateKey { protected, .. }) => protected,
            _ => return Ok(None),
        };

        let (oid, data) = asn1::decode_encrypted_private_key_info(protected)?;
        if oid != asn1::KEY_PROTECTOR_OID {
            return Err(KeystoreError::UnsupportedKeyProtection(oid.to_string()));
        }

        let encoded = protector::recover(&data, &protector::password_bytes(password))?
            .ok_or_else(|| KeystoreError::UnrecoverableKey(alias.to_owned()))?;
        Ok(Some(PrivateKeyMaterial { encoded }))
    }

    /// Certificate chain stored under `alias`, leaf first.
    ///
    /// A trusted-certificate entry yields its single certificate; an unknown
    /// alias yields an empty chain. The certificates are copies.
    pub fn certificate_chain(&self, alias: &str) -> Vec<Certificate> {
        match self.entries.get(&normalise_alias(alias)) {
            Some(Entry::PrivateKey { chain, .. }) => chain.clone(),
            Some(Entry::TrustedCertificate { certificate, .. }) => vec![certificate.clone()],
            None => Vec::new(),
        }
    }

    /// Insert or replace a private key entry.
    ///
    /// `pkcs8` is protected with `password` under a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::Malformed`] if the alias is empty and
    /// [`KeystoreError::Der`] if the protected key cannot be encoded.
    pub fn set_key_entry(
        &mut self,
        alias: &str,
        pkcs8: &[u8],
        password: &str,
        chain: Vec<Certificate>,
    ) -> Result<()> {
        if alias.is_empty() {
            return Err(KeystoreError::Malformed("alias must not be empty".into()));
        }
        let salt: [u8; DIGEST_LEN] = rand::random();
        let protected = protector::protect(pkcs8, &protector::password_bytes(password), &salt);
        self.entries.insert(
            normalise_alias(alias),
            Entry::PrivateKey {
                created: now_millis(),
                protected: asn1::encode_encrypted_private_key_info(&protected)?,
                chain,
            },
        );
        Ok(())
    }

    /// Insert or replace a trusted certificate entry.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::Malformed`] if the alias is empty.
    pub fn set_certificate_entry(&mut self, alias: &str, certificate: Certificate) -> Result<()> {
        if alias.is_empty() {
            return Err(KeystoreError::Malformed("alias must not be empty".into()));
        }
        self.entries.insert(
            normalise_alias(alias),
            Entry::TrustedCertificate {
                created: now_millis(),
                certificate,
            },
        );
        Ok(())
    }

    /// Remove the entry under `alias`, returning whether one existed.
    pub fn delete_entry(&mut self, alias: &str) -> bool {
        self.entries.remove(&normalise_alias(alias)).is_some()
    }

    /// Serialise as a version 2 JKS image sealed with `password`.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoreError::Malformed`] if an alias or field exceeds the format limits.
    pub fn to_bytes(&self, password: &str) -> Result<Vec<u8>> {
        let count = u32::try_from(self.entries.len())
            .map_err(|_| KeystoreError::Malformed("too many entries".into()))?;

        let mut out = Vec::new();
        codec::put_u32(&mut out, JKS_MAGIC);
        codec::put_u32(&mut out, VERSION_2);
        codec::put_u32(&mut out, count);

        for (alias, entry) in &self.entries {
            match entry {
                Entry::PrivateKey {
                    created,
                    protected,
                    chain,
                } => {
                    codec::put_u32(&mut out, TAG_PRIVATE_KEY);
                    codec::put_utf(&mut out, alias)?;
                    codec::put_u64(&mut out, *created);
                    codec::put_length_prefixed(&mut out, protected)?;
                    let chain_len = u32::try_from(chain.len())
                        .map_err(|_| KeystoreError::Malformed("chain too long".into()))?;
                    codec::put_u32(&mut out, chain_len);
                    for cert in chain {
                        write_certificate(&mut out, cert)?;
                    }
                }
                Entry::TrustedCertificate {
                    created,
                    certificate,
                } => {
                    codec::put_u32(&mut out, TAG_TRUSTED_CERT);
                    codec::put_utf(&mut out, alias)?;
                    codec::put_u64(&mut out, *created);
                    write_certificate(&mut out, certificate)?;
                }
            }
        }

        let digest = integrity_digest(password, &out);
        out.extend_from_slice(&digest);
        Ok(out)
    }

    /// Serialise with [`KeyStore::to_bytes`] and write to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or the file write fails.
    pub fn store<P: AsRef<Path>>(&self, path: P, password: &str) -> Result<()> {
        std::fs::write(path, self.to_bytes(password)?)?;
        Ok(())
    }
}
