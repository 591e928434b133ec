//! The JKS key protector: a SHA-1 keystream XOR with an integrity check.
//!
//! # Protected layout
//!
//! ```text
//! salt (20) || plaintext XOR keystream || SHA-1(password || plaintext) (20)
//! ```
//!
//! Keystream block `n` is `SHA-1(password || block(n-1))` with block 0 seeded
//! from the salt. `password` is always the UTF-16BE encoding of the characters.

use sha1::{Digest, Sha1};
use zeroize::Zeroizing;

use crate::error::{KeystoreError, Result};

/// Length of the random salt and of each SHA-1 block.
pub(crate) const DIGEST_LEN: usize = 20;

/// UTF-16BE bytes of a password, as hashed by every JKS digest.
pub(crate) fn password_bytes(password: &str) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(
        password
            .encode_utf16()
            .flat_map(u16::to_be_bytes)
            .collect(),
    )
}

fn keystream(password: &[u8], salt: &[u8], len: usize) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(len));
    let mut block = [0u8; DIGEST_LEN];
    block.copy_from_slice(salt);
    while out.len() < len {
        let mut hasher = Sha1::new();
        hasher.update(password);
        hasher.update(block);
        block.copy_from_slice(&hasher.finalize());
        let take = DIGEST_LEN.min(len - out.len());
        out.extend_from_slice(&block[..take]);
    }
    out
}

fn check_digest(password: &[u8], plaintext: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha1::new();
    hasher.update(password);
    hasher.update(plaintext);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Unwrap protected key bytes.
///
/// Returns `Ok(None)` when the check digest does not match, i.e. the password is wrong.
///
/// # Errors
///
/// Returns [`KeystoreError::Malformed`] if the input is shorter than salt plus check digest.
pub(crate) fn recover(protected: &[u8], password: &[u8]) -> Result<Option<Zeroizing<Vec<u8>>>> {
    if protected.len() < 2 * DIGEST_LEN {
        return Err(KeystoreError::Malformed(
            "protected key shorter than salt and check digest".into(),
        ));
    }
    let (salt, rest) = protected.split_at(DIGEST_LEN);
    let (encrypted, check) = rest.split_at(rest.len() - DIGEST_LEN);

    let stream = keystream(password, salt, encrypted.len());
    let plaintext: Zeroizing<Vec<u8>> = Zeroizing::new(
        encrypted
            .iter()
            .zip(stream.iter())
            .map(|(c, k)| c ^ k)
            .collect(),
    );

    if check_digest(password, &plaintext).as_slice() != check {
        return Ok(None);
    }
    Ok(Some(plaintext))
}

/// Protect plaintext key bytes with the given salt.
pub(crate) fn protect(plaintext: &[u8], password: &[u8], salt: &[u8; DIGEST_LEN]) -> Vec<u8> {
    let stream = keystream(password, salt, plaintext.len());
    let mut out = Vec::with_capacity(plaintext.len() + 2 * DIGEST_LEN);
    out.extend_from_slice(salt);
    out.extend(plaintext.iter().zip(stream.iter()).map(|(p, k)| p ^ k));
    out.extend_from_slice(&check_digest(password, plaintext));
    out
}
