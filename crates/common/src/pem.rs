//! PEM text encoding of private keys and certificate chains.
//!
//! # Document format
//!
//! ```text
//! ---BEGIN PRIVATE KEY---
//! <base64(pkcs8)>
//! ---END PRIVATE KEY---
//! ```
//!
//! ```text
//! -----BEGIN CERTIFICATE-----
//! <base64(der)>
//! -----END CERTIFICATE-----
//! ```
//!
//! Bodies use the standard padded base64 alphabet on a single line. The private
//! key markers carry three dashes, the certificate markers five; consumers that
//! compare byte-for-byte rely on both. A certificate document always ends with a
//! newline, the private key document never does.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;
use zeroize::Zeroizing;

/// Opening marker of the private key document.
pub const PRIVATE_KEY_HEADER: &str = "---BEGIN PRIVATE KEY---";
/// Closing marker of the private key document.
pub const PRIVATE_KEY_FOOTER: &str = "---END PRIVATE KEY---";
/// Opening marker of each certificate document.
pub const CERTIFICATE_HEADER: &str = "-----BEGIN CERTIFICATE-----";
/// Closing marker of each certificate document.
pub const CERTIFICATE_FOOTER: &str = "-----END CERTIFICATE-----";

/// Kind of PEM document, selecting its marker lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PemKind {
    /// PKCS#8 private key.
    PrivateKey,
    /// DER X.509 certificate.
    Certificate,
}

impl PemKind {
    /// Header line for this kind.
    pub fn header(self) -> &'static str {
        match self {
            PemKind::PrivateKey => PRIVATE_KEY_HEADER,
            PemKind::Certificate => CERTIFICATE_HEADER,
        }
    }

    /// Footer line for this kind.
    pub fn footer(self) -> &'static str {
        match self {
            PemKind::PrivateKey => PRIVATE_KEY_FOOTER,
            PemKind::Certificate => CERTIFICATE_FOOTER,
        }
    }
}

/// Errors produced when reading PEM text back into DER bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PemError {
    /// A header line was found without its matching footer.
    #[error("unterminated {0:?} block")]
    Unterminated(PemKind),

    /// The body of a block is not valid standard base64.
    #[error("invalid base64 in {0:?} block")]
    InvalidBase64(PemKind),
}

/// Encode PKCS#8 private key bytes as a single PEM document.
///
/// The returned string is zeroed when dropped.
pub fn encode_private_key(der: &[u8]) -> Zeroizing<String> {
    let body = Zeroizing::new(STANDARD.encode(der));
    let mut out = Zeroizing::new(String::with_capacity(
        PRIVATE_KEY_HEADER.len() + body.len() + PRIVATE_KEY_FOOTER.len() + 2,
    ));
    out.push_str(PRIVATE_KEY_HEADER);
    out.push('\n');
    out.push_str(&body);
    out.push('\n');
    out.push_str(PRIVATE_KEY_FOOTER);
    out
}

/// Encode one DER certificate, newline-terminated.
pub fn encode_certificate(der: &[u8]) -> String {
    format!(
        "{CERTIFICATE_HEADER}\n{}\n{CERTIFICATE_FOOTER}\n",
        STANDARD.encode(der)
    )
}

/// Encode a chain of DER certificates, concatenated in the given order.
///
/// An empty chain produces an empty string.
pub fn encode_certificate_chain<C: AsRef<[u8]>>(chain: &[C]) -> String {
    chain
        .iter()
        .map(|der| encode_certificate(der.as_ref()))
        .collect()
}

/// Decode every `kind` block found in `pem`, in order of appearance.
///
/// Text outside matching marker lines is skipped. Both `\n` and `\r\n` line
/// endings are accepted.
///
/// # Errors
///
/// Returns [`PemError::Unterminated`] if a header has no footer and
/// [`PemError::InvalidBase64`] if a body does not decode.
pub fn decode(pem: &str, kind: PemKind) -> Result<Vec<Vec<u8>>, PemError> {
    let mut out = Vec::new();
    let mut body: Option<Zeroizing<String>> = None;

    for line in pem.lines().map(|l| l.trim_end_matches('\r')) {
        if let Some(acc) = body.as_mut() {
            if line == kind.footer() {
                let der = STANDARD
                    .decode(acc.as_bytes())
                    .map_err(|_| PemError::InvalidBase64(kind))?;
                out.push(der);
                body = None;
            } else {
                acc.push_str(line.trim());
            }
        } else if line == kind.header() {
            body = Some(Zeroizing::new(String::new()));
        }
    }

    if body.is_some() {
        return Err(PemError::Unterminated(kind));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_key_layout_is_exact() {
        let pem = encode_private_key(&[0x30, 0x03, 0x02, 0x01, 0x00]);
        assert_eq!(
            pem.as_str(),
            "---BEGIN PRIVATE KEY---\nMAMCAQA=\n---END PRIVATE KEY---"
        );
    }

    #[test]
    fn certificate_layout_is_exact() {
        let pem = encode_certificate(b"cert");
        assert_eq!(
            pem,
            "-----BEGIN CERTIFICATE-----\nY2VydA==\n-----END CERTIFICATE-----\n"
        );
    }

    #[test]
    fn chain_concatenates_in_order_without_separator() {
        let pem = encode_certificate_chain(&[b"leaf".to_vec(), b"issuer".to_vec()]);
        assert_eq!(
            pem,
            format!("{}{}", encode_certificate(b"leaf"), encode_certificate(b"issuer"))
        );
        assert_eq!(pem.matches(CERTIFICATE_HEADER).count(), 2);
    }

    #[test]
    fn empty_chain_is_empty_string() {
        let chain: Vec<Vec<u8>> = Vec::new();
        assert_eq!(encode_certificate_chain(&chain), "");
    }

    #[test]
    fn body_is_standard_not_url_safe() {
        // 0xfb 0xff encodes to "+/8=" in the standard alphabet and "-_8=" in the URL-safe one.
        let pem = encode_certificate(&[0xfb, 0xff]);
        assert!(pem.contains("+/8="));
        assert!(!pem.contains("-_8="));
    }

    #[test]
    fn decode_recovers_chain_in_order() {
        let pem = encode_certificate_chain(&[vec![1u8, 2, 3], vec![4u8, 5]]);
        let ders = decode(&pem, PemKind::Certificate).unwrap();
        assert_eq!(ders, vec![vec![1u8, 2, 3], vec![4u8, 5]]);
    }

    #[test]
    fn decode_recovers_key_with_three_dash_markers() {
        let key = vec![0x30u8, 0x82, 0x01, 0x00, 0xaa];
        let pem = encode_private_key(&key);
        assert_eq!(decode(&pem, PemKind::PrivateKey).unwrap(), vec![key]);
    }

    #[test]
    fn decode_ignores_other_kind() {
        let pem = encode_certificate(b"cert");
        assert!(decode(&pem, PemKind::PrivateKey).unwrap().is_empty());
    }

    #[test]
    fn decode_accepts_crlf() {
        let pem = "-----BEGIN CERTIFICATE-----\r\nY2VydA==\r\n-----END CERTIFICATE-----\r\n";
        assert_eq!(
            decode(pem, PemKind::Certificate).unwrap(),
            vec![b"cert".to_vec()]
        );
    }

    #[test]
    fn decode_rejects_unterminated_block() {
        let pem = "---BEGIN PRIVATE KEY---\nMAMCAQA=\n";
        assert_eq!(
            decode(pem, PemKind::PrivateKey),
            Err(PemError::Unterminated(PemKind::PrivateKey))
        );
    }

    #[test]
    fn decode_rejects_bad_base64() {
        let pem = "-----BEGIN CERTIFICATE-----\n!!!\n-----END CERTIFICATE-----\n";
        assert_eq!(
            decode(pem, PemKind::Certificate),
            Err(PemError::InvalidBase64(PemKind::Certificate))
        );
    }
}
