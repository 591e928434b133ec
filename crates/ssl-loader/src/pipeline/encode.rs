//! Turns the extracted key and chain into the PEM strings handed to the sink.

use std::fmt;

use common::pem;
use zeroize::Zeroizing;

use super::extract::KeyAndChain;

/// The two PEM strings a context sink consumes.
pub struct PemBundle {
    /// Single private key document with three-dash markers, no trailing newline.
    pub private_key: Zeroizing<String>,
    /// Certificate documents in chain order, each ending with a newline.
    pub cert_chain: String,
}

impl PemBundle {
    /// Encode `material`. A pure format transform; it cannot fail.
    pub fn encode(material: &KeyAndChain) -> Self {
        Self {
            private_key: pem::encode_private_key(material.key.encoded()),
            cert_chain: pem::encode_certificate_chain(&material.chain),
        }
    }
}

impl fmt::Debug for PemBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PemBundle")
            .field("private_key", &"[redacted]")
            .field("cert_chain_len", &self.cert_chain.len())
            .finish()
    }
}
