//! rustls-backed context sink.
//!
//! Builds a `rustls::ServerConfig` from the PEM strings produced by the
//! pipeline and keeps it for the host to pick up. The private key document uses
//! three-dash markers, so it is decoded here rather than by `rustls-pemfile`.

use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use common::pem::{self, PemKind};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::ServerConfig;

use super::ContextSink;

/// Build a [`rustls::ServerConfig`] from a PEM certificate chain and PEM private key.
///
/// # Errors
///
/// Returns an error if the chain or key cannot be parsed, the chain is empty,
/// or rustls rejects the configuration.
pub fn build_server_config(cert_chain_pem: &str, private_key_pem: &str) -> Result<Arc<ServerConfig>> {
    let certs = rustls_pemfile::certs(&mut std::io::BufReader::new(cert_chain_pem.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .context("failed to parse TLS certificate chain")?;
    if certs.is_empty() {
        anyhow::bail!("no certificates found in PEM chain");
    }

    let key = pem::decode(private_key_pem, PemKind::PrivateKey)
        .context("failed to read TLS private key")?
        .into_iter()
        .next()
        .context("no private key found in PEM data")?;
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key));

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("failed to build rustls ServerConfig")?;

    Ok(Arc::new(config))
}

/// [`ContextSink`] that produces a [`rustls::ServerConfig`].
#[derive(Debug, Default)]
pub struct RustlsContextSink {
    config: OnceLock<Arc<ServerConfig>>,
}

impl RustlsContextSink {
    /// Create a sink with no context yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built server configuration, once the pipeline has succeeded.
    pub fn server_config(&self) -> Option<Arc<ServerConfig>> {
        self.config.get().cloned()
    }
}

impl ContextSink for RustlsContextSink {
    fn mk_ssl_context(&self, cert_chain: &str, private_key: &str) -> Result<()> {
        if self.config.get().is_some() {
            anyhow::bail!("SSL context already configured");
        }
        let config = build_server_config(cert_chain, private_key)?;
        self.config
            .set(config)
            .map_err(|_| anyhow::anyhow!("SSL context already configured"))
    }
}
