//! Consumers of the PEM material: anything that can build a TLS context from it.
//!
//! The pipeline calls [`ContextSink::mk_ssl_context`] at most once per run, and
//! only after the key and chain were extracted and encoded successfully.

pub mod tls;

pub use tls::RustlsContextSink;

/// Builds a TLS context from a PEM certificate chain and a PEM private key.
#[cfg_attr(test, mockall::automock)]
pub trait ContextSink {
    /// Build the context.
    ///
    /// `cert_chain` holds the certificates leaf first; `private_key` a single
    /// private key document.
    ///
    /// # Errors
    ///
    /// Any error is reported by the pipeline as a sink failure.
    fn mk_ssl_context(&self, cert_chain: &str, private_key: &str) -> anyhow::Result<()>;
}
