//! `ssl-loader`: reads a private key and certificate chain from a JKS keystore,
//! encodes them as PEM and hands them to a TLS context builder.
//!
//! Startup sequence, driven by the `ssl-loader` binary:
//! 1. Load and validate [`config::Config`] from an optional TOML file and `SSL_*` variables.
//! 2. Initialise tracing ([`telemetry::init_telemetry`]).
//! 3. Run [`pipeline::create_context`] against a [`sink::ContextSink`].

pub mod config;
pub mod pipeline;
pub mod settings;
pub mod sink;
pub mod telemetry;
