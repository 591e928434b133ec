//! `ssl-loader` binary entry point.
//!
//! Usage: `ssl-loader [CONFIG.toml]`. Environment variables with the `SSL_`
//! prefix override the file.
//!
//! Exits non-zero only when the configuration is invalid. A pipeline failure is
//! logged and the process exits successfully with SSL unconfigured.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use ssl_loader::config::Config;
use ssl_loader::pipeline::{self, SslOutcome};
use ssl_loader::sink::RustlsContextSink;
use ssl_loader::telemetry;

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let cfg = Config::load(path.as_deref()).map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg.log_level)?;
    info!(version = env!("CARGO_PKG_VERSION"), "ssl-loader starting");

    // -----------------------------------------------------------------------
    // 3. Keystore to TLS context
    // -----------------------------------------------------------------------
    let sink = RustlsContextSink::new();
    match pipeline::create_context(&cfg, &sink) {
        SslOutcome::Disabled => info!("finished without SSL"),
        SslOutcome::Configured { alias, certificates } => {
            let ready = sink.server_config().is_some();
            info!(alias = %alias, certificates, ready, "TLS server configuration ready");
        }
        SslOutcome::Failed(failure) => {
            warn!(stage = %failure.stage, code = failure.error.code(), "SSL left unconfigured");
        }
    }

    Ok(())
}
