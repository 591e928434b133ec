//! Keystore to TLS context pipeline.
//!
//! Runs once at startup: load the keystore, resolve the alias, extract key and
//! chain, encode both as PEM and hand them to a [`ContextSink`] inside the
//! privileged scope. [`create_context`] never fails: a failure is logged and
//! reported as [`SslOutcome::Failed`], leaving SSL unconfigured.

pub mod alias;
pub mod encode;
pub mod extract;
pub mod loader;
pub mod privileged;

use std::fmt;

use common::SslError;
use tracing::{error, info};

use crate::settings::SslSettings;
use crate::sink::ContextSink;

pub use alias::{AliasSource, ResolvedAlias};
pub use encode::PemBundle;

/// Pipeline step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Opening the keystore.
    Loading,
    /// Choosing the alias.
    ResolvingAlias,
    /// Reading key and chain.
    Extracting,
    /// Handing the PEM strings to the sink.
    Invoking,
}

impl Stage {
    /// Name used in the `stage` log field.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Loading => "loading",
            Stage::ResolvingAlias => "resolving_alias",
            Stage::Extracting => "extracting",
            Stage::Invoking => "invoking",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed run: where it stopped and why.
#[derive(Debug)]
pub struct Failure {
    /// Step that failed.
    pub stage: Stage,
    /// What went wrong.
    pub error: SslError,
}

impl Failure {
    fn at(stage: Stage) -> impl FnOnce(SslError) -> Self {
        move |error| Self { stage, error }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.error)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Result of one pipeline run.
#[derive(Debug)]
pub enum SslOutcome {
    /// SSL is switched off; nothing was read and the sink was not called.
    Disabled,
    /// The sink accepted the material.
    Configured {
        /// Alias the key was read from.
        alias: String,
        /// Number of certificates handed over with the key.
        certificates: usize,
    },
    /// SSL was left unconfigured.
    Failed(Failure),
}

/// PEM material ready for a sink, plus what it was read from.
#[derive(Debug)]
pub struct Prepared {
    /// Alias the material was read from.
    pub alias: ResolvedAlias,
    /// Length of the certificate chain.
    pub certificates: usize,
    /// Private key and chain as PEM.
    pub bundle: PemBundle,
}

/// Load, resolve, extract and encode, without touching a sink.
///
/// The keystore handle is dropped before encoding.
///
/// # Errors
///
/// Returns the first [`Failure`] encountered.
pub fn prepare<S: SslSettings + ?Sized>(settings: &S) -> Result<Prepared, Failure> {
    let (alias, extracted) = {
        let ks = loader::load_keystore(settings.keystore_file(), settings.keystore_pass())
            .map_err(Failure::at(Stage::Loading))?;
        let alias = alias::resolve_alias(&ks, settings.key_alias())
            .map_err(Failure::at(Stage::ResolvingAlias))?;
        let extracted = extract::extract(&ks, &alias.name, settings.key_pass())
            .map_err(Failure::at(Stage::Extracting))?;
        (alias, extracted)
    };

    Ok(Prepared {
        alias,
        certificates: extracted.chain.len(),
        bundle: PemBundle::encode(&extracted),
    })
}

/// Run the pipeline and return the failure instead of logging it.
///
/// # Errors
///
/// Returns the [`Failure`] of the first stage that failed.
pub fn try_create_context<S, C>(settings: &S, sink: &C) -> Result<SslOutcome, Failure>
where
    S: SslSettings + ?Sized,
    C: ContextSink + ?Sized,
{
    if !settings.is_ssl_enabled() {
        info!("SSL is disabled");
        return Ok(SslOutcome::Disabled);
    }

    let keystore = settings.keystore_file();
    info!(
        keystore = %keystore.display(),
        alias = settings.key_alias().unwrap_or("<first in keystore>"),
        "attempting to configure SSL from keystore"
    );

    let prepared = prepare(settings)?;
    privileged::invoke_sink(sink, keystore, &prepared.bundle)
        .map_err(Failure::at(Stage::Invoking))?;

    info!(
        alias = %prepared.alias.name,
        certificates = prepared.certificates,
        "SSL context configured"
    );
    Ok(SslOutcome::Configured {
        alias: prepared.alias.name,
        certificates: prepared.certificates,
    })
}

/// Run the pipeline, logging and swallowing any failure.
pub fn create_context<S, C>(settings: &S, sink: &C) -> SslOutcome
where
    S: SslSettings + ?Sized,
    C: ContextSink + ?Sized,
{
    match try_create_context(settings, sink) {
        Ok(outcome) => outcome,
        Err(failure) => {
            report(&failure);
            SslOutcome::Failed(failure)
        }
    }
}

fn report(failure: &Failure) {
    error!(
        stage = %failure.stage,
        code = failure.error.code(),
        error = %failure.error,
        "failed to configure SSL, continuing without it"
    );
    if let Some(path) = failure.error.access_hint() {
        error!(
            keystore = %path.display(),
            "access to the keystore was denied; grant this process read access to the keystore file"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};

    use common::pem::{self, PemKind};
    use jks::{Certificate, KeyStore};

    use super::*;
    use crate::sink::{MockContextSink, RustlsContextSink};

    #[derive(Default)]
    struct TestSettings {
        enabled: bool,
        keystore: PathBuf,
        keystore_pass: Option<String>,
        key_pass: Option<String>,
        alias: Option<String>,
    }

    impl SslSettings for TestSettings {
        fn is_ssl_enabled(&self) -> bool {
            self.enabled
        }
        fn keystore_file(&self) -> &Path {
            &self.keystore
        }
        fn keystore_pass(&self) -> Option<&str> {
            self.keystore_pass.as_deref()
        }
        fn key_pass(&self) -> Option<&str> {
            self.key_pass.as_deref()
        }
        fn key_alias(&self) -> Option<&str> {
            self.alias.as_deref()
        }
    }

    const KEY: &[u8] = b"pkcs8-private-key";
    const LEAF: &[u8] = b"leaf-certificate-der";
    const ISSUER: &[u8] = b"issuer-certificate-der";

    fn write(ks: &KeyStore, dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("server.jks");
        ks.store(&path, "storepass").unwrap();
        path
    }

    fn single_alias_store(dir: &tempfile::TempDir) -> PathBuf {
        let mut ks = KeyStore::new();
        ks.set_key_entry(
            "server",
            KEY,
            "keypass",
            vec![Certificate::from_der(LEAF), Certificate::from_der(ISSUER)],
        )
        .unwrap();
        write(&ks, dir)
    }

    fn enabled(keystore: PathBuf) -> TestSettings {
        TestSettings {
            enabled: true,
            keystore,
            keystore_pass: Some("storepass".into()),
            key_pass: Some("keypass".into()),
            alias: None,
        }
    }

    fn recording_sink(calls: Arc<Mutex<Vec<(String, String)>>>) -> MockContextSink {
        let mut sink = MockContextSink::new();
        sink.expect_mk_ssl_context().returning(move |chain, key| {
            calls.lock().unwrap().push((chain.to_owned(), key.to_owned()));
            Ok(())
        });
        sink
    }

    fn never_called_sink() -> MockContextSink {
        let mut sink = MockContextSink::new();
        sink.expect_mk_ssl_context().never();
        sink
    }

    #[test]
    fn infers_single_alias_and_passes_chain_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let settings = enabled(single_alias_store(&dir));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = recording_sink(calls.clone());

        let outcome = create_context(&settings, &sink);
        assert!(matches!(
            outcome,
            SslOutcome::Configured { ref alias, certificates: 2 } if alias == "server"
        ));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (chain, key) = &calls[0];
        assert_eq!(chain.matches("-----BEGIN CERTIFICATE-----").count(), 2);
        assert_eq!(
            pem::decode(chain, PemKind::Certificate).unwrap(),
            vec![LEAF.to_vec(), ISSUER.to_vec()]
        );
        assert_eq!(
            pem::decode(key, PemKind::PrivateKey).unwrap(),
            vec![KEY.to_vec()]
        );
    }

    #[test]
    fn configured_alias_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let mut ks = KeyStore::new();
        ks.set_key_entry("alpha", b"alpha-key", "keypass", vec![Certificate::from_der(b"a".to_vec())])
            .unwrap();
        ks.set_key_entry("beta", b"beta-key", "keypass", vec![Certificate::from_der(b"b".to_vec())])
            .unwrap();
        let mut settings = enabled(write(&ks, &dir));
        settings.alias = Some("beta".into());

        let prepared = prepare(&settings).unwrap();
        assert_eq!(prepared.alias.source, AliasSource::Configured);
        assert_eq!(
            pem::decode(&prepared.bundle.private_key, PemKind::PrivateKey).unwrap(),
            vec![b"beta-key".to_vec()]
        );
    }

    #[test]
    fn empty_keystore_is_settings_malformed_without_sink_call() {
        let dir = tempfile::tempdir().unwrap();
        let settings = enabled(write(&KeyStore::new(), &dir));

        match create_context(&settings, &never_called_sink()) {
            SslOutcome::Failed(Failure { stage, error }) => {
                assert_eq!(stage, Stage::ResolvingAlias);
                assert!(matches!(error, SslError::SettingsMalformed(_)));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn missing_key_is_settings_malformed_not_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = enabled(single_alias_store(&dir));
        settings.alias = Some("absent".into());

        let err = try_create_context(&settings, &never_called_sink()).unwrap_err();
        assert_eq!(err.stage, Stage::Extracting);
        assert!(matches!(err.error, SslError::SettingsMalformed(_)));
    }

    #[test]
    fn trusted_certificate_only_store_is_settings_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let mut ks = KeyStore::new();
        ks.set_certificate_entry("ca", Certificate::from_der(b"root".to_vec()))
            .unwrap();
        let settings = enabled(write(&ks, &dir));

        let err = try_create_context(&settings, &never_called_sink()).unwrap_err();
        assert!(matches!(err.error, SslError::SettingsMalformed(_)));
    }

    #[test]
    fn wrong_keystore_password_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = enabled(single_alias_store(&dir));
        settings.keystore_pass = Some("wrong".into());

        match create_context(&settings, &never_called_sink()) {
            SslOutcome::Failed(failure) => {
                assert_eq!(failure.stage, Stage::Loading);
                assert_eq!(failure.error.code(), "keystore_load_failure");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn wrong_key_password_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = enabled(single_alias_store(&dir));
        settings.key_pass = Some("wrong".into());

        let err = try_create_context(&settings, &never_called_sink()).unwrap_err();
        assert!(matches!(err.error, SslError::KeystoreLoadFailure(_)));
    }

    #[test]
    fn missing_keystore_file_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let settings = enabled(dir.path().join("absent.jks"));

        let err = try_create_context(&settings, &never_called_sink()).unwrap_err();
        assert_eq!(err.stage, Stage::Loading);
        assert!(matches!(err.error, SslError::KeystoreLoadFailure(_)));
    }

    #[test]
    fn absent_passwords_open_without_check_and_unwrap_with_empty_password() {
        let dir = tempfile::tempdir().unwrap();
        let mut ks = KeyStore::new();
        ks.set_key_entry("server", KEY, "", vec![Certificate::from_der(LEAF)])
            .unwrap();
        let settings = TestSettings {
            enabled: true,
            keystore: write(&ks, &dir),
            ..TestSettings::default()
        };

        let prepared = prepare(&settings).unwrap();
        assert_eq!(prepared.alias.source, AliasSource::Inferred);
        assert_eq!(prepared.certificates, 1);
    }

    #[test]
    fn disabled_touches_nothing() {
        let settings = TestSettings {
            enabled: false,
            keystore: PathBuf::from("/nonexistent/keystore.jks"),
            ..TestSettings::default()
        };
        let outcome = create_context(&settings, &never_called_sink());
        assert!(matches!(outcome, SslOutcome::Disabled));
    }

    #[test]
    fn empty_chain_still_reaches_sink() {
        let dir = tempfile::tempdir().unwrap();
        let mut ks = KeyStore::new();
        ks.set_key_entry("server", KEY, "keypass", Vec::new()).unwrap();
        let settings = enabled(write(&ks, &dir));
        let calls = Arc::new(Mutex::new(Vec::new()));

        let outcome = create_context(&settings, &recording_sink(calls.clone()));
        assert!(matches!(outcome, SslOutcome::Configured { certificates: 0, .. }));
        assert_eq!(calls.lock().unwrap()[0].0, "");
    }

    #[test]
    fn sink_failure_is_reported_and_scope_released() {
        let dir = tempfile::tempdir().unwrap();
        let settings = enabled(single_alias_store(&dir));
        let mut sink = MockContextSink::new();
        sink.expect_mk_ssl_context()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("unsupported key")));

        match create_context(&settings, &sink) {
            SslOutcome::Failed(failure) => {
                assert_eq!(failure.stage, Stage::Invoking);
                assert_eq!(failure.error.code(), "sink_failure");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!privileged::is_elevated());
    }

    #[test]
    fn repeated_runs_produce_identical_pem() {
        let dir = tempfile::tempdir().unwrap();
        let settings = enabled(single_alias_store(&dir));

        let first = prepare(&settings).unwrap();
        let second = prepare(&settings).unwrap();
        assert_eq!(*first.bundle.private_key, *second.bundle.private_key);
        assert_eq!(first.bundle.cert_chain, second.bundle.cert_chain);
        assert_eq!(first.alias, second.alias);
    }

    #[test]
    fn failure_display_names_stage() {
        let failure = Failure {
            stage: Stage::ResolvingAlias,
            error: SslError::SettingsMalformed("no alias".into()),
        };
        assert_eq!(
            failure.to_string(),
            "resolving_alias failed: settings malformed: no alias"
        );
    }

    const KEYTOOL_STORE: &[u8] = include_bytes!("../../../jks/testdata/server.jks");
    const KEYTOOL_KEY_PEM: &str = include_str!("../../../jks/testdata/server.key.pem");
    const KEYTOOL_CHAIN_PEM: &str = include_str!("../../../jks/testdata/server.chain.pem");

    fn keytool_store(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("keytool.jks");
        std::fs::write(&path, KEYTOOL_STORE).unwrap();
        path
    }

    #[test]
    fn keytool_keystore_gives_same_pem_as_java() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = enabled(keytool_store(&dir));
        settings.alias = Some("server".into());

        let prepared = prepare(&settings).unwrap();
        assert_eq!(prepared.certificates, 2);
        assert_eq!(prepared.bundle.private_key.as_str(), KEYTOOL_KEY_PEM);
        assert_eq!(prepared.bundle.cert_chain, KEYTOOL_CHAIN_PEM);
    }

    #[test]
    fn keytool_ec_keystore_configures_rustls() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = enabled(keytool_store(&dir));
        settings.alias = Some("server".into());
        let sink = RustlsContextSink::new();

        let outcome = create_context(&settings, &sink);
        assert!(
            matches!(outcome, SslOutcome::Configured { certificates: 2, .. }),
            "{outcome:?}"
        );
        assert!(sink.server_config().is_some());
    }
}
