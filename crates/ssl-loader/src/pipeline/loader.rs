//! Opens the keystore file.

use std::io;
use std::path::Path;

use common::SslError;
use jks::{KeyStore, KeystoreError};
use tracing::debug;

/// Read and unlock the keystore at `path`.
///
/// # Errors
///
/// Returns [`SslError::PrivilegeDenied`] when the file exists but may not be
/// read, and [`SslError::KeystoreLoadFailure`] for a missing file, a wrong
/// password, or a corrupt container.
pub fn load_keystore(path: &Path, password: Option<&str>) -> Result<KeyStore, SslError> {
    let ks = KeyStore::load(path, password).map_err(|e| classify(path, e))?;
    debug!(path = %path.display(), entries = ks.len(), "keystore opened");
    Ok(ks)
}

fn classify(path: &Path, err: KeystoreError) -> SslError {
    match err {
        KeystoreError::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            SslError::PrivilegeDenied {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
        other => SslError::KeystoreLoadFailure(format!("{}: {other}", path.display())),
    }
}
