//! Chooses which keystore alias to read the key from.

use common::SslError;
use jks::KeyStore;
use tracing::info;

/// Where the resolved alias came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasSource {
    /// Taken verbatim from the settings.
    Configured,
    /// The first alias the keystore enumerates.
    Inferred,
}

/// Alias chosen for key and chain extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAlias {
    /// Alias name.
    pub name: String,
    /// How it was chosen.
    pub source: AliasSource,
}

/// Resolve the alias to use.
///
/// A configured alias is used as-is; whether it exists is left to extraction.
/// Otherwise the lexically first alias of the keystore is chosen and logged.
///
/// # Errors
///
/// Returns [`SslError::SettingsMalformed`] when no alias is configured and the
/// keystore is empty.
pub fn resolve_alias(ks: &KeyStore, configured: Option<&str>) -> Result<ResolvedAlias, SslError> {
    if let Some(alias) = configured {
        return Ok(ResolvedAlias {
            name: alias.to_owned(),
            source: AliasSource::Configured,
        });
    }

    let inferred = ks.aliases().next().ok_or_else(|| {
        SslError::SettingsMalformed("no alias found in keystore, therefore no key".into())
    })?;
    info!(
        alias = inferred,
        "ssl key_alias not configured, took first alias in keystore"
    );
    Ok(ResolvedAlias {
        name: inferred.to_owned(),
        source: AliasSource::Inferred,
    })
}
