//! Elevated scope around the hand-off to the context sink.
//!
//! The process has no security manager to ask, so elevation is a thread-local
//! flag held by an RAII guard. The scope is not reentrant and is always left
//! before an error or a sink panic propagates.

use std::any::Any;
use std::cell::Cell;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use common::SslError;
use tracing::debug;

use super::encode::PemBundle;
use crate::sink::ContextSink;

thread_local! {
    static ELEVATED: Cell<bool> = const { Cell::new(false) };
}

/// Held while the current thread runs elevated.
struct Elevation {
    // Tied to the thread that set the flag.
    _not_send: PhantomData<*const ()>,
}

impl Elevation {
    fn acquire() -> Option<Self> {
        let was_elevated = ELEVATED.with(|flag| flag.replace(true));
        (!was_elevated).then(|| Self {
            _not_send: PhantomData,
        })
    }
}

impl Drop for Elevation {
    fn drop(&mut self) {
        ELEVATED.with(|flag| flag.set(false));
        debug!("left privileged scope");
    }
}

/// Whether the current thread is inside [`run_privileged`].
pub fn is_elevated() -> bool {
    ELEVATED.with(Cell::get)
}

/// Run `action` with elevated capability and revoke it on every exit path.
///
/// # Errors
///
/// Returns [`SslError::PrivilegeDenied`] naming `keystore` when called from
/// inside another privileged scope, otherwise whatever `action` returns.
pub fn run_privileged<T>(
    keystore: &Path,
    action: impl FnOnce() -> Result<T, SslError>,
) -> Result<T, SslError> {
    let _elevation = Elevation::acquire().ok_or_else(|| SslError::PrivilegeDenied {
        path: keystore.to_path_buf(),
        reason: "privileged scope is already active on this thread".into(),
    })?;
    debug!("entered privileged scope");
    action()
}

/// Hand `bundle` to `sink` inside the privileged scope.
///
/// A sink error or panic becomes [`SslError::SinkFailure`].
pub fn invoke_sink<C>(sink: &C, keystore: &Path, bundle: &PemBundle) -> Result<(), SslError>
where
    C: ContextSink + ?Sized,
{
    run_privileged(keystore, || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            sink.mk_ssl_context(&bundle.cert_chain, &bundle.private_key)
        }));
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SslError::SinkFailure(format!("{e:#}"))),
            Err(payload) => Err(SslError::SinkFailure(format!(
                "context sink panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}
