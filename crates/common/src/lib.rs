//! Error taxonomy and PEM encoding shared across `ssl-loader` crates.

pub mod error;
pub mod pem;

pub use error::SslError;
pub use pem::{PemError, PemKind};
