#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the linear algebra module.
pub mod error;

pub mod qr;

pub use crate::error::LinalgError;
