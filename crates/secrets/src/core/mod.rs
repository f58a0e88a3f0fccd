//! Core types, errors, and primitives

mod error;

pub use error::{
    BundleError, CryptoError, Result, RotationError, SecretsError, StorageError,
};
