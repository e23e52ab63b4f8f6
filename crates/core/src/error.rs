//! Error types for prefsdb
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Cache reads and writes are total and never produce these errors. A missing
//! key or a key stored under a different type resolves to the caller's default.
//! Only persistence (load, save, config) can fail.

use std::io;
use thiserror::Error;

/// Result type alias for prefsdb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for prefsdb
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persisted data failed an integrity check
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Persisted data uses a format this build cannot read
    #[error("Unsupported format version: found {found}, supported up to {supported}")]
    UnsupportedVersion {
        /// Version found on disk
        found: u16,
        /// Newest version this build understands
        supported: u16,
    },

    /// Configuration could not be read or is invalid
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The storage backend reported a failure
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Build a backend error from any displayable cause.
    pub fn backend(msg: impl Into<String>) -> Self {
        Error::Backend(msg.into())
    }

    /// Build a corruption error from any displayable cause.
    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    /// Build a config error from any displayable cause.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Error::InvalidConfig(msg.into())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
