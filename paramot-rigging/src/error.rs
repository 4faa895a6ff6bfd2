//! Common error types for the rigging engine

use thiserror::Error;

/// Common result type for rigging operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that cross the engine boundary
///
/// Missing or partial field data is never an error: the engines degrade to
/// empty output instead. These variants cover caller misuse and the
/// configuration layer only.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration could not be deserialized
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid call shape (non-finite aspect ratio, zero reference strength, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
