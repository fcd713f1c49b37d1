//! Common error types for RBVS

use thiserror::Error;

/// Common result type for RBVS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the RBVS crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings file exists but is not valid TOML for the schema
    #[error("Settings parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Invalid user input or setting value
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
