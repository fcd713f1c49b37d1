//! Error types for rbvs-sync
//!
//! Pipeline failures (search, resolve, player) never leave the orchestrator;
//! they are logged and reported as events. What reaches callers through
//! this type are listener socket problems.

use thiserror::Error;

/// Main error type for rbvs-sync
#[derive(Error, Debug)]
pub enum Error {
    /// Listener socket could not be set up (fatal at startup)
    #[error("Failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Socket I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using rbvs-sync Error
pub type Result<T> = std::result::Result<T, Error>;
