//! # RBVS Common Library
//!
//! Shared code for the Rock Band video sync crates:
//! - Error type
//! - Settings schema and TOML settings store
//! - Event types (SyncEvent enum) and EventBus
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
