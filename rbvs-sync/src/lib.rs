//! # RBVS Sync Library (rbvs-sync)
//!
//! Listens for RB3Enhanced event broadcasts and plays a matching music
//! video in an external player, started in sync with the song.
//!
//! **Pipeline:** UDP datagram → [`protocol::decode`] → [`SyncOrchestrator`]
//! → search / resolve / player collaborators ([`services`]).

pub mod error;
pub mod listener;
pub mod protocol;
pub mod services;
pub mod sync;

pub use error::{Error, Result};
pub use listener::Listener;
pub use sync::SyncOrchestrator;
