//! Sync engine: game state, song identity, matching and playback timing

pub mod accumulator;
pub mod matcher;
pub mod orchestrator;
pub mod played;

pub use accumulator::{SongAccumulator, SongIdentity};
pub use matcher::{NormalizedSong, VideoMatch, VideoMatcher};
pub use orchestrator::{GameState, PendingVideo, SyncOrchestrator};
pub use played::{PlayedSet, PLAYED_CAPACITY};
