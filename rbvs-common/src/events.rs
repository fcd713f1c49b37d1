//! Event types and EventBus for the RBVS sync engine
//!
//! The sync engine reports everything a front end may want to show (song
//! metadata, state transitions, playback outcomes) as [`SyncEvent`]s on an
//! [`EventBus`]. Subscribers are optional: the engine never waits on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by the sync engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncEvent {
    /// UDP listener bound and receiving
    ListenerStarted {
        port: u16,
        timestamp: DateTime<Utc>,
    },

    /// No packets received for a while
    Heartbeat {
        idle_seconds: u64,
        timestamp: DateTime<Utc>,
    },

    /// Game mod announced itself (Alive event)
    GameConnected {
        build: String,
        timestamp: DateTime<Utc>,
    },

    /// Song title fragment received
    SongNameReceived {
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// Song artist fragment received
    ArtistReceived {
        artist: String,
        timestamp: DateTime<Utc>,
    },

    /// Game moved from the menus into a song
    SongStarting {
        timestamp: DateTime<Utc>,
    },

    /// Game moved from a song back to the menus
    ReturnedToMenu {
        timestamp: DateTime<Utc>,
    },

    /// Video resolved and waiting for the song to start
    VideoReady {
        video_id: String,
        artist: String,
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// Player was started for a video
    PlaybackStarted {
        video_id: String,
        artist: String,
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// Playback skipped because the video already played this session
    AlreadyPlayed {
        video_id: String,
        artist: String,
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// Search produced no usable video
    NoMatch {
        artist: String,
        title: String,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Video found but no playable stream could be resolved
    ResolveFailed {
        video_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// External player could not be started
    PlayerFailed {
        video_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// External player stopped on request
    PlayerStopped {
        timestamp: DateTime<Utc>,
    },
}

impl SyncEvent {
    /// Short machine-readable name, matching the serde tag
    pub fn event_type(&self) -> &'static str {
        match self {
            SyncEvent::ListenerStarted { .. } => "ListenerStarted",
            SyncEvent::Heartbeat { .. } => "Heartbeat",
            SyncEvent::GameConnected { .. } => "GameConnected",
            SyncEvent::SongNameReceived { .. } => "SongNameReceived",
            SyncEvent::ArtistReceived { .. } => "ArtistReceived",
            SyncEvent::SongStarting { .. } => "SongStarting",
            SyncEvent::ReturnedToMenu { .. } => "ReturnedToMenu",
            SyncEvent::VideoReady { .. } => "VideoReady",
            SyncEvent::PlaybackStarted { .. } => "PlaybackStarted",
            SyncEvent::AlreadyPlayed { .. } => "AlreadyPlayed",
            SyncEvent::NoMatch { .. } => "NoMatch",
            SyncEvent::ResolveFailed { .. } => "ResolveFailed",
            SyncEvent::PlayerFailed { .. } => "PlayerFailed",
            SyncEvent::PlayerStopped { .. } => "PlayerStopped",
        }
    }
}

/// Central event distribution bus
///
/// Uses `tokio::broadcast` internally:
/// - Non-blocking publish (slow subscribers don't block the listener loop)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use rbvs_common::events::{EventBus, SyncEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(SyncEvent::SongStarting { timestamp: chrono::Utc::now() });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "SongStarting");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: SyncEvent) -> Result<usize, broadcast::error::SendError<SyncEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
