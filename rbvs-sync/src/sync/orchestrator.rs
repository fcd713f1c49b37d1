//! Sync orchestrator
//!
//! Owns every piece of mutable sync state (game state, song accumulator,
//! pending video, search cache, played set) and drives the external
//! collaborators. The listener hands it one decoded event at a time and
//! awaits it fully before reading the next datagram, so no locking is
//! needed and events are processed strictly in arrival order.
//!
//! **State machine:**
//! ```text
//! Menu ──State(1)──> InGame     SongStarting, start pending video
//! InGame ──State(0)──> Menu     ReturnedToMenu, stop player, drop pending
//! anything else                 value stored, no side effect
//! ```

use crate::protocol::{self, Event, EventKind};
use crate::services::{StreamResolver, VideoPlayer, VideoSearch};
use crate::sync::accumulator::{SongAccumulator, SongIdentity};
use crate::sync::matcher::VideoMatcher;
use crate::sync::played::PlayedSet;
use rbvs_common::config::{SyncSettings, VideoSettings};
use rbvs_common::events::{EventBus, SyncEvent};
use rbvs_common::time;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Coarse game state as reported by State events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    /// State value 0
    Menu,
    /// State value 1
    InGame,
    /// Any other value; stored but never triggers a transition
    Other(u32),
}

impl GameState {
    pub fn from_value(value: u32) -> Self {
        match value {
            0 => GameState::Menu,
            1 => GameState::InGame,
            other => GameState::Other(other),
        }
    }

    pub fn value(&self) -> u32 {
        match self {
            GameState::Menu => 0,
            GameState::InGame => 1,
            GameState::Other(value) => *value,
        }
    }
}

/// A resolved video waiting for the song to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVideo {
    pub stream_url: String,
    pub video_id: String,
    pub artist: String,
    pub title: String,
}

/// Single owner of the sync engine state
pub struct SyncOrchestrator {
    state: GameState,
    accumulator: SongAccumulator,
    pending: Option<PendingVideo>,
    matcher: VideoMatcher,
    played: PlayedSet,
    sync: SyncSettings,
    video: VideoSettings,
    search: Arc<dyn VideoSearch>,
    resolver: Arc<dyn StreamResolver>,
    player: Arc<dyn VideoPlayer>,
    event_bus: EventBus,
}

impl SyncOrchestrator {
    pub fn new(
        search: Arc<dyn VideoSearch>,
        resolver: Arc<dyn StreamResolver>,
        player: Arc<dyn VideoPlayer>,
        sync: SyncSettings,
        video: VideoSettings,
        event_bus: EventBus,
    ) -> Self {
        Self {
            state: GameState::Menu,
            accumulator: SongAccumulator::new(),
            pending: None,
            matcher: VideoMatcher::new(),
            played: PlayedSet::new(),
            sync,
            video,
            search,
            resolver,
            player,
            event_bus,
        }
    }

    /// Process one decoded event to completion
    ///
    /// Never fails: every pipeline problem is logged and reported on the
    /// event bus.
    pub async fn handle_event(&mut self, event: Event) {
        match event.kind {
            EventKind::Alive => {
                info!(build = %event.payload, "Game connected");
                self.event_bus.emit_lossy(SyncEvent::GameConnected {
                    build: event.payload,
                    timestamp: time::now(),
                });
            }
            EventKind::State => {
                self.handle_state(protocol::state_value(&event.payload)).await;
            }
            EventKind::SongName => {
                info!(title = %event.payload, "Song name");
                self.accumulator.set_title(event.payload.clone());
                self.event_bus.emit_lossy(SyncEvent::SongNameReceived {
                    title: event.payload,
                    timestamp: time::now(),
                });
            }
            EventKind::SongArtist => {
                info!(artist = %event.payload, "Artist");
                self.accumulator.set_artist(event.payload.clone());
                self.event_bus.emit_lossy(SyncEvent::ArtistReceived {
                    artist: event.payload,
                    timestamp: time::now(),
                });
            }
            EventKind::Unknown(code) => {
                debug!(event_type = code, payload = %event.payload, "Ignoring unknown event type");
            }
        }

        self.process_complete_song().await;
    }

    /// Apply a State event value
    pub async fn handle_state(&mut self, value: u32) {
        let previous = self.state;
        let next = GameState::from_value(value);
        self.state = next;

        match (previous, next) {
            (GameState::Menu, GameState::InGame) => {
                info!("Song starting");
                self.event_bus.emit_lossy(SyncEvent::SongStarting {
                    timestamp: time::now(),
                });

                if self.sync.sync_to_start && self.pending.is_some() {
                    self.start_pending_video().await;
                }
            }
            (GameState::InGame, GameState::Menu) => {
                info!("Returned to menu");
                self.event_bus.emit_lossy(SyncEvent::ReturnedToMenu {
                    timestamp: time::now(),
                });

                if self.sync.auto_stop_on_menu {
                    self.stop_player().await;
                }

                if let Some(pending) = self.pending.take() {
                    debug!(video_id = %pending.video_id, "Discarded pending video");
                }
            }
            _ => {
                debug!(previous = previous.value(), state = value, "State stored");
            }
        }
    }

    /// Run the match pipeline once both song fragments are present
    async fn process_complete_song(&mut self) {
        let Some(song) = self.accumulator.take_complete() else {
            return;
        };

        if self.sync.sync_to_start && self.sync.preload_videos {
            self.prepare_video(song).await;
        } else {
            self.play_immediately(song).await;
        }
    }

    /// Match and resolve now, hold the result until the song starts
    ///
    /// Replaces any earlier pending video without playing it. When the
    /// game is already in a song (metadata arrived late) playback starts
    /// straight away.
    pub async fn prepare_video(&mut self, song: SongIdentity) {
        let Some((video_id, stream_url)) = self.match_and_resolve(&song).await else {
            return;
        };

        info!(video_id = %video_id, artist = %song.artist, title = %song.title, "Video ready, waiting for song start");
        self.event_bus.emit_lossy(SyncEvent::VideoReady {
            video_id: video_id.clone(),
            artist: song.artist.clone(),
            title: song.title.clone(),
            timestamp: time::now(),
        });

        self.pending = Some(PendingVideo {
            stream_url,
            video_id,
            artist: song.artist,
            title: song.title,
        });

        if self.state == GameState::InGame {
            debug!("Song already started, playing pending video now");
            self.start_pending_video().await;
        }
    }

    /// Match, resolve and play without involving the pending slot
    pub async fn play_immediately(&mut self, song: SongIdentity) {
        let Some((video_id, stream_url)) = self.match_and_resolve(&song).await else {
            return;
        };

        self.play(PendingVideo {
            stream_url,
            video_id,
            artist: song.artist,
            title: song.title,
        })
        .await;
    }

    /// Start the pending video, honoring the configured start delay
    ///
    /// The pending slot is empty afterwards whatever the outcome.
    pub async fn start_pending_video(&mut self) {
        if self.pending.is_none() {
            return;
        }

        let delay_seconds = self.sync.start_delay_seconds;
        if let Some(delay) = time::delay_from_seconds(delay_seconds) {
            info!("Waiting {:.1}s before starting video", delay_seconds);
            tokio::time::sleep(delay).await;
        } else if delay_seconds < 0.0 {
            info!("Start delay {:.1}s requested (early start)", delay_seconds);
        }

        if let Some(pending) = self.pending.take() {
            self.play(pending).await;
        }
    }

    /// Stop the external player
    pub async fn stop_player(&self) {
        match self.player.stop().await {
            Ok(()) => {
                self.event_bus.emit_lossy(SyncEvent::PlayerStopped {
                    timestamp: time::now(),
                });
            }
            Err(e) => warn!("Failed to stop player: {}", e),
        }
    }

    /// Replace the sync and video settings
    ///
    /// Out-of-range settings are rejected and the current ones kept.
    pub fn apply_settings(
        &mut self,
        sync: SyncSettings,
        video: VideoSettings,
    ) -> rbvs_common::Result<()> {
        sync.validate()?;

        info!(
            sync_to_start = sync.sync_to_start,
            preload_videos = sync.preload_videos,
            auto_stop_on_menu = sync.auto_stop_on_menu,
            start_delay_seconds = sync.start_delay_seconds,
            "Settings updated"
        );
        self.sync = sync;
        self.video = video;
        Ok(())
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn pending(&self) -> Option<&PendingVideo> {
        self.pending.as_ref()
    }

    pub fn accumulator(&self) -> &SongAccumulator {
        &self.accumulator
    }

    pub fn played(&self) -> &PlayedSet {
        &self.played
    }

    pub fn matcher(&self) -> &VideoMatcher {
        &self.matcher
    }

    pub fn sync_settings(&self) -> &SyncSettings {
        &self.sync
    }

    pub fn video_settings(&self) -> &VideoSettings {
        &self.video
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Search and resolve a song, reporting failures on the event bus
    async fn match_and_resolve(&mut self, song: &SongIdentity) -> Option<(String, String)> {
        info!(artist = %song.artist, title = %song.title, "Searching for video");

        let found = self
            .matcher
            .find_video(self.search.as_ref(), &song.artist, &song.title)
            .await;

        let video_id = match found {
            Ok(Some(found)) => found.video_id,
            Ok(None) => {
                warn!(artist = %song.artist, title = %song.title, "No video found");
                self.emit_no_match(song, None);
                return None;
            }
            Err(e) => {
                warn!(artist = %song.artist, title = %song.title, "Video search failed: {}", e);
                self.emit_no_match(song, Some(e.to_string()));
                return None;
            }
        };

        match self.resolver.resolve(&video_id).await {
            Ok(stream_url) => Some((video_id, stream_url)),
            Err(e) => {
                warn!(video_id = %video_id, "Could not get stream URL: {}", e);
                self.event_bus.emit_lossy(SyncEvent::ResolveFailed {
                    video_id,
                    reason: e.to_string(),
                    timestamp: time::now(),
                });
                None
            }
        }
    }

    /// Hand a resolved video to the player unless it already played
    async fn play(&mut self, video: PendingVideo) {
        if self.played.contains(&video.video_id) {
            info!(video_id = %video.video_id, "Video already played");
            self.event_bus.emit_lossy(SyncEvent::AlreadyPlayed {
                video_id: video.video_id,
                artist: video.artist,
                title: video.title,
                timestamp: time::now(),
            });
            return;
        }

        match self
            .player
            .start(&video.stream_url, &video.title, &video.artist, &self.video)
            .await
        {
            Ok(()) => {
                info!(video_id = %video.video_id, artist = %video.artist, title = %video.title, "Playback started");
                if let Some(evicted) = self.played.insert(video.video_id.clone()) {
                    debug!(video_id = %evicted, "Evicted from played set");
                }
                self.event_bus.emit_lossy(SyncEvent::PlaybackStarted {
                    video_id: video.video_id,
                    artist: video.artist,
                    title: video.title,
                    timestamp: time::now(),
                });
            }
            Err(e) => {
                warn!(video_id = %video.video_id, "Failed to start player: {}", e);
                self.event_bus.emit_lossy(SyncEvent::PlayerFailed {
                    video_id: video.video_id,
                    reason: e.to_string(),
                    timestamp: time::now(),
                });
            }
        }
    }

    fn emit_no_match(&self, song: &SongIdentity, reason: Option<String>) {
        self.event_bus.emit_lossy(SyncEvent::NoMatch {
            artist: song.artist.clone(),
            title: song.title.clone(),
            reason,
            timestamp: time::now(),
        });
    }
}
