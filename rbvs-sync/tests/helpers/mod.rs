//! Test helpers for rbvs-sync integration tests
//!
//! In-memory fakes for the search, resolve and player collaborators, plus
//! packet builders. The fakes record every call so tests can assert on
//! exactly what the orchestrator asked for.

#![allow(dead_code)]

use async_trait::async_trait;
use rbvs_common::config::{SyncSettings, VideoSettings};
use rbvs_common::events::{EventBus, SyncEvent};
use rbvs_sync::protocol::{self, Event, EVENTS_MAGIC};
use rbvs_sync::services::{
    PlayerError, ResolveError, SearchCandidate, SearchError, StreamResolver, VideoPlayer,
    VideoSearch,
};
use rbvs_sync::SyncOrchestrator;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

pub const TYPE_ALIVE: u8 = 0;
pub const TYPE_STATE: u8 = 1;
pub const TYPE_SONG_NAME: u8 = 2;
pub const TYPE_SONG_ARTIST: u8 = 3;

/// Build a well-formed event datagram
pub fn packet(event_type: u8, payload: &str) -> Vec<u8> {
    let mut bytes = EVENTS_MAGIC.to_be_bytes().to_vec();
    bytes.extend_from_slice(&[0, event_type, payload.len() as u8, 0]);
    bytes.extend_from_slice(payload.as_bytes());
    bytes
}

/// Decoded event, going through the real decoder
pub fn event(event_type: u8, payload: &str) -> Event {
    protocol::decode(&packet(event_type, payload)).expect("test packet decodes")
}

pub fn candidate(id: &str, title: &str, channel: &str) -> SearchCandidate {
    SearchCandidate {
        id: id.to_string(),
        title: title.to_string(),
        channel: channel.to_string(),
    }
}

/// Search fake: canned results per exact query, empty otherwise
#[derive(Default)]
pub struct FakeSearch {
    results: Mutex<HashMap<String, Vec<SearchCandidate>>>,
    queries: Mutex<Vec<String>>,
    fail: Mutex<bool>,
}

impl FakeSearch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, query: &str, candidates: Vec<SearchCandidate>) {
        self.results
            .lock()
            .unwrap()
            .insert(query.to_string(), candidates);
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl VideoSearch for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());

        if *self.fail.lock().unwrap() {
            return Err(SearchError::Network("connection refused".to_string()));
        }

        Ok(self
            .results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

/// Resolver fake: `https://stream.test/<id>` unless the id is marked failing
#[derive(Default)]
pub struct FakeResolver {
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, video_id: &str) {
        self.failing.lock().unwrap().insert(video_id.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn stream_url(video_id: &str) -> String {
    format!("https://stream.test/{}", video_id)
}

#[async_trait]
impl StreamResolver for FakeResolver {
    async fn resolve(&self, video_id: &str) -> Result<String, ResolveError> {
        self.calls.lock().unwrap().push(video_id.to_string());

        if self.failing.lock().unwrap().contains(video_id) {
            return Err(ResolveError::NoStream(video_id.to_string()));
        }
        Ok(stream_url(video_id))
    }
}

/// One recorded `start` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartCall {
    pub url: String,
    pub title: String,
    pub artist: String,
}

/// Player fake
#[derive(Default)]
pub struct FakePlayer {
    starts: Mutex<Vec<StartCall>>,
    stops: Mutex<usize>,
    fail: Mutex<bool>,
}

impl FakePlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn starts(&self) -> Vec<StartCall> {
        self.starts.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        *self.stops.lock().unwrap()
    }
}

#[async_trait]
impl VideoPlayer for FakePlayer {
    async fn start(
        &self,
        url: &str,
        title: &str,
        artist: &str,
        _video: &VideoSettings,
    ) -> Result<(), PlayerError> {
        if *self.fail.lock().unwrap() {
            return Err(PlayerError::Spawn("vlc: not found".to_string()));
        }

        self.starts.lock().unwrap().push(StartCall {
            url: url.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), PlayerError> {
        *self.stops.lock().unwrap() += 1;
        Ok(())
    }
}

/// Orchestrator wired to fakes, plus the fakes and an event subscription
pub struct Harness {
    pub orchestrator: SyncOrchestrator,
    pub search: Arc<FakeSearch>,
    pub resolver: Arc<FakeResolver>,
    pub player: Arc<FakePlayer>,
    pub events: broadcast::Receiver<SyncEvent>,
}

impl Harness {
    pub fn new(sync: SyncSettings) -> Self {
        let search = FakeSearch::new();
        let resolver = FakeResolver::new();
        let player = FakePlayer::new();
        let event_bus = EventBus::new(256);
        let events = event_bus.subscribe();

        let orchestrator = SyncOrchestrator::new(
            search.clone(),
            resolver.clone(),
            player.clone(),
            sync,
            VideoSettings::default(),
            event_bus,
        );

        Self {
            orchestrator,
            search,
            resolver,
            player,
            events,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SyncSettings::default())
    }

    pub async fn feed(&mut self, event_type: u8, payload: &str) {
        self.orchestrator.handle_event(event(event_type, payload)).await;
    }

    /// Artist then title, the order the game sends them
    pub async fn feed_song(&mut self, artist: &str, title: &str) {
        self.feed(TYPE_SONG_ARTIST, artist).await;
        self.feed(TYPE_SONG_NAME, title).await;
    }

    /// Event type names received so far
    pub fn drain_event_types(&mut self) -> Vec<&'static str> {
        let mut types = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            types.push(event.event_type());
        }
        types
    }
}
