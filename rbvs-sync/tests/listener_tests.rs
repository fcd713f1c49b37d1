//! Listener integration tests over loopback UDP

mod helpers;

use helpers::*;
use rbvs_common::config::{SyncSettings, VideoSettings};
use rbvs_common::events::{EventBus, SyncEvent};
use rbvs_sync::sync::GameState;
use rbvs_sync::{Listener, SyncOrchestrator};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

async fn next_event(rx: &mut broadcast::Receiver<SyncEvent>) -> SyncEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event within timeout")
        .expect("bus open")
}

#[tokio::test]
async fn test_listener_feeds_orchestrator_until_cancelled() {
    let search = FakeSearch::new();
    search.respond(
        "Queen Bohemian Rhapsody official music video",
        vec![candidate("queen-id", "Queen - Bohemian Rhapsody", "Queen Official")],
    );
    let player = FakePlayer::new();
    let event_bus = EventBus::new(64);
    let mut rx = event_bus.subscribe();

    let mut orchestrator = SyncOrchestrator::new(
        search.clone(),
        FakeResolver::new(),
        player.clone(),
        SyncSettings::default(),
        VideoSettings::default(),
        event_bus,
    );

    let listener = Listener::bind(0).unwrap();
    let port = listener.port();
    let shutdown = CancellationToken::new();

    let task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            listener.run(&mut orchestrator, shutdown).await;
            orchestrator
        }
    });

    match next_event(&mut rx).await {
        SyncEvent::ListenerStarted { port: started, .. } => assert_eq!(started, port),
        other => panic!("unexpected event {:?}", other),
    }

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = ("127.0.0.1", port);

    sender.send_to(&packet(TYPE_ALIVE, "build 42"), target).await.unwrap();
    assert!(matches!(
        next_event(&mut rx).await,
        SyncEvent::GameConnected { ref build, .. } if build == "build 42"
    ));

    // Garbage is dropped without disturbing the loop
    sender.send_to(b"RB3", target).await.unwrap();
    sender.send_to(b"XXXXXXXXXXXX", target).await.unwrap();

    sender.send_to(&packet(TYPE_SONG_ARTIST, "Queen"), target).await.unwrap();
    sender
        .send_to(&packet(TYPE_SONG_NAME, "Bohemian Rhapsody"), target)
        .await
        .unwrap();
    sender.send_to(&packet(TYPE_STATE, "1"), target).await.unwrap();

    let mut types = Vec::new();
    while !types.contains(&"PlaybackStarted") {
        types.push(next_event(&mut rx).await.event_type());
    }
    assert_eq!(
        types,
        vec![
            "ArtistReceived",
            "SongNameReceived",
            "VideoReady",
            "SongStarting",
            "PlaybackStarted",
        ]
    );

    shutdown.cancel();
    let orchestrator = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("listener stops after cancel")
        .unwrap();

    assert_eq!(orchestrator.state(), GameState::InGame);
    assert_eq!(player.starts().len(), 1);
    assert_eq!(player.starts()[0].url, stream_url("queen-id"));
}

#[tokio::test]
async fn test_cancel_before_any_packet() {
    let mut orchestrator = SyncOrchestrator::new(
        FakeSearch::new(),
        FakeResolver::new(),
        FakePlayer::new(),
        SyncSettings::default(),
        VideoSettings::default(),
        EventBus::new(8),
    );

    let listener = Listener::bind(0).unwrap();
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    tokio::time::timeout(Duration::from_secs(1), listener.run(&mut orchestrator, shutdown))
        .await
        .expect("cancelled listener returns immediately");
}

#[tokio::test]
async fn test_bind_conflict_is_reported() {
    // A plain socket without address reuse blocks the port
    let blocker = std::net::UdpSocket::bind("0.0.0.0:0").unwrap();
    let port = blocker.local_addr().unwrap().port();

    match Listener::bind(port) {
        Err(rbvs_sync::Error::Bind { port: failed, .. }) => assert_eq!(failed, port),
        // Some platforms let SO_REUSEADDR share a UDP port regardless
        Ok(_) => {}
        Err(other) => panic!("unexpected error {:?}", other),
    }
}
