//! Settings file → running engine
//!
//! Loads a TOML settings file from disk and checks the values end up
//! steering the orchestrator and the yt-dlp format selection.

mod helpers;

use helpers::*;
use rbvs_common::config::{SettingsStore, TomlSettingsStore, VideoQuality};
use rbvs_sync::services::YtDlpResolver;

const SETTINGS: &str = r#"
[sync]
sync_to_start = false

[video]
preferred_quality = "480p"
force_best_quality = false
"#;

#[tokio::test]
async fn test_loaded_settings_drive_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rbvs-sync.toml");
    std::fs::write(&path, SETTINGS).unwrap();

    let settings = TomlSettingsStore::new(&path).load().unwrap();
    assert!(!settings.sync.sync_to_start);
    assert!(settings.sync.preload_videos);
    assert_eq!(settings.video.preferred_quality, VideoQuality::P480);

    let resolver = YtDlpResolver::new(&settings.video);
    assert_eq!(resolver.format(), "best[height<=480]/best");

    let mut h = Harness::with_defaults();
    h.orchestrator
        .apply_settings(settings.sync.clone(), settings.video.clone())
        .unwrap();
    assert_eq!(h.orchestrator.sync_settings(), &settings.sync);
    assert_eq!(h.orchestrator.video_settings(), &settings.video);

    // Sync disabled: the video starts as soon as it is found
    h.search.respond(
        "Toto Africa official music video",
        vec![candidate("africa", "Toto - Africa", "TotoVEVO")],
    );
    h.feed_song("Toto", "Africa").await;
    assert_eq!(h.player.starts().len(), 1);
    assert!(h.orchestrator.pending().is_none());
}
