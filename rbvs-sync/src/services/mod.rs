//! External collaborators of the sync engine
//!
//! The engine only depends on the three traits below. The concrete
//! implementations talk to the YouTube Data API, `yt-dlp` and VLC; tests
//! substitute in-memory fakes.

pub mod stream_resolver;
pub mod vlc_player;
pub mod youtube_client;

pub use stream_resolver::{ResolveError, YtDlpResolver};
pub use vlc_player::{PlayerError, VlcPlayer};
pub use youtube_client::{SearchError, YouTubeClient};

use async_trait::async_trait;
use rbvs_common::config::VideoSettings;

/// One search hit as returned by the search service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCandidate {
    /// Media identifier (YouTube video id)
    pub id: String,
    /// Video title text
    pub title: String,
    /// Channel / uploader text
    pub channel: String,
}

/// Text search over the media catalogue
#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Ordered candidates for `query`, best first; may be empty
    async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, SearchError>;
}

/// Turns a media identifier into a directly playable URL
#[async_trait]
pub trait StreamResolver: Send + Sync {
    async fn resolve(&self, video_id: &str) -> Result<String, ResolveError>;
}

/// External media player process
#[async_trait]
pub trait VideoPlayer: Send + Sync {
    /// Start playing `url`, replacing anything currently playing
    async fn start(
        &self,
        url: &str,
        title: &str,
        artist: &str,
        video: &VideoSettings,
    ) -> Result<(), PlayerError>;

    /// Stop playback; no-op when nothing is playing
    async fn stop(&self) -> Result<(), PlayerError>;
}
