//! YouTube Data API v3 search client

use super::{SearchCandidate, VideoSearch};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const USER_AGENT: &str = concat!("rbvs-sync/", env!("CARGO_PKG_VERSION"));

/// Candidates per query; the matcher never looks further than this
pub const MAX_RESULTS: u32 = 5;

/// YouTube "Music" category
const MUSIC_CATEGORY_ID: &str = "10";

/// Search client errors
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("YouTube API key not configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
}

/// YouTube search client
pub struct YouTubeClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(api_key: String) -> Result<Self, SearchError> {
        if api_key.trim().is_empty() {
            return Err(SearchError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SearchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            base_url: YOUTUBE_SEARCH_URL.to_string(),
        })
    }

    /// Point the client at a different endpoint (local mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl VideoSearch for YouTubeClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, SearchError> {
        let max_results = MAX_RESULTS.to_string();
        let params = [
            ("q", query),
            ("part", "id,snippet"),
            ("maxResults", max_results.as_str()),
            ("type", "video"),
            ("videoCategoryId", MUSIC_CATEGORY_ID),
            ("order", "relevance"),
            ("key", self.api_key.as_str()),
        ];

        tracing::debug!(query = %query, "Searching YouTube");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SearchError::Api(status.as_u16(), error_text));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;

        let candidates = candidates_from_response(body);
        tracing::debug!(query = %query, count = candidates.len(), "YouTube search complete");

        Ok(candidates)
    }
}

/// Flatten API items; channel/playlist hits without a video id are skipped
fn candidates_from_response(body: SearchResponse) -> Vec<SearchCandidate> {
    body.items
        .into_iter()
        .filter_map(|item| {
            Some(SearchCandidate {
                id: item.id.video_id?,
                title: item.snippet.title,
                channel: item.snippet.channel_title,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_key() {
        assert!(matches!(
            YouTubeClient::new("  ".to_string()),
            Err(SearchError::MissingApiKey)
        ));
        assert!(YouTubeClient::new("key".to_string()).is_ok());
    }

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "kind": "youtube#searchListResponse",
            "items": [
                {
                    "id": {"kind": "youtube#video", "videoId": "fJ9rUzIMcZQ"},
                    "snippet": {"title": "Queen – Bohemian Rhapsody (Official Video)", "channelTitle": "Queen Official"}
                },
                {
                    "id": {"kind": "youtube#channel", "channelId": "UC123"},
                    "snippet": {"title": "Queen", "channelTitle": "Queen"}
                }
            ]
        }"#;

        let body: SearchResponse = serde_json::from_str(json).unwrap();
        let candidates = candidates_from_response(body);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "fJ9rUzIMcZQ");
        assert_eq!(candidates[0].channel, "Queen Official");
    }

    #[test]
    fn test_parse_empty_response() {
        let body: SearchResponse = serde_json::from_str(r#"{"kind": "x"}"#).unwrap();
        assert!(candidates_from_response(body).is_empty());
    }
}
