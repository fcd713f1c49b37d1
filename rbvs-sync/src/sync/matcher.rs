//! Video matching: song text → best video id
//!
//! Matching is a fuzzy text problem, so the heuristics lean towards
//! precision:
//! 1. Normalize artist and title (drop parentheticals, live/remix suffixes
//!    and featured artists).
//! 2. Answer from the search cache when the normalized pair was seen before.
//! 3. Try progressively less specific queries, stopping at the first query
//!    that returns anything.
//! 4. Within that result list prefer a video whose title names both song
//!    and artist, or whose channel looks official; otherwise take the first.

use crate::services::{SearchCandidate, SearchError, VideoSearch};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashMap;

/// Only the top results of a query are considered
pub const MAX_CANDIDATES: usize = 5;

/// Channel name fragments that mark an official upload
const OFFICIAL_CHANNEL_TERMS: [&str; 3] = ["official", "records", "music"];

static PARENTHESIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\([^)]*\)\s*").expect("valid parenthesized pattern"));

static VERSION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*-\s*(Live|Acoustic|Demo|Remix).*").expect("valid suffix pattern")
});

static FEATURING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:feat\.|ft\.|featuring)\s+").expect("valid featuring pattern")
});

/// Artist/title after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSong {
    pub artist: String,
    pub title: String,
}

impl NormalizedSong {
    pub fn new(artist: &str, title: &str) -> Self {
        let title = PARENTHESIZED.replace_all(title, "");
        let title = VERSION_SUFFIX.replace_all(&title, "");

        let artist = FEATURING.split(artist).next().unwrap_or(artist);

        Self {
            artist: artist.trim().to_string(),
            title: title.trim().to_string(),
        }
    }

    /// Search cache key: lowercase `"artist - title"`
    pub fn cache_key(&self) -> String {
        format!("{} - {}", self.artist.to_lowercase(), self.title.to_lowercase())
    }

    /// Queries to try, most specific first
    pub fn query_plan(&self) -> Vec<String> {
        let terms = format!("{} {}", self.artist, self.title);
        vec![
            format!("{} official music video", terms),
            format!("{} music video", terms),
            format!("{} official", terms),
            terms,
        ]
    }

    /// Title names both song and artist, or the channel looks official
    pub fn is_preferred(&self, candidate: &SearchCandidate) -> bool {
        let video_title = candidate.title.to_lowercase();
        let channel = candidate.channel.to_lowercase();
        let artist = self.artist.to_lowercase();
        let title = self.title.to_lowercase();

        let is_official = OFFICIAL_CHANNEL_TERMS
            .iter()
            .any(|term| channel.contains(term))
            || channel.contains(&artist);
        let names_both = video_title.contains(&title) && video_title.contains(&artist);

        names_both || is_official
    }
}

/// Pick the best candidate of one query's results
///
/// Returns `None` only for an empty list.
pub fn select_candidate<'a>(
    song: &NormalizedSong,
    candidates: &'a [SearchCandidate],
) -> Option<&'a SearchCandidate> {
    let top = &candidates[..candidates.len().min(MAX_CANDIDATES)];
    top.iter()
        .find(|candidate| song.is_preferred(candidate))
        .or_else(|| top.first())
}

/// Outcome of a successful match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMatch {
    pub video_id: String,
    /// Answered from the search cache without querying
    pub from_cache: bool,
}

/// Search-and-select with a process-lifetime cache
#[derive(Debug, Default)]
pub struct VideoMatcher {
    cache: HashMap<String, String>,
}

impl VideoMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the best video for a song
    ///
    /// `Ok(None)` means every query came back empty (NoMatch). A search
    /// failure aborts the remaining queries and nothing is cached.
    pub async fn find_video(
        &mut self,
        search: &dyn VideoSearch,
        artist: &str,
        title: &str,
    ) -> Result<Option<VideoMatch>, SearchError> {
        let song = NormalizedSong::new(artist, title);
        let key = song.cache_key();

        if let Some(video_id) = self.cache.get(&key) {
            tracing::info!(key = %key, video_id = %video_id, "Using cached search result");
            return Ok(Some(VideoMatch {
                video_id: video_id.clone(),
                from_cache: true,
            }));
        }

        for query in song.query_plan() {
            tracing::info!(query = %query, "Searching for video");

            let candidates = search.search(&query).await?;
            let Some(chosen) = select_candidate(&song, &candidates) else {
                continue;
            };

            if song.is_preferred(chosen) {
                tracing::info!(video_title = %chosen.title, channel = %chosen.channel, "Found video");
            } else {
                tracing::info!(video_title = %chosen.title, "Using first result");
            }

            self.cache.insert(key, chosen.id.clone());
            return Ok(Some(VideoMatch {
                video_id: chosen.id.clone(),
                from_cache: false,
            }));
        }

        tracing::warn!(artist = %artist, title = %title, "No videos found");
        Ok(None)
    }

    /// Cached id for an already normalized key
    pub fn cached(&self, key: &str) -> Option<&str> {
        self.cache.get(key).map(String::as_str)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}
