//! Stream URL resolution through `yt-dlp`
//!
//! Runs `yt-dlp -g` for a video id and takes the first URL it prints. The
//! format selector follows the configured quality preference.

use super::StreamResolver;
use async_trait::async_trait;
use rbvs_common::config::VideoSettings;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

const DEFAULT_BINARY: &str = "yt-dlp";
const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// Stream resolution errors (ResolveFailure)
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("yt-dlp binary not found")]
    BinaryNotFound,

    #[error("yt-dlp execution error: {0}")]
    Execution(String),

    #[error("yt-dlp failed (exit code {code:?}): {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("No playable stream for {0}")]
    NoStream(String),
}

/// Resolver backed by the `yt-dlp` command line tool
pub struct YtDlpResolver {
    binary: PathBuf,
    format: String,
}

impl YtDlpResolver {
    pub fn new(video: &VideoSettings) -> Self {
        Self::with_binary(DEFAULT_BINARY, video)
    }

    pub fn with_binary(binary: impl Into<PathBuf>, video: &VideoSettings) -> Self {
        let format = format_selector(video);
        tracing::debug!(format = %format, "yt-dlp format selector");
        Self {
            binary: binary.into(),
            format,
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Check that the binary can be executed
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl StreamResolver for YtDlpResolver {
    async fn resolve(&self, video_id: &str) -> Result<String, ResolveError> {
        let watch_url = format!("{}{}", WATCH_URL, video_id);

        tracing::debug!(video_id = %video_id, "Resolving stream with yt-dlp");

        let output = Command::new(&self.binary)
            .args(["--no-playlist", "--no-warnings", "--quiet"])
            .args(["-f", &self.format])
            .arg("-g")
            .arg(&watch_url)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ResolveError::BinaryNotFound,
                _ => ResolveError::Execution(e.to_string()),
            })?;

        if !output.status.success() {
            return Err(ResolveError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let url = first_url(&stdout).ok_or_else(|| ResolveError::NoStream(video_id.to_string()))?;

        tracing::info!(video_id = %video_id, "Stream resolved");
        Ok(url.to_string())
    }
}

/// yt-dlp `-f` selector for the configured quality
///
/// Forced best quality tries split video+audio at the preferred height,
/// then any muxed stream at that height, then the best of anything.
pub fn format_selector(video: &VideoSettings) -> String {
    let height = video.preferred_quality.max_height();

    if video.force_best_quality {
        [
            format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]", h = height),
            format!("best[height<={}]", height),
            "bestvideo+bestaudio/best".to_string(),
            "best".to_string(),
        ]
        .join("/")
    } else {
        format!("best[height<={}]/best", height)
    }
}

/// First non-empty line of `yt-dlp -g` output
///
/// Split formats print the video URL first and the audio URL second; the
/// player is given the video stream.
fn first_url(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).find(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbvs_common::config::VideoQuality;

    #[test]
    fn test_format_forced_best() {
        let video = VideoSettings::default();
        assert_eq!(
            format_selector(&video),
            "bestvideo[height<=1080]+bestaudio/best[height<=1080]/best[height<=1080]/bestvideo+bestaudio/best/best"
        );
    }

    #[test]
    fn test_format_preferred_only() {
        let video = VideoSettings {
            preferred_quality: VideoQuality::P720,
            force_best_quality: false,
            ..VideoSettings::default()
        };
        assert_eq!(format_selector(&video), "best[height<=720]/best");
    }

    #[test]
    fn test_first_url_skips_blank_lines() {
        let out = "\n  https://video.example/v.mp4 \nhttps://audio.example/a.m4a\n";
        assert_eq!(first_url(out), Some("https://video.example/v.mp4"));
        assert_eq!(first_url("\n\n"), None);
    }

    #[tokio::test]
    async fn test_missing_binary_reports_not_found() {
        let resolver = YtDlpResolver::with_binary(
            "/nonexistent/rbvs-test/yt-dlp",
            &VideoSettings::default(),
        );
        assert!(!resolver.is_available().await);
        assert!(matches!(
            resolver.resolve("abc").await,
            Err(ResolveError::BinaryNotFound)
        ));
    }
}
