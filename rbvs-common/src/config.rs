//! Configuration loading and settings store
//!
//! Settings live in a single TOML file. Resolution order for the file path:
//! 1. Command-line argument (highest priority)
//! 2. `RBVS_CONFIG` environment variable
//! 3. OS-dependent default (`<config_dir>/rbvs/rbvs-sync.toml`)
//!
//! A missing file is not an error: the built-in defaults are used and a
//! warning is logged. A file that exists but does not parse is a startup
//! error.
//!
//! The sync engine only ever reads settings. Writing is limited to
//! generating a default file for the user to edit.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default UDP port the game mod broadcasts events on
pub const DEFAULT_LISTEN_PORT: u16 = 21070;

/// Environment variable overriding the settings file location
pub const CONFIG_PATH_ENV: &str = "RBVS_CONFIG";

/// Environment variable overriding the YouTube API key from TOML
pub const API_KEY_ENV: &str = "RBVS_YOUTUBE_API_KEY";

/// Largest accepted `sync.start_delay_seconds`, either sign
pub const MAX_START_DELAY_SECONDS: f64 = 300.0;

/// Placeholder shipped in old config files; treated as "not configured"
const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY";

/// Complete settings file schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// YouTube Data API v3 key
    #[serde(default)]
    pub youtube_api_key: Option<String>,

    /// UDP port to listen on
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Explicit VLC executable path (auto-detected when absent)
    #[serde(default)]
    pub vlc_path: Option<PathBuf>,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub video: VideoSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            listen_port: DEFAULT_LISTEN_PORT,
            vlc_path: None,
            sync: SyncSettings::default(),
            video: VideoSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Timing behavior of the sync engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Hold resolved videos until the song actually starts
    pub sync_to_start: bool,

    /// Search and resolve as soon as song metadata arrives
    pub preload_videos: bool,

    /// Stop the player when the game returns to the menus
    pub auto_stop_on_menu: bool,

    /// Extra delay before starting a synced video, in seconds.
    ///
    /// Negative values are accepted and behave like zero.
    pub start_delay_seconds: f64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            sync_to_start: true,
            preload_videos: true,
            auto_stop_on_menu: true,
            start_delay_seconds: 0.0,
        }
    }
}

impl SyncSettings {
    /// Reject delays that are not finite or beyond [`MAX_START_DELAY_SECONDS`]
    pub fn validate(&self) -> Result<()> {
        let delay = self.start_delay_seconds;
        if !delay.is_finite() || delay.abs() > MAX_START_DELAY_SECONDS {
            return Err(Error::InvalidInput(format!(
                "sync.start_delay_seconds must be between -{max} and {max}, got {delay}",
                max = MAX_START_DELAY_SECONDS,
                delay = delay
            )));
        }
        Ok(())
    }
}

/// Player and stream quality preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub preferred_quality: VideoQuality,
    pub force_best_quality: bool,
    pub fullscreen: bool,
    pub muted: bool,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            preferred_quality: VideoQuality::P1080,
            force_best_quality: true,
            fullscreen: true,
            muted: true,
        }
    }
}

/// Preferred maximum stream resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoQuality {
    #[serde(rename = "4K")]
    Uhd4k,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "360p")]
    P360,
}

impl VideoQuality {
    /// Maximum frame height for this quality
    pub fn max_height(&self) -> u32 {
        match self {
            VideoQuality::Uhd4k => 2160,
            VideoQuality::P1440 => 1440,
            VideoQuality::P1080 => 1080,
            VideoQuality::P720 => 720,
            VideoQuality::P480 => 480,
            VideoQuality::P360 => 360,
        }
    }
}

impl Default for VideoQuality {
    fn default() -> Self {
        VideoQuality::P1080
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Source of settings for the sync engine
pub trait SettingsStore: Send + Sync {
    /// Load the current settings
    fn load(&self) -> Result<TomlConfig>;
}

/// Settings store backed by a TOML file on disk
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the resolved default location (see module docs)
    pub fn from_default_location(cli_arg: Option<&Path>) -> Result<Self> {
        Ok(Self::new(resolve_config_path(cli_arg)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `config` to the settings file, creating parent directories
    pub fn save(&self, config: &TomlConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

        // Write to a sibling temp file first so a crash never leaves half a file
        let tmp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;

        info!("Settings written to {}", self.path.display());
        Ok(())
    }
}

impl SettingsStore for TomlSettingsStore {
    fn load(&self) -> Result<TomlConfig> {
        if !self.path.exists() {
            warn!(
                "Settings file {} not found, using built-in defaults",
                self.path.display()
            );
            return Ok(TomlConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let config: TomlConfig = toml::from_str(&content)?;
        validate(&config)?;

        info!("Loaded settings from {}", self.path.display());
        Ok(config)
    }
}

/// Reject values that would make the listener unusable
fn validate(config: &TomlConfig) -> Result<()> {
    if config.listen_port == 0 {
        return Err(Error::InvalidInput("listen_port must not be 0".to_string()));
    }
    config.sync.validate()
}

/// Resolve the settings file path (CLI → env → OS default)
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// OS-dependent default settings file location
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("rbvs").join("rbvs-sync.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Resolve the YouTube API key
///
/// **Priority:** CLI → ENV → TOML
pub fn resolve_api_key(cli_key: Option<&str>, config: &TomlConfig) -> Result<String> {
    if let Some(key) = cli_key {
        if is_valid_key(key) {
            info!("YouTube API key taken from command line");
            return Ok(key.trim().to_string());
        }
    }

    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if is_valid_key(&key) {
            info!("YouTube API key loaded from environment variable");
            return Ok(key.trim().to_string());
        }
    }

    if let Some(key) = config.youtube_api_key.as_deref() {
        if is_valid_key(key) {
            info!("YouTube API key loaded from settings file");
            return Ok(key.trim().to_string());
        }
    }

    Err(Error::Config(format!(
        "YouTube API key not configured. Set it using one of:\n\
         1. Command line: --api-key your-key-here\n\
         2. Environment: {}=your-key-here\n\
         3. Settings file: youtube_api_key = \"your-key\"\n\
         \n\
         Get a free key at: https://console.cloud.google.com/",
        API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace, not the placeholder)
pub fn is_valid_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != API_KEY_PLACEHOLDER
}
