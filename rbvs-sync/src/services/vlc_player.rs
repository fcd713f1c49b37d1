//! VLC process controller
//!
//! Starts VLC as a child process for each video and stops it on request.
//! Only one VLC instance is owned at a time; starting a new video stops the
//! previous one first.

use super::VideoPlayer;
use async_trait::async_trait;
use rbvs_common::config::VideoSettings;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// How long VLC gets to come up before we check it is still alive
const STARTUP_GRACE: Duration = Duration::from_secs(2);

/// How long VLC gets to exit after a terminate request before it is killed
const STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// Player errors (PlayerFailure)
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("VLC not available")]
    NotAvailable,

    #[error("Failed to start VLC: {0}")]
    Spawn(String),

    #[error("Failed to stop VLC: {0}")]
    Stop(String),
}

/// VLC player controller
pub struct VlcPlayer {
    vlc_path: PathBuf,
    startup_grace: Duration,
    stop_timeout: Duration,
    current: Mutex<Option<Child>>,
}

impl VlcPlayer {
    /// Create a controller for the given VLC executable
    pub fn new(vlc_path: impl Into<PathBuf>) -> Self {
        Self {
            vlc_path: vlc_path.into(),
            startup_grace: STARTUP_GRACE,
            stop_timeout: STOP_TIMEOUT,
            current: Mutex::new(None),
        }
    }

    /// Locate VLC (explicit path → PATH → common install locations)
    pub fn discover(explicit: Option<&Path>) -> Result<Self, PlayerError> {
        find_vlc(explicit).map(Self::new).ok_or(PlayerError::NotAvailable)
    }

    /// Override the startup grace period
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    /// Override how long a terminated VLC may take before it is killed
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn vlc_path(&self) -> &Path {
        &self.vlc_path
    }

    fn spawn(&self, args: &[String]) -> Result<Child, PlayerError> {
        Command::new(&self.vlc_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlayerError::Spawn(e.to_string()))
    }
}

#[async_trait]
impl VideoPlayer for VlcPlayer {
    async fn start(
        &self,
        url: &str,
        title: &str,
        artist: &str,
        video: &VideoSettings,
    ) -> Result<(), PlayerError> {
        let mut current = self.current.lock().await;
        if let Err(e) = stop_child(current.take(), self.stop_timeout).await {
            warn!("Previous VLC may still be running: {}", e);
        }

        info!(artist = %artist, title = %title, "Starting VLC");

        let mut child = self.spawn(&vlc_args(url, title, artist, video))?;

        tokio::time::sleep(self.startup_grace).await;

        match child.try_wait() {
            Ok(Some(status)) => {
                warn!(
                    "VLC exited immediately with code {:?}, retrying with plain command",
                    status.code()
                );
                child = self.spawn(&[url.to_string()])?;
            }
            Ok(None) => info!("VLC started successfully"),
            Err(e) => warn!("Could not query VLC status: {}", e),
        }

        *current = Some(child);
        Ok(())
    }

    async fn stop(&self) -> Result<(), PlayerError> {
        let mut current = self.current.lock().await;
        stop_child(current.take(), self.stop_timeout).await
    }
}

/// Ask a running VLC child to exit, kill it after `timeout`, and reap it
async fn stop_child(child: Option<Child>, timeout: Duration) -> Result<(), PlayerError> {
    let Some(mut child) = child else {
        return Ok(());
    };

    if let Ok(Some(_)) = child.try_wait() {
        return Ok(());
    }

    if let Err(e) = terminate(&mut child) {
        warn!("Failed to signal VLC: {}", e);
    }

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(_)) => {
            info!("VLC closed");
            return Ok(());
        }
        Ok(Err(e)) => warn!("Error waiting for VLC to exit: {}", e),
        Err(_) => warn!("VLC did not exit within {:?}, killing it", timeout),
    }

    child
        .kill()
        .await
        .map_err(|e| PlayerError::Stop(e.to_string()))?;
    info!("VLC killed");
    Ok(())
}

/// Send SIGTERM so VLC can shut down cleanly
#[cfg(unix)]
fn terminate(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(pid)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(std::io::Error::from)
}

/// No graceful signal on this platform; terminate outright
#[cfg(not(unix))]
fn terminate(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}

/// Full VLC argument list for one video
pub fn vlc_args(url: &str, title: &str, artist: &str, video: &VideoSettings) -> Vec<String> {
    let mut args = vec![
        url.to_string(),
        "--intf".to_string(),
        "dummy".to_string(),
        "--no-video-title-show".to_string(),
        format!("--meta-title={} - {}", artist, title),
    ];

    if video.fullscreen {
        args.push("--fullscreen".to_string());
    }
    if video.muted {
        args.push("--volume=0".to_string());
    }
    if video.force_best_quality {
        args.push("--avcodec-hw=any".to_string());
        args.push("--network-caching=3000".to_string());
    }

    args
}

/// Find a VLC executable
fn find_vlc(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        warn!("Configured VLC path {} does not exist", path.display());
    }

    let on_path = StdCommand::new("vlc")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok();
    if on_path {
        return Some(PathBuf::from("vlc"));
    }

    install_locations().into_iter().find(|path| path.is_file())
}

/// Common per-platform VLC install locations
fn install_locations() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        let mut paths = vec![
            PathBuf::from(r"C:\Program Files\VideoLAN\VLC\vlc.exe"),
            PathBuf::from(r"C:\Program Files (x86)\VideoLAN\VLC\vlc.exe"),
        ];
        if let Some(local) = dirs::data_local_dir() {
            paths.push(local.join("Programs").join("VLC").join("vlc.exe"));
        }
        paths
    } else if cfg!(target_os = "macos") {
        vec![PathBuf::from("/Applications/VLC.app/Contents/MacOS/VLC")]
    } else {
        vec![
            PathBuf::from("/usr/bin/vlc"),
            PathBuf::from("/usr/local/bin/vlc"),
            PathBuf::from("/snap/bin/vlc"),
        ]
    }
}
