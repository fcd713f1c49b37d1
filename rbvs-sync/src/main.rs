//! RBVS sync listener (rbvs-sync) - Main entry point
//!
//! Wires the settings file, the YouTube/yt-dlp/VLC collaborators and the
//! UDP listener together and runs until Ctrl+C or SIGTERM.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rbvs_common::config::{self, SettingsStore, TomlConfig, TomlSettingsStore};
use rbvs_common::events::EventBus;
use rbvs_sync::services::{VlcPlayer, YouTubeClient, YtDlpResolver};
use rbvs_sync::{Listener, SyncOrchestrator};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for rbvs-sync
#[derive(Parser, Debug)]
#[command(name = "rbvs-sync")]
#[command(about = "Plays music videos in sync with Rock Band 3 songs")]
#[command(version)]
struct Args {
    /// Settings file (default: <config dir>/rbvs/rbvs-sync.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// UDP port to listen on (overrides the settings file)
    #[arg(short, long, env = "RBVS_LISTEN_PORT")]
    port: Option<u16>,

    /// YouTube Data API key (overrides environment and settings file)
    #[arg(long)]
    api_key: Option<String>,

    /// VLC executable (overrides the settings file)
    #[arg(long, env = "RBVS_VLC_PATH")]
    vlc_path: Option<PathBuf>,

    /// Verbose packet diagnostics
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a settings file with default values
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let store = TomlSettingsStore::from_default_location(args.config.as_deref())
        .context("Failed to determine settings file location")?;

    if let Some(Command::InitConfig { force }) = args.command {
        return init_config(&store, force);
    }

    let (settings, settings_found) = load_settings(&store)?;

    init_tracing(&settings, args.debug)?;

    info!(
        "Starting rbvs-sync {} (git {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );
    if settings_found {
        info!("Settings: {}", store.path().display());
    } else {
        warn!(
            "Settings file {} not found, using defaults (run `rbvs-sync init-config` to create it)",
            store.path().display()
        );
    }

    let api_key = config::resolve_api_key(args.api_key.as_deref(), &settings)?;
    let search = YouTubeClient::new(api_key).context("Failed to create YouTube client")?;

    let resolver = YtDlpResolver::new(&settings.video);
    if !resolver.is_available().await {
        warn!("yt-dlp not found on PATH; videos will fail to resolve");
    }

    let vlc_path = args.vlc_path.as_deref().or(settings.vlc_path.as_deref());
    let player = Arc::new(
        VlcPlayer::discover(vlc_path)
            .context("VLC not found. Install it or set vlc_path in the settings file")?,
    );
    info!("Using VLC at {}", player.vlc_path().display());

    let event_bus = EventBus::new(100);
    let mut orchestrator = SyncOrchestrator::new(
        Arc::new(search),
        Arc::new(resolver),
        player.clone(),
        settings.sync.clone(),
        settings.video.clone(),
        event_bus,
    );

    if settings.sync.sync_to_start {
        info!("Video sync enabled: videos start when songs begin");
    }

    let port = args.port.unwrap_or(settings.listen_port);
    let listener = Listener::bind(port)
        .context("Failed to start listener (try running as administrator on Windows)")?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    listener.run(&mut orchestrator, shutdown).await;

    orchestrator.stop_player().await;
    info!("Shutdown complete");
    Ok(())
}

/// Read the settings file, or defaults when there is none
///
/// Runs before tracing is installed, so the missing-file case is reported
/// by the caller rather than by the store.
fn load_settings(store: &TomlSettingsStore) -> Result<(TomlConfig, bool)> {
    if !store.path().exists() {
        return Ok((TomlConfig::default(), false));
    }
    let settings = store.load().context("Failed to load settings")?;
    Ok((settings, true))
}

/// Install the tracing subscriber
///
/// `RUST_LOG` wins over `--debug`, which wins over `logging.level`.
fn init_tracing(settings: &TomlConfig, debug: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if debug => EnvFilter::new("rbvs_sync=trace,rbvs_common=debug,info"),
        Err(_) => EnvFilter::try_new(&settings.logging.level)
            .with_context(|| format!("Invalid logging.level {:?}", settings.logging.level))?,
    };

    let file_layer = match &settings.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

/// `init-config` subcommand
fn init_config(store: &TomlSettingsStore, force: bool) -> Result<()> {
    if store.path().exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            store.path().display()
        );
    }

    store
        .save(&TomlConfig::default())
        .context("Failed to write settings file")?;
    println!("Wrote default settings to {}", store.path().display());
    println!("Set youtube_api_key in that file before starting rbvs-sync");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
