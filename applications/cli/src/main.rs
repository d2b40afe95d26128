//! Encore - play, resume and inspect playback sessions from a terminal
mod config;
mod simulated;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{EncoreConfig, SimulationSettings};
use encore_core::{MediaEntry, RepeatMode};
use encore_playback::{
    EngineEventSink, MediaEngine, Notification, Orchestrator, PlayerEvent, PlayerState,
};
use encore_storage::SqliteBridge;
use simulated::SimulatedEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "Playlist playback with shuffle, repeat and session resume", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "ENCORE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a list of files or stream URLs
    Play {
        /// Locations, in playlist order
        #[arg(required = true)]
        locations: Vec<String>,

        /// Index of the entry to start with
        #[arg(short, long, default_value_t = 0)]
        start: usize,

        /// Shuffle the playlist
        #[arg(long)]
        shuffle: bool,

        /// Repeat mode: off, all or one
        #[arg(short, long, value_parser = parse_repeat)]
        repeat: Option<RepeatMode>,
    },
    /// Resume the last saved session
    Resume,
    /// Print the last saved session
    Show,
}

fn parse_repeat(value: &str) -> Result<RepeatMode, String> {
    RepeatMode::from_str(&value.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown repeat mode '{}' (expected off, all or one)", value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "encore=info,encore_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = EncoreConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Play {
            locations,
            start,
            shuffle,
            repeat,
        } => play(config, locations, start, shuffle, repeat).await?,
        Commands::Resume => resume(config).await?,
        Commands::Show => show(config).await?,
    }

    Ok(())
}

async fn open_bridge(config: &EncoreConfig) -> anyhow::Result<SqliteBridge> {
    let pool = encore_storage::create_pool(&config.storage.database_url)
        .await
        .with_context(|| format!("opening {}", config.storage.database_url))?;
    encore_storage::run_migrations(&pool).await?;
    Ok(SqliteBridge::new(pool))
}

/// Running orchestrator plus the subscription the front end follows
struct Session {
    player: Orchestrator,
    worker: JoinHandle<()>,
}

impl Session {
    async fn start(config: &EncoreConfig) -> anyhow::Result<Self> {
        let bridge = open_bridge(config).await?;
        let simulation: SimulationSettings = config.simulation;
        let factory =
            move |sink: EngineEventSink| -> encore_playback::Result<Box<dyn MediaEngine>> {
                Ok(Box::new(SimulatedEngine::new(sink, simulation)))
            };

        let (player, worker) =
            Orchestrator::spawn(config.playback.clone(), factory, Arc::new(bridge));
        tracing::info!("Playback engine started");
        Ok(Self { player, worker })
    }

    /// Print progress until playback stops or Ctrl-C
    async fn follow(self, mut events: tokio::sync::broadcast::Receiver<PlayerEvent>) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => {
                        if !self.report(event) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("Skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    println!("Interrupted, saving position");
                    self.player.stop_and_keep_position().await?;
                    break;
                }
            }
        }

        self.player.stop(true).await?;
        self.worker.await?;
        Ok(())
    }

    /// Print one event; `false` once playback stopped
    fn report(&self, event: PlayerEvent) -> bool {
        match event {
            PlayerEvent::MediaChanged { index, location } => {
                let status = self.player.status();
                println!(
                    "[{}/{}] {}",
                    index + 1,
                    status.len.max(index + 1),
                    MediaEntry::new(location).display_title()
                );
            }
            PlayerEvent::StateChanged {
                state: PlayerState::Stopped,
            } => {
                println!("Stopped");
                return false;
            }
            PlayerEvent::Notification(Notification::PlaybackFailed { location }) => {
                println!("Cannot play {}, skipping", location);
            }
            PlayerEvent::Notification(Notification::NothingToResume) => {
                println!("Nothing to resume");
                return false;
            }
            _ => {}
        }
        true
    }
}

async fn play(
    config: EncoreConfig,
    locations: Vec<String>,
    start: usize,
    shuffle: bool,
    repeat: Option<RepeatMode>,
) -> anyhow::Result<()> {
    let session = Session::start(&config).await?;
    let events = session.player.subscribe();

    let entries = locations.into_iter().map(MediaEntry::new).collect();
    session.player.load(entries, start).await?;

    if shuffle && !session.player.current_status().await?.shuffling {
        session.player.shuffle().await?;
    }
    if let Some(mode) = repeat {
        session.player.set_repeat_mode(mode).await?;
    }

    session.follow(events).await
}

async fn resume(config: EncoreConfig) -> anyhow::Result<()> {
    let session = Session::start(&config).await?;
    let events = session.player.subscribe();

    if !session.player.restore_last().await? {
        println!("Nothing to resume");
        session.player.stop(true).await?;
        session.worker.await?;
        return Ok(());
    }
    // Sessions saved while paused load without playing
    session.player.play().await?;

    session.follow(events).await
}

async fn show(config: EncoreConfig) -> anyhow::Result<()> {
    let bridge = open_bridge(&config).await?;
    let Some(snapshot) = encore_storage::snapshot::get(bridge.pool()).await? else {
        println!("No saved session");
        return Ok(());
    };
    let saved_at = encore_storage::snapshot::saved_at(bridge.pool()).await?;

    if let Some(saved_at) = saved_at {
        println!("Saved:    {}", saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!(
        "Position: entry {} of {} at {}s",
        snapshot.index + 1,
        snapshot.locations.len(),
        snapshot.elapsed_ms / 1000
    );
    println!(
        "Mode:     shuffle {}, repeat {}, rate {}{}",
        if snapshot.shuffling { "on" } else { "off" },
        snapshot.repeat_mode,
        snapshot.rate,
        if snapshot.paused { ", paused" } else { "" }
    );
    for (index, location) in snapshot.locations.iter().enumerate() {
        let marker = if index == snapshot.index { '>' } else { ' ' };
        println!("{} {:>3}. {}", marker, index + 1, location);
    }
    Ok(())
}
