//! Encore - Playback Orchestration
//!
//! Drives an ordered playlist of media entries through a single native media
//! engine.
//!
//! This crate provides:
//! - Shared playlist with structural change notifications
//! - Next/previous planning (linear, shuffle without repeats, repeat off/all/one)
//! - Playback history for shuffle "previous"
//! - Engine adapter with generation tagging and time coalescing
//! - A single-writer orchestrator with async command replies
//! - A-B repeat, stop-after, resume points and session save/restore
//!
//! # Architecture
//!
//! `encore-playback` knows nothing about a particular player backend or
//! storage. The engine comes in through [`MediaEngine`]/[`EngineFactory`] and
//! persistence through [`encore_core::PersistenceBridge`].
//!
//! # Example
//!
//! ```rust,no_run
//! use encore_core::{MediaEntry, PersistenceBridge, PlaybackSnapshot};
//! use encore_playback::{
//!     EngineEventSink, MediaEngine, Orchestrator, PlaybackConfig, TrackKind,
//! };
//! use std::sync::Arc;
//!
//! struct Silent;
//!
//! impl MediaEngine for Silent {
//!     fn load(&mut self, _entry: &MediaEntry, _start_ms: i64) -> encore_playback::Result<()> { Ok(()) }
//!     fn play(&mut self) {}
//!     fn pause(&mut self) {}
//!     fn stop(&mut self) {}
//!     fn seek_time(&mut self, _time_ms: i64) {}
//!     fn seek_position(&mut self, _fraction: f32) {}
//!     fn set_rate(&mut self, _rate: f32) {}
//!     fn select_track(&mut self, _kind: TrackKind, _id: i32) -> bool { false }
//!     fn volume(&self) -> i32 { 100 }
//!     fn set_volume(&mut self, _volume: i32) {}
//!     fn release(&mut self) {}
//! }
//!
//! struct Forgetful;
//!
//! #[async_trait::async_trait]
//! impl PersistenceBridge for Forgetful {
//!     async fn save_snapshot(&self, _snapshot: &PlaybackSnapshot) -> encore_core::Result<()> { Ok(()) }
//!     async fn load_snapshot(&self) -> encore_core::Result<Option<PlaybackSnapshot>> { Ok(None) }
//! }
//!
//! # async fn run() -> encore_playback::Result<()> {
//! let factory = |_sink: EngineEventSink| -> encore_playback::Result<Box<dyn MediaEngine>> {
//!     Ok(Box::new(Silent))
//! };
//! let (player, worker) = Orchestrator::spawn(PlaybackConfig::default(), factory, Arc::new(Forgetful));
//!
//! player
//!     .load(vec![MediaEntry::new("/music/a.flac"), MediaEntry::new("/music/b.flac")], 0)
//!     .await?;
//! player.next(false).await?;
//! assert_eq!(player.current_status().await?.current, Some(1));
//!
//! player.stop(true).await?;
//! worker.await.ok();
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod navigation;
pub mod orchestrator;
pub mod playlist;

// Re-export main types
pub use config::PlaybackConfig;
pub use engine::{
    EngineAdapter, EngineEvent, EngineEventSink, EngineFactory, EngineStatus, MediaEngine,
    Outcome, TrackKind,
};
pub use error::{PlaybackError, Result};
pub use events::{AbRepeat, Notification, PlaybackStatus, PlayerEvent, PlayerState};
pub use history::History;
pub use navigation::{Navigation, NavigationPlanner, MIN_SHUFFLE_SIZE};
pub use orchestrator::{Orchestrator, SeekTarget};
pub use playlist::{Playlist, PlaylistChange};
