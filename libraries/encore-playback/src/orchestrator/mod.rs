//! Playback orchestrator
//!
//! [`Orchestrator`] is a cheap, cloneable handle. Every request is queued to a
//! single worker task that owns the playlist position, navigation, history and
//! the engine, so no two operations ever interleave. Engine callbacks enter
//! the same queue, which keeps them ordered with commands.
//!
//! A system-exit stop preempts: once requested, commands already queued behind
//! it are answered with [`PlaybackError::ShuttingDown`] instead of running.

mod command;
mod worker;

pub(crate) use command::Inbox;
pub use command::SeekTarget;

use crate::config::PlaybackConfig;
use crate::engine::{EngineAdapter, EngineFactory, Outcome, TrackKind};
use crate::error::{PlaybackError, Result};
use crate::events::{AbRepeat, PlaybackStatus, PlayerEvent};
use crate::playlist::Playlist;
use command::{Command, Reply};
use encore_core::{MediaEntry, PersistenceBridge, RepeatMode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use worker::Worker;

const EVENT_CAPACITY: usize = 1024;

/// Handle to the playback worker
#[derive(Clone)]
pub struct Orchestrator {
    inbox: mpsc::UnboundedSender<Inbox>,
    events: broadcast::Sender<PlayerEvent>,
    status: watch::Receiver<PlaybackStatus>,
    playlist: Arc<Playlist>,
    exiting: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Start the worker on the current tokio runtime
    ///
    /// The engine is created lazily through `factory` on first playback.
    pub fn spawn(
        config: PlaybackConfig,
        factory: impl EngineFactory + 'static,
        bridge: Arc<dyn PersistenceBridge>,
    ) -> (Self, JoinHandle<()>) {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (status_tx, status_rx) = watch::channel(PlaybackStatus::default());
        let playlist = Arc::new(Playlist::new());
        let exiting = Arc::new(AtomicBool::new(false));

        let engine = EngineAdapter::new(
            Box::new(factory),
            inbox_tx.clone(),
            config.time_coalesce_ms,
        );
        let worker = Worker::new(
            config,
            Arc::clone(&playlist),
            engine,
            bridge,
            inbox_tx.clone(),
            events.clone(),
            status_tx,
            Arc::clone(&exiting),
        );
        let handle = tokio::spawn(worker.run(inbox_rx));

        let orchestrator = Self {
            inbox: inbox_tx,
            events,
            status: status_rx,
            playlist,
            exiting,
        };
        (orchestrator, handle)
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        if self.exiting.load(Ordering::Acquire) {
            return Err(PlaybackError::ShuttingDown);
        }
        self.send(build).await
    }

    async fn send<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.inbox
            .send(Inbox::Command(build(reply)))
            .map_err(|_| PlaybackError::ShuttingDown)?;
        response.await.map_err(|_| PlaybackError::ShuttingDown)?
    }

    // ===== Playlist =====

    /// Replace the playlist and start playing at `start`
    ///
    /// An out-of-range `start` falls back to 0.
    pub async fn load(&self, entries: Vec<MediaEntry>, start: usize) -> Result<()> {
        self.request(|reply| Command::Load {
            entries,
            start,
            reply,
        })
        .await
    }

    /// Add entries at the end (loads them when nothing is playing)
    pub async fn append(&self, entries: Vec<MediaEntry>) -> Result<()> {
        self.request(|reply| Command::Append { entries, reply }).await
    }

    /// Insert entries right after the current one, in order
    pub async fn insert_next(&self, entries: Vec<MediaEntry>) -> Result<()> {
        self.request(|reply| Command::InsertNext { entries, reply })
            .await
    }

    pub async fn remove(&self, index: usize) -> Result<()> {
        self.request(|reply| Command::Remove { index, reply }).await
    }

    /// Remove every entry with this location; returns how many were removed
    pub async fn remove_location(&self, location: impl Into<String>) -> Result<usize> {
        let location = location.into();
        self.request(|reply| Command::RemoveLocation { location, reply })
            .await
    }

    /// Move the entry at `from` so it sits before the entry at `to`
    pub async fn move_entry(&self, from: usize, to: usize) -> Result<()> {
        self.request(|reply| Command::Move { from, to, reply }).await
    }

    // ===== Navigation =====

    /// Advance; `force` leaves repeat-one instead of replaying
    pub async fn next(&self, force: bool) -> Result<()> {
        self.request(|reply| Command::Next { force, reply }).await
    }

    /// Go back, or rewind when the current entry is well under way
    pub async fn previous(&self, force: bool) -> Result<()> {
        self.request(|reply| Command::Previous { force, reply })
            .await
    }

    pub async fn play_index(&self, index: usize) -> Result<()> {
        self.request(|reply| Command::PlayIndex { index, reply })
            .await
    }

    /// Toggle shuffle; returns the new state
    pub async fn shuffle(&self) -> Result<bool> {
        self.request(|reply| Command::Shuffle { reply }).await
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.request(|reply| Command::SetRepeatMode { mode, reply })
            .await
    }

    /// Place an A-B point at `time_ms`, or at the current time
    pub async fn set_ab_repeat_point(&self, time_ms: Option<i64>) -> Result<AbRepeat> {
        self.request(|reply| Command::SetAbRepeatPoint { time_ms, reply })
            .await
    }

    pub async fn clear_ab_repeat(&self) -> Result<()> {
        self.request(|reply| Command::ClearAbRepeat { reply }).await
    }

    /// Stop once the entry at `index` ends; `None` clears the marker
    pub async fn set_stop_after(&self, index: Option<usize>) -> Result<()> {
        self.request(|reply| Command::SetStopAfter { index, reply })
            .await
    }

    /// Reload the last saved session; `false` when there was nothing to resume
    pub async fn restore_last(&self) -> Result<bool> {
        self.request(|reply| Command::RestoreLast { reply }).await
    }

    // ===== Transport =====

    pub async fn play(&self) -> Result<Outcome> {
        self.request(|reply| Command::Play { reply }).await
    }

    pub async fn pause(&self) -> Result<Outcome> {
        self.request(|reply| Command::Pause { reply }).await
    }

    pub async fn seek(&self, target: SeekTarget) -> Result<Outcome> {
        self.request(|reply| Command::Seek { target, reply }).await
    }

    /// Change the playback rate; `persist` keeps it for later sessions
    pub async fn set_rate(&self, rate: f32, persist: bool) -> Result<()> {
        self.request(|reply| Command::SetRate {
            rate,
            persist,
            reply,
        })
        .await
    }

    pub async fn select_track(&self, kind: TrackKind, id: i32) -> Result<Outcome> {
        self.request(|reply| Command::SelectTrack { kind, id, reply })
            .await
    }

    pub async fn set_volume(&self, volume: i32) -> Result<()> {
        self.request(|reply| Command::SetVolume { volume, reply })
            .await
    }

    /// Stop playback and clear the playlist
    ///
    /// With `system_exit` the engine is released and the worker ends after this
    /// stop; commands queued behind it are rejected.
    pub async fn stop(&self, system_exit: bool) -> Result<()> {
        if system_exit {
            self.exiting.store(true, Ordering::Release);
        }
        self.send(|reply| Command::Stop {
            system_exit,
            keep_position: false,
            reply,
        })
        .await
    }

    /// Stop but keep the saved position so the session can be restored
    pub async fn stop_and_keep_position(&self) -> Result<()> {
        self.request(|reply| Command::Stop {
            system_exit: false,
            keep_position: true,
            reply,
        })
        .await
    }

    // ===== Observation =====

    /// Status computed by the worker after every queued request ahead of this one
    pub async fn current_status(&self) -> Result<PlaybackStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Latest published status
    pub fn status(&self) -> PlaybackStatus {
        self.status.borrow().clone()
    }

    /// Single-slot status mailbox; readers only ever see the newest value
    pub fn watch_status(&self) -> watch::Receiver<PlaybackStatus> {
        self.status.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Shared playlist, readable from any thread
    pub fn playlist(&self) -> Arc<Playlist> {
        Arc::clone(&self.playlist)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.exiting.load(Ordering::Acquire)
    }
}
