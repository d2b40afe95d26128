//! The single writer
//!
//! One task owns navigation state, the engine adapter and every playlist
//! mutation. Commands and engine events arrive on the same FIFO queue and are
//! handled to completion one at a time, persistence awaits included.

use super::command::{Command, Inbox, SeekTarget};
use crate::config::PlaybackConfig;
use crate::engine::{EngineAdapter, EngineEvent, Outcome, TrackKind};
use crate::error::{PlaybackError, Result};
use crate::events::{AbRepeat, Notification, PlaybackStatus, PlayerEvent, PlayerState};
use crate::history::History;
use crate::navigation::{Navigation, NavigationPlanner};
use crate::playlist::{Playlist, PlaylistChange};
use encore_core::{MediaEntry, MediaKind, PersistenceBridge, PlaybackSnapshot, RepeatMode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Past this share of a video it counts as watched and forgets its resume point
const WATCHED_RATIO: f64 = 0.95;
const WATCHED_TAIL_MS: i64 = 10_000;

pub(crate) struct Worker {
    config: PlaybackConfig,
    playlist: Arc<Playlist>,
    engine: EngineAdapter,
    planner: NavigationPlanner,
    history: History,
    bridge: Arc<dyn PersistenceBridge>,
    inbox: mpsc::UnboundedSender<Inbox>,
    events: broadcast::Sender<PlayerEvent>,
    status: watch::Sender<PlaybackStatus>,
    exiting: Arc<AtomicBool>,

    state: PlayerState,
    current: Option<usize>,
    nav: Navigation,
    shuffling: bool,
    repeat: RepeatMode,
    ab: AbRepeat,
    stop_after: Option<usize>,
    /// Resume time waiting for the next start (set by a restore)
    saved_time_ms: i64,
    /// Set when an entry was handed to the engine and not confirmed yet
    new_media: bool,
    /// Bumped on every start so late failure reports can be matched
    attempt: u64,
    consecutive_failures: usize,
    last_previous: Option<Instant>,
    last_save_time_ms: i64,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: PlaybackConfig,
        playlist: Arc<Playlist>,
        engine: EngineAdapter,
        bridge: Arc<dyn PersistenceBridge>,
        inbox: mpsc::UnboundedSender<Inbox>,
        events: broadcast::Sender<PlayerEvent>,
        status: watch::Sender<PlaybackStatus>,
        exiting: Arc<AtomicBool>,
    ) -> Self {
        Self {
            planner: NavigationPlanner::new(config.shuffle_seed),
            config,
            playlist,
            engine,
            history: History::new(),
            bridge,
            inbox,
            events,
            status,
            exiting,
            state: PlayerState::Idle,
            current: None,
            nav: Navigation::default(),
            shuffling: false,
            repeat: RepeatMode::Off,
            ab: AbRepeat::default(),
            stop_after: None,
            saved_time_ms: 0,
            new_media: false,
            attempt: 0,
            consecutive_failures: 0,
            last_previous: None,
            last_save_time_ms: 0,
        }
    }

    pub(crate) async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Inbox>) {
        info!("Playback worker started");

        while let Some(message) = inbox.recv().await {
            let exiting = self.exiting.load(Ordering::Acquire);
            match message {
                Inbox::Command(Command::Stop {
                    system_exit,
                    keep_position,
                    reply,
                }) => {
                    self.stop(system_exit, keep_position).await;
                    let _ = reply.send(Ok(()));
                    if system_exit {
                        self.publish_status();
                        break;
                    }
                }
                Inbox::Command(command) if exiting => {
                    debug!("Discarding queued {} during shutdown", command.name());
                    command.reject();
                }
                Inbox::Command(command) => self.handle_command(command).await,
                Inbox::Engine { .. } | Inbox::StartFailed { .. } if exiting => {}
                Inbox::Engine { generation, event } => {
                    self.handle_engine_event(generation, event).await;
                }
                Inbox::StartFailed { attempt } => {
                    if attempt == self.attempt {
                        self.on_playback_error().await;
                    }
                }
            }
            self.publish_status();
        }

        inbox.close();
        while let Ok(message) = inbox.try_recv() {
            if let Inbox::Command(command) = message {
                command.reject();
            }
        }
        info!("Playback worker stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        debug!("Handling {}", command.name());
        match command {
            Command::Load {
                entries,
                start,
                reply,
            } => {
                let result = self.load(entries, start).await;
                let _ = reply.send(result);
            }
            Command::Append { entries, reply } => {
                let result = self.append(entries).await;
                let _ = reply.send(result);
            }
            Command::InsertNext { entries, reply } => {
                let result = self.insert_next(entries).await;
                let _ = reply.send(result);
            }
            Command::Remove { index, reply } => {
                let result = match self.playlist.remove(index) {
                    Ok(change) => {
                        self.apply_change(change).await;
                        Ok(())
                    }
                    Err(err) => Err(err),
                };
                let _ = reply.send(result);
            }
            Command::RemoveLocation { location, reply } => {
                let changes = self.playlist.remove_location(&location);
                let removed = changes.len();
                for change in changes {
                    self.apply_change(change).await;
                }
                let _ = reply.send(Ok(removed));
            }
            Command::Move { from, to, reply } => {
                let result = match self.playlist.move_entry(from, to) {
                    Ok(change) => {
                        self.apply_change(change).await;
                        Ok(())
                    }
                    Err(err) => Err(err),
                };
                let _ = reply.send(result);
            }
            Command::Next { force, reply } => {
                self.next(force).await;
                let _ = reply.send(Ok(()));
            }
            Command::Previous { force, reply } => {
                self.previous(force).await;
                let _ = reply.send(Ok(()));
            }
            Command::PlayIndex { index, reply } => {
                let result = self.jump_to(index).await;
                let _ = reply.send(result);
            }
            Command::Play { reply } => {
                let outcome = if self.current.is_some() {
                    self.engine.play()
                } else {
                    Outcome::NotApplicable
                };
                let _ = reply.send(Ok(outcome));
            }
            Command::Pause { reply } => {
                let outcome = self.engine.pause();
                if outcome.is_applied() {
                    self.save_position(false).await;
                }
                let _ = reply.send(Ok(outcome));
            }
            Command::Seek { target, reply } => {
                let outcome = if self.current.is_none() {
                    Outcome::NotApplicable
                } else {
                    match target {
                        SeekTarget::Time(time_ms) => self.engine.seek_time(time_ms),
                        SeekTarget::Position(fraction) => self.engine.seek_position(fraction),
                    }
                };
                let _ = reply.send(Ok(outcome));
            }
            Command::SetRate {
                rate,
                persist,
                reply,
            } => {
                let result = self.set_rate(rate, persist).await;
                let _ = reply.send(result);
            }
            Command::SelectTrack { kind, id, reply } => {
                let _ = reply.send(Ok(self.select_track(kind, id)));
            }
            Command::SetVolume { volume, reply } => {
                let _ = reply.send(self.engine.set_volume(volume));
            }
            Command::Shuffle { reply } => {
                let shuffling = self.toggle_shuffle().await;
                let _ = reply.send(Ok(shuffling));
            }
            Command::SetRepeatMode { mode, reply } => {
                self.set_repeat_mode(mode).await;
                let _ = reply.send(Ok(()));
            }
            Command::SetAbRepeatPoint { time_ms, reply } => {
                let _ = reply.send(self.set_ab_repeat_point(time_ms));
            }
            Command::ClearAbRepeat { reply } => {
                self.ab.clear();
                self.emit(PlayerEvent::Update);
                let _ = reply.send(Ok(()));
            }
            Command::SetStopAfter { index, reply } => {
                let _ = reply.send(self.set_stop_after(index));
            }
            Command::RestoreLast { reply } => {
                let result = self.restore_last().await;
                let _ = reply.send(result);
            }
            Command::Status { reply } => {
                let _ = reply.send(Ok(self.build_status()));
            }
            Command::Stop {
                system_exit,
                keep_position,
                reply,
            } => {
                // Normally intercepted by the run loop
                self.stop(system_exit, keep_position).await;
                let _ = reply.send(Ok(()));
            }
        }
    }

    // ===== Loading =====

    async fn load(&mut self, entries: Vec<MediaEntry>, start: usize) -> Result<()> {
        if entries.is_empty() {
            return Err(PlaybackError::EmptyPlaylist);
        }

        if self.current.is_some() {
            self.remember_resume_point();
            self.save_position(false).await;
        }

        self.history.clear();
        self.ab.clear();
        self.stop_after = None;

        let change = self.playlist.replace_all(entries);
        self.emit(PlayerEvent::Playlist(change));

        let len = self.playlist.len();
        if self.config.force_shuffle_audio
            && NavigationPlanner::can_shuffle(len)
            && self.playlist.snapshot().iter().all(MediaEntry::plays_as_audio)
        {
            self.shuffling = true;
        }

        let start = if start < len {
            start
        } else {
            warn!("Start index {} out of range for {} entries, using 0", start, len);
            0
        };

        self.engine.set_rate(1.0, false);
        info!("Loaded {} entries, starting at {}", len, start);
        self.play_index(start).await;
        Ok(())
    }

    async fn append(&mut self, entries: Vec<MediaEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        if self.current.is_none() {
            return self.load(entries, 0).await;
        }

        for entry in entries {
            let change = self.playlist.add(entry);
            self.apply_change(change).await;
        }
        Ok(())
    }

    async fn insert_next(&mut self, entries: Vec<MediaEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let Some(current) = self.current else {
            return self.load(entries, 0).await;
        };

        for (offset, entry) in entries.into_iter().enumerate() {
            let change = self.playlist.insert(current + 1 + offset, entry)?;
            self.apply_change(change).await;
        }
        Ok(())
    }

    async fn restore_last(&mut self) -> Result<bool> {
        let snapshot = match self.bridge.load_snapshot().await {
            Ok(Some(snapshot)) if !snapshot.locations.is_empty() => snapshot,
            Ok(_) => {
                self.emit(PlayerEvent::Notification(Notification::NothingToResume));
                return Ok(false);
            }
            Err(err) => {
                warn!("Could not load playback snapshot: {}", err);
                self.emit(PlayerEvent::Notification(Notification::NothingToResume));
                return Ok(false);
            }
        };

        let index = if snapshot.is_resumable() {
            snapshot.index
        } else {
            warn!(
                "Saved index {} outside {} saved entries, starting at 0",
                snapshot.index,
                snapshot.locations.len()
            );
            0
        };

        let mut entries: Vec<MediaEntry> = snapshot.locations.iter().map(MediaEntry::new).collect();
        if snapshot.paused {
            if let Some(entry) = entries.get_mut(index) {
                entry.flags.start_paused = true;
            }
        }

        self.shuffling = snapshot.shuffling;
        self.repeat = snapshot.repeat_mode;
        self.engine.remember_rate(snapshot.rate);
        self.saved_time_ms = snapshot.elapsed_ms.max(0);

        info!(
            "Restoring {} entries at {} ({}ms)",
            entries.len(),
            index,
            self.saved_time_ms
        );
        self.load(entries, index).await?;
        Ok(true)
    }

    // ===== Navigation =====

    async fn play_index(&mut self, index: usize) {
        let Some(entry) = self.playlist.get(index) else {
            warn!("No entry at index {}, nothing to play", index);
            return;
        };

        self.current = Some(index);
        self.ab.clear();
        self.new_media = true;
        self.attempt += 1;

        let start_ms = self.resolve_start_time(index, &entry);
        self.last_save_time_ms = start_ms;
        self.set_state(PlayerState::Loaded);

        match self.engine.start_playback(&entry, start_ms) {
            Ok(()) => {
                debug!("Started {} at {}ms", entry.location, start_ms);
                if entry.flags.start_paused {
                    self.playlist.update(index, |e| e.flags.start_paused = false);
                }
            }
            Err(err) => {
                warn!("Could not start {}: {}", entry.location, err);
                let _ = self.inbox.send(Inbox::StartFailed {
                    attempt: self.attempt,
                });
            }
        }

        self.determine_prev_next();
        self.emit(PlayerEvent::MediaChanged {
            index,
            location: entry.location,
        });
        self.emit(PlayerEvent::Update);
    }

    /// Start time for an entry: zero when flagged from-start, else a pending
    /// restored time, else the entry's own resume point
    fn resolve_start_time(&mut self, index: usize, entry: &MediaEntry) -> i64 {
        if entry.flags.from_start {
            self.playlist.update(index, |e| e.flags.from_start = false);
            self.saved_time_ms = 0;
            return 0;
        }
        if self.saved_time_ms > 0 {
            return std::mem::take(&mut self.saved_time_ms);
        }
        entry.resume_ms.unwrap_or(0).max(0)
    }

    fn determine_prev_next(&mut self) {
        // A shuffle cycle never needs more than one slot per entry
        self.history.set_max_size(self.playlist.len());
        self.nav = self.planner.plan(
            self.playlist.len(),
            self.current,
            self.shuffling,
            self.repeat,
            &mut self.history,
        );
    }

    async fn next(&mut self, force: bool) {
        let Some(current) = self.current else {
            debug!("next() without a current entry");
            return;
        };

        if self.repeat == RepeatMode::One {
            if !force {
                self.playlist.update(current, |e| e.flags.from_start = true);
                self.play_index(current).await;
                return;
            }
            info!("Skipping out of repeat-one");
            self.repeat = RepeatMode::Off;
            self.determine_prev_next();
        }

        self.remember_resume_point();
        self.advance().await;
    }

    fn shuffle_effective(&self) -> bool {
        self.shuffling && NavigationPlanner::can_shuffle(self.playlist.len())
    }

    /// Move to the planned next entry, recording the current one while shuffling
    async fn advance(&mut self) {
        if let Some(current) = self.current.filter(|_| self.shuffle_effective()) {
            self.history.push(current);
        }

        match self.nav.next {
            Some(next) if next < self.playlist.len() => self.play_index(next).await,
            Some(next) => {
                warn!("Planned next index {} is out of range, stopping", next);
                self.stop(false, false).await;
            }
            None => {
                debug!("Nothing after the current entry, stopping");
                self.stop(false, false).await;
            }
        }
    }

    /// Go back, or rewind the current entry
    ///
    /// Going back needs a previous entry and one of, in order: `force`, a
    /// non-seekable stream, elapsed time under the restart threshold, or a
    /// second press within the double-press window.
    async fn previous(&mut self, force: bool) {
        if self.current.is_none() {
            debug!("previous() without a current entry");
            return;
        }

        let window = Duration::from_millis(self.config.previous_double_press_ms);
        let double_press = self
            .last_previous
            .is_some_and(|pressed| pressed.elapsed() < window);

        let target = self.nav.prev.filter(|_| {
            force
                || !self.engine.is_seekable()
                || self.engine.time_ms() < self.config.previous_restart_ms
                || double_press
        });

        match target {
            Some(prev) if prev < self.playlist.len() => {
                self.last_previous = None;
                self.remember_resume_point();
                self.history.pop();
                self.play_index(prev).await;
            }
            Some(prev) => {
                warn!("Planned previous index {} is out of range, ignoring", prev);
            }
            None => {
                self.last_previous = Some(Instant::now());
                if self.engine.seek_time(0) == Outcome::NotApplicable {
                    debug!("Rewind not applicable to the current stream");
                }
                self.emit(PlayerEvent::Update);
            }
        }
    }

    async fn jump_to(&mut self, index: usize) -> Result<()> {
        let size = self.playlist.len();
        if index >= size {
            return Err(PlaybackError::IndexOutOfRange { index, size });
        }
        self.remember_resume_point();
        self.play_index(index).await;
        Ok(())
    }

    async fn toggle_shuffle(&mut self) -> bool {
        // Each shuffle session starts a fresh cycle
        self.history.clear();
        self.shuffling = !self.shuffling;
        self.save_position(false).await;
        self.determine_prev_next();
        self.emit(PlayerEvent::Update);
        self.shuffling
    }

    async fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.repeat = mode;
        self.save_position(false).await;
        self.determine_prev_next();
        self.emit(PlayerEvent::Update);
    }

    // ===== Structural changes =====

    async fn apply_change(&mut self, change: PlaylistChange) {
        self.emit(PlayerEvent::Playlist(change.clone()));

        match change {
            PlaylistChange::Added { index, .. } => {
                self.current = self.current.map(|c| if c >= index { c + 1 } else { c });
                self.stop_after = self.stop_after.map(|s| if s >= index { s + 1 } else { s });
                self.history.shift_from(index);
                self.determine_prev_next();
            }
            PlaylistChange::Removed { index, .. } => self.on_removed(index).await,
            PlaylistChange::Moved { from, to, .. } => {
                self.current = self.current.map(|c| shift_moved(c, from, to));
                self.stop_after = self.stop_after.map(|s| shift_moved(s, from, to));
                // Recorded indices no longer mean anything
                self.history.clear();
                self.determine_prev_next();
            }
            PlaylistChange::Replaced { .. } | PlaylistChange::Cleared => {}
        }

        self.emit(PlayerEvent::Update);
        self.save_position(false).await;
    }

    async fn on_removed(&mut self, index: usize) {
        let removed_current = self.current == Some(index);
        self.current = match self.current {
            Some(c) if c >= index => c.checked_sub(1),
            other => other,
        };
        self.stop_after = match self.stop_after {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        self.determine_prev_next();

        if removed_current {
            if self.nav.next.is_some() {
                self.advance().await;
            } else if let Some(current) = self.current {
                self.play_index(current).await;
            } else {
                self.stop(false, false).await;
            }
        }
    }

    // ===== Settings =====

    async fn set_rate(&mut self, rate: f32, persist: bool) -> Result<()> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(PlaybackError::InvalidArgument(format!("rate {}", rate)));
        }
        self.engine.set_rate(rate, persist);
        if persist {
            self.save_position(false).await;
        }
        Ok(())
    }

    fn select_track(&mut self, kind: TrackKind, id: i32) -> Outcome {
        if self.current.is_none() {
            return Outcome::NotApplicable;
        }
        self.engine.select_track(kind, id)
    }

    fn set_ab_repeat_point(&mut self, time_ms: Option<i64>) -> Result<AbRepeat> {
        if self.current.is_none() {
            return Err(PlaybackError::InvalidArgument(
                "A-B repeat needs a current entry".to_string(),
            ));
        }
        let time_ms = time_ms.unwrap_or_else(|| self.engine.time_ms());
        if time_ms < 0 {
            return Err(PlaybackError::InvalidArgument(format!(
                "A-B point {}ms",
                time_ms
            )));
        }

        self.ab.place(time_ms);
        self.emit(PlayerEvent::Update);
        Ok(self.ab)
    }

    fn set_stop_after(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(index) = index {
            let size = self.playlist.len();
            if index >= size {
                return Err(PlaybackError::IndexOutOfRange { index, size });
            }
        }
        self.stop_after = index;
        self.emit(PlayerEvent::Update);
        Ok(())
    }

    // ===== Stop =====

    async fn stop(&mut self, system_exit: bool, keep_position: bool) {
        if self.current.is_some() {
            self.remember_resume_point();
            self.save_position(!keep_position).await;
        }

        self.ab.clear();
        self.history.clear();
        self.current = None;
        self.nav = Navigation::default();
        self.stop_after = None;
        self.saved_time_ms = 0;
        self.new_media = false;
        self.last_previous = None;
        self.consecutive_failures = 0;

        if system_exit {
            self.engine.release();
        } else if let Err(err) = self.engine.restart() {
            error!("Engine restart after stop failed: {}", err);
        }

        let change = self.playlist.clear();
        self.emit(PlayerEvent::Playlist(change));
        self.set_state(PlayerState::Stopped);
        self.emit(PlayerEvent::Update);
        info!("Playback stopped (system exit: {})", system_exit);
    }

    // ===== Engine events =====

    async fn handle_engine_event(&mut self, generation: u64, event: EngineEvent) {
        let Some(event) = self.engine.observe(generation, event) else {
            return;
        };
        self.emit(PlayerEvent::Engine(event));

        match event {
            EngineEvent::Playing => {
                self.consecutive_failures = 0;
                self.set_state(PlayerState::Playing);
                if std::mem::take(&mut self.new_media) {
                    self.save_position(false).await;
                }
            }
            EngineEvent::Paused => self.set_state(PlayerState::Paused),
            EngineEvent::EndReached => self.on_end_reached().await,
            EngineEvent::EncounteredError => self.on_playback_error().await,
            EngineEvent::TimeChanged(time_ms) => self.on_time_changed(time_ms).await,
            EngineEvent::SeekableChanged(true) => {
                let rate = if self.config.persist_rate {
                    self.engine.persisted_rate()
                } else {
                    1.0
                };
                self.engine.set_rate(rate, false);
            }
            EngineEvent::Stopped
            | EngineEvent::SeekableChanged(false)
            | EngineEvent::PositionChanged(_)
            | EngineEvent::LengthChanged(_)
            | EngineEvent::PausableChanged(_) => {}
        }
    }

    async fn on_end_reached(&mut self) {
        let Some(current) = self.current else {
            return;
        };

        self.ab.clear();
        self.playlist.update(current, |e| {
            e.flags.from_start = true;
            e.resume_ms = None;
        });
        if self.nav.next.is_none() {
            self.save_position(true).await;
        }

        if self.stop_after == Some(current) {
            info!("Reached stop-after marker at {}", current);
            self.stop(false, false).await;
            return;
        }

        self.determine_prev_next();
        self.next(false).await;
    }

    async fn on_playback_error(&mut self) {
        let Some(current) = self.current else {
            return;
        };

        let location = self
            .playlist
            .get(current)
            .map(|e| e.location)
            .unwrap_or_default();
        warn!("Playback failed for {}", location);
        self.emit(PlayerEvent::Notification(Notification::PlaybackFailed {
            location,
        }));

        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.playlist.len().max(1) {
            warn!("Every entry failed in a row, stopping");
            self.stop(false, false).await;
            return;
        }

        if self.nav.next == Some(current) {
            self.stop(false, false).await;
        } else {
            // Forced, so a broken entry also ends repeat-one
            self.next(true).await;
        }
    }

    async fn on_time_changed(&mut self, time_ms: i64) {
        if let Some(start) = self.ab.loop_target(time_ms) {
            debug!("A-B window left at {}ms, back to {}ms", time_ms, start);
            self.engine.seek_time(start);
        }

        if (time_ms - self.last_save_time_ms).abs() >= self.config.save_interval_ms {
            self.last_save_time_ms = time_ms;
            self.save_position(false).await;
        }
    }

    // ===== Persistence =====

    /// Persist the session; best-effort, failures are only logged
    async fn save_position(&mut self, reset: bool) {
        let Some(current) = self.current else {
            return;
        };
        let locations = self.playlist.locations();
        if locations.is_empty() {
            return;
        }

        let snapshot = PlaybackSnapshot {
            locations,
            index: if reset { 0 } else { current },
            elapsed_ms: if reset { 0 } else { self.engine.time_ms() },
            shuffling: self.shuffling,
            repeat_mode: self.repeat,
            paused: !reset && self.state == PlayerState::Paused,
            rate: self.engine.persisted_rate(),
        };

        if let Err(err) = self.bridge.save_snapshot(&snapshot).await {
            warn!("Failed to save playback position: {}", err);
        }
    }

    /// Keep the watched position of a video so coming back resumes it
    fn remember_resume_point(&mut self) {
        let Some(current) = self.current else {
            return;
        };
        let time_ms = self.engine.time_ms();
        let length_ms = self.engine.length_ms();
        if length_ms <= 0 {
            return;
        }

        self.playlist.update(current, |entry| {
            if entry.kind != MediaKind::Video || entry.flags.force_audio {
                return;
            }
            let watched = time_ms as f64 / length_ms as f64 > WATCHED_RATIO
                || length_ms - time_ms < WATCHED_TAIL_MS;
            entry.resume_ms = if watched { None } else { Some(time_ms) };
        });
    }

    // ===== Presentation =====

    fn set_state(&mut self, state: PlayerState) {
        if self.state != state {
            self.state = state;
            self.emit(PlayerEvent::StateChanged { state });
        }
    }

    fn emit(&self, event: PlayerEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    fn build_status(&self) -> PlaybackStatus {
        let elapsed_before_ms = match self.current {
            Some(_) if self.shuffle_effective() => {
                self.playlist.total_length_ms(self.history.iter())
            }
            Some(current) => self.playlist.total_length_ms(0..current),
            None => 0,
        };

        PlaybackStatus {
            state: self.state,
            current: self.current,
            next: self.nav.next,
            prev: self.nav.prev,
            len: self.playlist.len(),
            current_location: self
                .current
                .and_then(|c| self.playlist.get(c))
                .map(|e| e.location),
            shuffling: self.shuffling,
            repeat_mode: self.repeat,
            time_ms: self.engine.time_ms(),
            length_ms: self.engine.length_ms(),
            elapsed_before_ms,
            ab_repeat: self.ab,
            stop_after: self.stop_after,
            rate: self.engine.status().rate,
        }
    }

    fn publish_status(&self) {
        self.status.send_replace(self.build_status());
    }
}

/// Where index `index` ends up after moving `from` before `to`
fn shift_moved(index: usize, from: usize, to: usize) -> usize {
    if index == from {
        if to > from {
            to - 1
        } else {
            to
        }
    } else if to <= index && index < from {
        index + 1
    } else if from < index && index < to {
        index - 1
    } else {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::shift_moved;

    fn apply_move(items: &mut Vec<char>, from: usize, to: usize) {
        let item = items.remove(from);
        items.insert(if to > from { to - 1 } else { to }, item);
    }

    #[test]
    fn shift_moved_follows_the_entry() {
        let original = vec!['a', 'b', 'c', 'd', 'e'];
        for from in 0..original.len() {
            for to in 0..=original.len() {
                let mut moved = original.clone();
                apply_move(&mut moved, from, to);
                for (index, item) in original.iter().enumerate() {
                    assert_eq!(
                        moved[shift_moved(index, from, to)],
                        *item,
                        "move {} -> {} lost index {}",
                        from,
                        to,
                        index
                    );
                }
            }
        }
    }
}
