//! Media engine seam and adapter
//!
//! A [`MediaEngine`] wraps one native player handle. The [`EngineAdapter`]
//! owns at most one of them, tracks what the engine reported (seekable,
//! pausable, length, time) and tags every event with a generation so that
//! callbacks from a released handle, or from an entry that has since been
//! replaced on the same handle, are ignored.
//!
//! Engines report through an [`EngineEventSink`], which feeds the same
//! ordered queue as commands. `TimeChanged` is coalesced in the sink: it is
//! only queued when it moved more than the configured threshold away from the
//! last queued time, while the latest value is always kept for readers.

use crate::error::{PlaybackError, Result};
use crate::orchestrator::Inbox;
use encore_core::MediaEntry;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Normalized engine callback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    Playing,
    Paused,
    Stopped,
    EndReached,
    EncounteredError,
    /// Current time in milliseconds
    TimeChanged(i64),
    /// Current position as a fraction of the length
    PositionChanged(f32),
    /// Length in milliseconds
    LengthChanged(i64),
    SeekableChanged(bool),
    PausableChanged(bool),
}

/// Elementary stream kinds for track selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
    Subtitle,
}

/// Result of a transport request that may not apply to the current stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Applied,
    /// Stream cannot do this right now (not pausable, not seekable, nothing loaded)
    NotApplicable,
}

impl Outcome {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

/// One native player handle
///
/// Calls are only made from the orchestrator's worker. Implementations report
/// back asynchronously through the [`EngineEventSink`] they were created with.
pub trait MediaEngine: Send {
    /// Prepare `entry` for playback starting at `start_time_ms`
    fn load(&mut self, entry: &MediaEntry, start_time_ms: i64) -> Result<()>;

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    fn seek_time(&mut self, time_ms: i64);

    /// Seek to a fraction of the length (0.0..=1.0)
    fn seek_position(&mut self, fraction: f32);

    fn set_rate(&mut self, rate: f32);

    /// Select a track by id; `false` when the engine has no such track
    fn select_track(&mut self, kind: TrackKind, id: i32) -> bool;

    /// Volume in percent; above 100 means boosted
    fn volume(&self) -> i32;

    fn set_volume(&mut self, volume: i32);

    /// Detach any video output before the handle goes away
    fn detach_surface(&mut self) {}

    /// Free the native handle
    fn release(&mut self);
}

/// Creates engine handles on demand
pub trait EngineFactory: Send {
    fn create(&mut self, sink: EngineEventSink) -> Result<Box<dyn MediaEngine>>;
}

impl<F> EngineFactory for F
where
    F: FnMut(EngineEventSink) -> Result<Box<dyn MediaEngine>> + Send,
{
    fn create(&mut self, sink: EngineEventSink) -> Result<Box<dyn MediaEngine>> {
        self(sink)
    }
}

#[derive(Debug)]
struct TimeGate {
    latest: AtomicI64,
    forwarded: AtomicI64,
    threshold: i64,
}

impl TimeGate {
    fn new(threshold: i64) -> Self {
        Self {
            latest: AtomicI64::new(0),
            forwarded: AtomicI64::new(0),
            threshold,
        }
    }

    fn admit(&self, time_ms: i64) -> bool {
        self.latest.store(time_ms, Ordering::Release);
        let last = self.forwarded.load(Ordering::Acquire);
        if (time_ms - last).abs() > self.threshold {
            self.forwarded.store(time_ms, Ordering::Release);
            true
        } else {
            false
        }
    }

    fn reset(&self, time_ms: i64) {
        self.latest.store(time_ms, Ordering::Release);
        self.forwarded.store(time_ms, Ordering::Release);
    }

    fn latest(&self) -> i64 {
        self.latest.load(Ordering::Acquire)
    }
}

/// Handle an engine uses to report events
///
/// Cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct EngineEventSink {
    inbox: mpsc::UnboundedSender<Inbox>,
    generation: Arc<AtomicU64>,
    gate: Arc<TimeGate>,
}

impl EngineEventSink {
    /// Report an event; returns `false` once the orchestrator is gone
    pub fn emit(&self, event: EngineEvent) -> bool {
        if let EngineEvent::TimeChanged(time_ms) = event {
            if !self.gate.admit(time_ms) {
                return !self.inbox.is_closed();
            }
        }

        self.inbox
            .send(Inbox::Engine {
                generation: self.generation(),
                event,
            })
            .is_ok()
    }

    /// Generation stamped on events emitted now
    ///
    /// Moves on whenever the owning adapter starts another entry on this
    /// handle; frozen once the handle is released.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

/// Last state reported by the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStatus {
    pub playing: bool,
    pub seekable: bool,
    pub pausable: bool,
    pub length_ms: i64,
    pub position: f32,
    pub rate: f32,
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            playing: false,
            seekable: false,
            pausable: false,
            length_ms: 0,
            position: 0.0,
            rate: 1.0,
        }
    }
}

/// Owner of the single engine handle
pub struct EngineAdapter {
    factory: Box<dyn EngineFactory>,
    engine: Option<Box<dyn MediaEngine>>,
    inbox: mpsc::UnboundedSender<Inbox>,
    generation: u64,
    // Shared with the current handle's sink
    stamp: Arc<AtomicU64>,
    gate: Arc<TimeGate>,
    coalesce_ms: i64,
    status: EngineStatus,
    persisted_rate: f32,
}

impl EngineAdapter {
    pub(crate) fn new(
        factory: Box<dyn EngineFactory>,
        inbox: mpsc::UnboundedSender<Inbox>,
        coalesce_ms: i64,
    ) -> Self {
        Self {
            factory,
            engine: None,
            inbox,
            generation: 0,
            stamp: Arc::new(AtomicU64::new(0)),
            gate: Arc::new(TimeGate::new(coalesce_ms)),
            coalesce_ms,
            status: EngineStatus::default(),
            persisted_rate: 1.0,
        }
    }

    fn sink(&self) -> EngineEventSink {
        EngineEventSink {
            inbox: self.inbox.clone(),
            generation: Arc::clone(&self.stamp),
            gate: Arc::clone(&self.gate),
        }
    }

    fn engine(&mut self) -> Result<&mut Box<dyn MediaEngine>> {
        if self.engine.is_none() {
            self.generation += 1;
            self.stamp = Arc::new(AtomicU64::new(self.generation));
            self.gate = Arc::new(TimeGate::new(self.coalesce_ms));
            let sink = self.sink();
            let engine = self.factory.create(sink)?;
            debug!("Created engine handle (generation {})", self.generation);
            self.engine = Some(engine);
        }

        self.engine
            .as_mut()
            .ok_or_else(|| PlaybackError::EngineUnavailable("no engine handle".to_string()))
    }

    /// Load `entry` and start it at `start_time_ms`
    ///
    /// Entries flagged `start_paused` are loaded but not played. Events the
    /// handle reported for the previous entry stop matching from here on.
    pub fn start_playback(&mut self, entry: &MediaEntry, start_time_ms: i64) -> Result<()> {
        self.engine()?;
        self.generation += 1;
        self.stamp.store(self.generation, Ordering::Release);

        let rate = self.status.rate;
        self.status = EngineStatus {
            length_ms: entry.length_ms.max(0),
            rate,
            ..EngineStatus::default()
        };
        self.gate.reset(start_time_ms);

        let engine = self.engine()?;
        engine.load(entry, start_time_ms)?;
        if !entry.flags.start_paused {
            engine.play();
        }
        Ok(())
    }

    pub fn play(&mut self) -> Outcome {
        match self.engine.as_deref_mut() {
            Some(engine) => {
                engine.play();
                Outcome::Applied
            }
            None => Outcome::NotApplicable,
        }
    }

    /// Pause if the stream is playing and pausable
    pub fn pause(&mut self) -> Outcome {
        if !(self.status.playing && self.status.pausable) {
            return Outcome::NotApplicable;
        }
        match self.engine.as_deref_mut() {
            Some(engine) => {
                engine.pause();
                Outcome::Applied
            }
            None => Outcome::NotApplicable,
        }
    }

    pub fn stop(&mut self) {
        if let Some(engine) = self.engine.as_deref_mut() {
            engine.stop();
        }
        self.status.playing = false;
    }

    /// Seek to a time if the stream is seekable
    pub fn seek_time(&mut self, time_ms: i64) -> Outcome {
        if !self.status.seekable {
            return Outcome::NotApplicable;
        }
        match self.engine.as_deref_mut() {
            Some(engine) => {
                let time_ms = time_ms.max(0);
                engine.seek_time(time_ms);
                self.gate.reset(time_ms);
                Outcome::Applied
            }
            None => Outcome::NotApplicable,
        }
    }

    /// Seek to a fraction of the length if the stream is seekable
    pub fn seek_position(&mut self, fraction: f32) -> Outcome {
        if !self.status.seekable {
            return Outcome::NotApplicable;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let length_ms = self.status.length_ms;
        match self.engine.as_deref_mut() {
            Some(engine) => {
                engine.seek_position(fraction);
                self.status.position = fraction;
                if length_ms > 0 {
                    self.gate.reset((length_ms as f64 * f64::from(fraction)) as i64);
                }
                Outcome::Applied
            }
            None => Outcome::NotApplicable,
        }
    }

    /// Change the rate; `persist` also makes it the rate saved with the session
    pub fn set_rate(&mut self, rate: f32, persist: bool) {
        if let Some(engine) = self.engine.as_deref_mut() {
            engine.set_rate(rate);
        }
        self.status.rate = rate;
        if persist {
            self.persisted_rate = rate;
        }
    }

    /// Remember a rate restored from storage without applying it
    pub fn remember_rate(&mut self, rate: f32) {
        self.persisted_rate = rate;
    }

    pub fn persisted_rate(&self) -> f32 {
        self.persisted_rate
    }

    pub fn select_track(&mut self, kind: TrackKind, id: i32) -> Outcome {
        match self.engine.as_deref_mut() {
            Some(engine) => {
                if engine.select_track(kind, id) {
                    Outcome::Applied
                } else {
                    Outcome::NotApplicable
                }
            }
            None => Outcome::NotApplicable,
        }
    }

    pub fn set_volume(&mut self, volume: i32) -> Result<()> {
        self.engine()?.set_volume(volume.max(0));
        Ok(())
    }

    pub fn volume(&self) -> i32 {
        self.engine.as_deref().map_or(100, |e| e.volume())
    }

    /// Tear down and recreate the handle
    ///
    /// A boosted volume (above 100) carries over to the new handle.
    pub fn restart(&mut self) -> Result<()> {
        let volume = self.volume();
        self.release();
        let engine = self.engine()?;
        if volume > 100 {
            engine.set_volume(volume);
        }
        info!("Engine restarted (generation {})", self.generation);
        Ok(())
    }

    /// Release the handle; safe to call repeatedly
    pub fn release(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.detach_surface();
            engine.release();
            // Late callbacks from the released handle must not match
            self.generation += 1;
            debug!("Engine handle released");
        }
        self.status = EngineStatus {
            rate: self.status.rate,
            ..EngineStatus::default()
        };
    }

    pub fn is_released(&self) -> bool {
        self.engine.is_none()
    }

    /// Fold an incoming event into the tracked status
    ///
    /// Returns `None` for events from a handle that is no longer current, or
    /// for events the current handle reported before its latest load.
    pub(crate) fn observe(&mut self, generation: u64, event: EngineEvent) -> Option<EngineEvent> {
        if generation != self.generation || self.engine.is_none() {
            debug!("Ignoring {:?} from stale generation {}", event, generation);
            return None;
        }

        match event {
            EngineEvent::Playing => self.status.playing = true,
            EngineEvent::Paused
            | EngineEvent::Stopped
            | EngineEvent::EndReached
            | EngineEvent::EncounteredError => self.status.playing = false,
            EngineEvent::TimeChanged(_) => {}
            EngineEvent::PositionChanged(position) => self.status.position = position,
            EngineEvent::LengthChanged(length_ms) => self.status.length_ms = length_ms,
            EngineEvent::SeekableChanged(seekable) => self.status.seekable = seekable,
            EngineEvent::PausableChanged(pausable) => self.status.pausable = pausable,
        }

        Some(event)
    }

    /// Latest time reported by the engine, coalesced or not
    pub fn time_ms(&self) -> i64 {
        self.gate.latest()
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status.playing
    }

    pub fn is_seekable(&self) -> bool {
        self.status.seekable
    }

    pub fn length_ms(&self) -> i64 {
        self.status.length_ms
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Calls {
        log: Vec<String>,
        created: usize,
    }

    struct FakeEngine {
        calls: Arc<Mutex<Calls>>,
        volume: i32,
    }

    impl FakeEngine {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().log.push(call.into());
        }
    }

    impl MediaEngine for FakeEngine {
        fn load(&mut self, entry: &MediaEntry, start_time_ms: i64) -> Result<()> {
            if entry.location.starts_with("broken:") {
                return Err(PlaybackError::Engine("cannot open".to_string()));
            }
            self.record(format!("load {} @{}", entry.location, start_time_ms));
            Ok(())
        }
        fn play(&mut self) {
            self.record("play");
        }
        fn pause(&mut self) {
            self.record("pause");
        }
        fn stop(&mut self) {
            self.record("stop");
        }
        fn seek_time(&mut self, time_ms: i64) {
            self.record(format!("seek {}", time_ms));
        }
        fn seek_position(&mut self, fraction: f32) {
            self.record(format!("seek {:.2}", fraction));
        }
        fn set_rate(&mut self, rate: f32) {
            self.record(format!("rate {}", rate));
        }
        fn select_track(&mut self, _kind: TrackKind, id: i32) -> bool {
            id >= 0
        }
        fn volume(&self) -> i32 {
            self.volume
        }
        fn set_volume(&mut self, volume: i32) {
            self.volume = volume;
        }
        fn detach_surface(&mut self) {
            self.record("detach");
        }
        fn release(&mut self) {
            self.record("release");
        }
    }

    fn adapter() -> (
        EngineAdapter,
        Arc<Mutex<Calls>>,
        mpsc::UnboundedReceiver<Inbox>,
    ) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let shared = Arc::clone(&calls);
        let factory = move |_sink: EngineEventSink| -> Result<Box<dyn MediaEngine>> {
            shared.lock().unwrap().created += 1;
            Ok(Box::new(FakeEngine {
                calls: Arc::clone(&shared),
                volume: 100,
            }))
        };
        let (tx, rx) = mpsc::unbounded_channel();
        (EngineAdapter::new(Box::new(factory), tx, 950), calls, rx)
    }

    fn drain_times(rx: &mut mpsc::UnboundedReceiver<Inbox>) -> Vec<i64> {
        let mut times = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let Inbox::Engine {
                event: EngineEvent::TimeChanged(t),
                ..
            } = message
            {
                times.push(t);
            }
        }
        times
    }

    #[test]
    fn time_changes_are_coalesced_but_latest_is_kept() {
        let (mut adapter, _calls, mut rx) = adapter();
        adapter
            .start_playback(&MediaEntry::new("file:///a.mp3"), 0)
            .unwrap();
        let sink = adapter.sink();

        for t in [100, 500, 1200, 1300, 2200, 2300] {
            sink.emit(EngineEvent::TimeChanged(t));
        }

        assert_eq!(drain_times(&mut rx), vec![1200, 2200]);
        assert_eq!(adapter.time_ms(), 2300);
    }

    #[test]
    fn start_playback_loads_then_plays() {
        let (mut adapter, calls, _rx) = adapter();
        let mut entry = MediaEntry::new("file:///a.mp3");
        adapter.start_playback(&entry, 1500).unwrap();

        entry.flags.start_paused = true;
        adapter.start_playback(&entry, 0).unwrap();

        let log = calls.lock().unwrap().log.clone();
        assert_eq!(
            log,
            vec!["load file:///a.mp3 @1500", "play", "load file:///a.mp3 @0"]
        );
        assert_eq!(adapter.time_ms(), 0);
    }

    #[test]
    fn load_failure_is_returned() {
        let (mut adapter, _calls, _rx) = adapter();
        let err = adapter
            .start_playback(&MediaEntry::new("broken:clip"), 0)
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Engine(_)));
    }

    #[test]
    fn pause_and_seek_not_applicable_until_reported() {
        let (mut adapter, calls, _rx) = adapter();
        adapter
            .start_playback(&MediaEntry::new("file:///a.mp3"), 0)
            .unwrap();
        let generation = adapter.generation();

        assert_eq!(adapter.pause(), Outcome::NotApplicable);
        assert_eq!(adapter.seek_time(1000), Outcome::NotApplicable);

        adapter.observe(generation, EngineEvent::Playing);
        adapter.observe(generation, EngineEvent::PausableChanged(true));
        adapter.observe(generation, EngineEvent::SeekableChanged(true));

        assert_eq!(adapter.pause(), Outcome::Applied);
        assert_eq!(adapter.seek_time(1000), Outcome::Applied);
        assert_eq!(adapter.time_ms(), 1000);
        assert!(calls.lock().unwrap().log.contains(&"seek 1000".to_string()));
    }

    #[test]
    fn release_is_idempotent_and_detaches_first() {
        let (mut adapter, calls, _rx) = adapter();
        adapter
            .start_playback(&MediaEntry::new("file:///a.mp3"), 0)
            .unwrap();

        adapter.release();
        adapter.release();

        let log = calls.lock().unwrap().log.clone();
        let tail: Vec<&str> = log.iter().rev().take(2).rev().map(String::as_str).collect();
        assert_eq!(tail, vec!["detach", "release"]);
        assert_eq!(log.iter().filter(|c| *c == "release").count(), 1);
        assert!(adapter.is_released());
    }

    #[test]
    fn events_from_released_handle_are_ignored() {
        let (mut adapter, _calls, _rx) = adapter();
        adapter
            .start_playback(&MediaEntry::new("file:///a.mp3"), 0)
            .unwrap();
        let old = adapter.generation();

        adapter.restart().unwrap();
        assert_ne!(adapter.generation(), old);
        assert_eq!(adapter.observe(old, EngineEvent::EndReached), None);
        assert_eq!(
            adapter.observe(adapter.generation(), EngineEvent::Playing),
            Some(EngineEvent::Playing)
        );
    }

    #[test]
    fn events_from_previous_entry_are_ignored() {
        let (mut adapter, _calls, mut rx) = adapter();
        adapter
            .start_playback(&MediaEntry::new("file:///a.mp3"), 0)
            .unwrap();
        let sink = adapter.sink();
        sink.emit(EngineEvent::EndReached);

        adapter
            .start_playback(&MediaEntry::new("file:///b.mp3"), 0)
            .unwrap();
        sink.emit(EngineEvent::Playing);

        let mut forwarded = Vec::new();
        while let Ok(Inbox::Engine { generation, event }) = rx.try_recv() {
            forwarded.extend(adapter.observe(generation, event));
        }
        assert_eq!(forwarded, vec![EngineEvent::Playing]);
        assert!(adapter.is_playing());
    }

    #[test]
    fn select_track_needs_an_engine_that_accepts_it() {
        let (mut adapter, _calls, _rx) = adapter();
        assert_eq!(adapter.select_track(TrackKind::Audio, 1), Outcome::NotApplicable);

        adapter
            .start_playback(&MediaEntry::new("file:///a.mp3"), 0)
            .unwrap();
        assert_eq!(adapter.select_track(TrackKind::Audio, 1), Outcome::Applied);
        assert_eq!(
            adapter.select_track(TrackKind::Subtitle, -1),
            Outcome::NotApplicable
        );
    }

    #[test]
    fn restart_keeps_boosted_volume_only() {
        let (mut adapter, calls, _rx) = adapter();
        adapter.set_volume(150).unwrap();
        adapter.restart().unwrap();
        assert_eq!(adapter.volume(), 150);
        assert_eq!(calls.lock().unwrap().created, 2);

        adapter.set_volume(80).unwrap();
        adapter.restart().unwrap();
        // Not boosted: the new handle keeps its own default
        assert_eq!(adapter.volume(), 100);
        assert_eq!(calls.lock().unwrap().created, 3);
    }

    #[test]
    fn persisted_rate_only_changes_when_asked() {
        let (mut adapter, _calls, _rx) = adapter();
        adapter.set_rate(1.5, false);
        assert_eq!(adapter.persisted_rate(), 1.0);
        adapter.set_rate(1.25, true);
        assert_eq!(adapter.persisted_rate(), 1.25);
        assert_eq!(adapter.status().rate, 1.25);
    }
}
