//! Shared fixtures: a recording engine and an in-memory session store

#![allow(dead_code)]

use async_trait::async_trait;
use encore_core::{MediaEntry, PersistenceBridge, PlaybackSnapshot};
use encore_playback::{
    EngineEvent, EngineEventSink, MediaEngine, Orchestrator, PlaybackConfig, PlaybackError,
    PlaybackStatus, PlayerEvent, TrackKind,
};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Locations with this prefix fail to load
pub const BROKEN: &str = "broken:";

/// Everything the fake engines were asked to do
#[derive(Debug, Default)]
pub struct EngineLog {
    /// (location, start time) for every load attempt
    pub loads: Vec<(String, i64)>,
    pub seeks: Vec<i64>,
    pub rates: Vec<f32>,
    pub plays: usize,
    pub pauses: usize,
    pub created: usize,
    pub released: usize,
    pub sinks: Vec<EngineEventSink>,
}

struct RecordingEngine {
    log: Arc<Mutex<EngineLog>>,
    volume: i32,
}

impl MediaEngine for RecordingEngine {
    fn load(&mut self, entry: &MediaEntry, start_time_ms: i64) -> encore_playback::Result<()> {
        self.log
            .lock()
            .unwrap()
            .loads
            .push((entry.location.clone(), start_time_ms));
        if entry.location.starts_with(BROKEN) {
            return Err(PlaybackError::Engine(format!("cannot open {}", entry.location)));
        }
        Ok(())
    }

    fn play(&mut self) {
        self.log.lock().unwrap().plays += 1;
    }

    fn pause(&mut self) {
        self.log.lock().unwrap().pauses += 1;
    }

    fn stop(&mut self) {}

    fn seek_time(&mut self, time_ms: i64) {
        self.log.lock().unwrap().seeks.push(time_ms);
    }

    fn seek_position(&mut self, _fraction: f32) {}

    fn set_rate(&mut self, rate: f32) {
        self.log.lock().unwrap().rates.push(rate);
    }

    fn select_track(&mut self, kind: TrackKind, id: i32) -> bool {
        kind == TrackKind::Audio && id >= 0
    }

    fn volume(&self) -> i32 {
        self.volume
    }

    fn set_volume(&mut self, volume: i32) {
        self.volume = volume;
    }

    fn release(&mut self) {
        self.log.lock().unwrap().released += 1;
    }
}

/// Session store that keeps the last snapshot in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub snapshot: Mutex<Option<PlaybackSnapshot>>,
    pub saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn saved(&self) -> Option<PlaybackSnapshot> {
        self.snapshot.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersistenceBridge for MemoryStore {
    async fn save_snapshot(&self, snapshot: &PlaybackSnapshot) -> encore_core::Result<()> {
        *self.snapshot.lock().unwrap() = Some(snapshot.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    async fn load_snapshot(&self) -> encore_core::Result<Option<PlaybackSnapshot>> {
        Ok(self.saved())
    }
}

pub struct Harness {
    pub player: Orchestrator,
    pub worker: JoinHandle<()>,
    pub log: Arc<Mutex<EngineLog>>,
    pub store: Arc<MemoryStore>,
    pub events: broadcast::Receiver<PlayerEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(PlaybackConfig::default(), Arc::new(MemoryStore::default()))
    }

    pub fn with(config: PlaybackConfig, store: Arc<MemoryStore>) -> Self {
        let log = Arc::new(Mutex::new(EngineLog::default()));
        let factory_log = Arc::clone(&log);
        let factory = move |sink: EngineEventSink| -> encore_playback::Result<Box<dyn MediaEngine>> {
            let mut log = factory_log.lock().unwrap();
            log.created += 1;
            log.sinks.push(sink);
            Ok(Box::new(RecordingEngine {
                log: Arc::clone(&factory_log),
                volume: 100,
            }))
        };

        let bridge: Arc<dyn PersistenceBridge> = store.clone();
        let (player, worker) = Orchestrator::spawn(config, factory, bridge);
        let events = player.subscribe();

        Self {
            player,
            worker,
            log,
            store,
            events,
        }
    }

    /// Report an event from the newest engine handle
    pub fn emit(&self, event: EngineEvent) {
        let sink = self.log.lock().unwrap().sinks.last().cloned();
        assert!(sink.expect("no engine created yet").emit(event));
    }

    /// Status after everything queued so far was handled
    pub async fn status(&self) -> PlaybackStatus {
        self.player.current_status().await.unwrap()
    }

    pub fn loads(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .loads
            .iter()
            .map(|(location, _)| location.clone())
            .collect()
    }

    pub fn seeks(&self) -> Vec<i64> {
        self.log.lock().unwrap().seeks.clone()
    }

    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn entries(locations: &[&str]) -> Vec<MediaEntry> {
    locations.iter().map(|l| MediaEntry::new(*l)).collect()
}
