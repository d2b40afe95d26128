//! Clock-driven stand-in for a native media engine
//!
//! Positions advance on a tokio interval. Local paths that do not exist fail
//! to load, streams never end and cannot seek.

use crate::config::SimulationSettings;
use encore_core::{MediaEntry, MediaKind};
use encore_playback::{EngineEvent, EngineEventSink, MediaEngine, PlaybackError, TrackKind};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct SimulatedEngine {
    sink: EngineEventSink,
    settings: SimulationSettings,
    position_ms: Arc<AtomicI64>,
    length_ms: i64,
    rate: f32,
    volume: i32,
    ticker: Option<JoinHandle<()>>,
}

impl SimulatedEngine {
    pub fn new(sink: EngineEventSink, settings: SimulationSettings) -> Self {
        Self {
            sink,
            settings,
            position_ms: Arc::new(AtomicI64::new(0)),
            length_ms: 0,
            rate: 1.0,
            volume: 100,
            ticker: None,
        }
    }

    fn start_ticker(&mut self) {
        self.stop_ticker();

        let sink = self.sink.clone();
        let position = Arc::clone(&self.position_ms);
        let length_ms = self.length_ms;
        let tick = Duration::from_millis(self.settings.tick_ms);
        let step = (self.settings.tick_ms as f32 * self.settings.speed * self.rate) as i64;

        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.tick().await;
            loop {
                interval.tick().await;
                let now = position.fetch_add(step, Ordering::AcqRel) + step;
                if length_ms > 0 && now >= length_ms {
                    position.store(length_ms, Ordering::Release);
                    sink.emit(EngineEvent::TimeChanged(length_ms));
                    sink.emit(EngineEvent::EndReached);
                    break;
                }
                if !sink.emit(EngineEvent::TimeChanged(now)) {
                    break;
                }
                if length_ms > 0 {
                    sink.emit(EngineEvent::PositionChanged(now as f32 / length_ms as f32));
                }
            }
        }));
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

fn is_reachable(entry: &MediaEntry) -> bool {
    if entry.kind == MediaKind::Stream {
        return true;
    }
    let path = entry
        .location
        .strip_prefix("file://")
        .unwrap_or(&entry.location);
    Path::new(path).exists()
}

impl MediaEngine for SimulatedEngine {
    fn load(&mut self, entry: &MediaEntry, start_time_ms: i64) -> encore_playback::Result<()> {
        self.stop_ticker();
        if !is_reachable(entry) {
            return Err(PlaybackError::Engine(format!(
                "{} does not exist",
                entry.location
            )));
        }

        let stream = entry.kind == MediaKind::Stream;
        self.length_ms = if stream {
            0
        } else if entry.length_ms > 0 {
            entry.length_ms
        } else {
            self.settings.entry_length_ms
        };
        self.position_ms.store(start_time_ms.max(0), Ordering::Release);
        debug!("Simulating {} ({}ms)", entry.location, self.length_ms);

        self.sink.emit(EngineEvent::LengthChanged(self.length_ms));
        self.sink.emit(EngineEvent::PausableChanged(true));
        self.sink.emit(EngineEvent::SeekableChanged(!stream));
        Ok(())
    }

    fn play(&mut self) {
        self.start_ticker();
        self.sink.emit(EngineEvent::Playing);
    }

    fn pause(&mut self) {
        self.stop_ticker();
        self.sink.emit(EngineEvent::Paused);
    }

    fn stop(&mut self) {
        self.stop_ticker();
        self.sink.emit(EngineEvent::Stopped);
    }

    fn seek_time(&mut self, time_ms: i64) {
        self.position_ms.store(time_ms.max(0), Ordering::Release);
    }

    fn seek_position(&mut self, fraction: f32) {
        let time_ms = (self.length_ms as f64 * f64::from(fraction)) as i64;
        self.position_ms.store(time_ms, Ordering::Release);
    }

    fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
        if self.ticker.as_ref().is_some_and(|t| !t.is_finished()) {
            self.start_ticker();
        }
    }

    fn select_track(&mut self, kind: TrackKind, id: i32) -> bool {
        // One audio track, nothing else
        kind == TrackKind::Audio && id == 0
    }

    fn volume(&self) -> i32 {
        self.volume
    }

    fn set_volume(&mut self, volume: i32) {
        self.volume = volume;
    }

    fn release(&mut self) {
        self.stop_ticker();
    }
}

impl Drop for SimulatedEngine {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
