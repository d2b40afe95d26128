//! Presentation events
//!
//! Two channels leave the orchestrator:
//! - an ordered broadcast of [`PlayerEvent`]s for session/notification layers
//! - a single-slot `watch` mailbox holding the latest [`PlaybackStatus`],
//!   for UI refreshes that only care about the most recent state

use crate::engine::EngineEvent;
use crate::playlist::PlaylistChange;
use encore_core::RepeatMode;
use serde::{Deserialize, Serialize};

/// Orchestrator lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// No playlist loaded
    #[default]
    Idle,

    /// Current entry chosen, engine not (yet) playing
    Loaded,

    Playing,

    Paused,

    /// Playback ended or was stopped; a new load starts over
    Stopped,
}

/// User-visible problem surfaced to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// The engine could not play an entry; playback moved on or stopped
    PlaybackFailed { location: String },

    /// A restore found nothing usable to resume
    NothingToResume,
}

/// Events emitted for every observable transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// Navigation or playlist state changed; re-read the status
    Update,

    /// A new entry became current and was handed to the engine
    MediaChanged { index: usize, location: String },

    /// Lifecycle state changed
    StateChanged { state: PlayerState },

    /// Forwarded engine event (after time coalescing)
    Engine(EngineEvent),

    /// Structural playlist change
    Playlist(PlaylistChange),

    Notification(Notification),
}

/// A-B repeat window on the current entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbRepeat {
    pub start: Option<i64>,
    pub stop: Option<i64>,
}

impl AbRepeat {
    /// Place the next point
    ///
    /// The first point becomes the start. A point before the start swaps in as
    /// the new start (the old start becomes the stop); otherwise it is the stop.
    pub fn place(&mut self, time_ms: i64) {
        match self.start {
            None => self.start = Some(time_ms),
            Some(start) if start > time_ms => {
                self.stop = Some(start);
                self.start = Some(time_ms);
            }
            Some(_) => self.stop = Some(time_ms),
        }
    }

    /// Where to jump back to once `time_ms` ran past the stop point
    ///
    /// Seeking before the start point is left alone.
    pub fn loop_target(&self, time_ms: i64) -> Option<i64> {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) if time_ms > stop => Some(start),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Latest orchestrator status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub state: PlayerState,
    pub current: Option<usize>,
    pub next: Option<usize>,
    pub prev: Option<usize>,
    pub len: usize,
    pub current_location: Option<String>,
    /// Shuffle as requested; it only has an effect with three entries or more
    pub shuffling: bool,
    pub repeat_mode: RepeatMode,
    pub time_ms: i64,
    pub length_ms: i64,
    /// Summed length of the entries played before the current one
    pub elapsed_before_ms: i64,
    pub ab_repeat: AbRepeat,
    pub stop_after: Option<usize>,
    pub rate: f32,
}

impl PlaybackStatus {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.prev.is_some()
    }

    pub fn has_current(&self) -> bool {
        self.current.is_some()
    }
}
