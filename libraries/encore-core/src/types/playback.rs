//! Playback session types
use serde::{Deserialize, Serialize};

/// Repeat mode for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop at the end of the playlist
    #[default]
    Off,
    /// Wrap to the start (or reshuffle) at the end
    All,
    /// Replay the current entry indefinitely
    One,
}

impl RepeatMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::All => "all",
            Self::One => "one",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "off" | "none" => Some(Self::Off),
            "all" => Some(Self::All),
            "one" => Some(Self::One),
            _ => None,
        }
    }

    /// Integer code used by persisted snapshots (none = 0, one = 1, all = 2)
    #[must_use]
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Off => 0,
            Self::One => 1,
            Self::All => 2,
        }
    }

    /// Parse the persisted integer code
    #[must_use]
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::One),
            2 => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_rate() -> f32 {
    1.0
}

/// Minimal state needed to resume a session after restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Locations of every playlist entry, in order
    pub locations: Vec<String>,

    /// Index of the current entry
    pub index: usize,

    /// Elapsed time in the current entry (milliseconds)
    pub elapsed_ms: i64,

    /// Whether shuffle was requested
    pub shuffling: bool,

    /// Repeat mode
    pub repeat_mode: RepeatMode,

    /// Whether the session was paused when saved
    #[serde(default)]
    pub paused: bool,

    /// Playback rate when saved
    #[serde(default = "default_rate")]
    pub rate: f32,
}

impl PlaybackSnapshot {
    /// Create a snapshot positioned at `index`, time zero
    pub fn new(locations: Vec<String>, index: usize) -> Self {
        Self {
            locations,
            index,
            elapsed_ms: 0,
            shuffling: false,
            repeat_mode: RepeatMode::Off,
            paused: false,
            rate: default_rate(),
        }
    }

    /// Set the elapsed time
    #[must_use]
    pub fn with_elapsed_ms(mut self, elapsed_ms: i64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// Set the shuffle flag
    #[must_use]
    pub fn with_shuffling(mut self, shuffling: bool) -> Self {
        self.shuffling = shuffling;
        self
    }

    /// Set the repeat mode
    #[must_use]
    pub fn with_repeat_mode(mut self, repeat_mode: RepeatMode) -> Self {
        self.repeat_mode = repeat_mode;
        self
    }

    /// Whether the snapshot points at an existing location
    pub fn is_resumable(&self) -> bool {
        self.index < self.locations.len()
    }

    /// Location of the saved current entry
    pub fn current_location(&self) -> Option<&str> {
        self.locations.get(self.index).map(String::as_str)
    }
}
