//! Orchestrator tuning knobs

use serde::{Deserialize, Serialize};

/// Configuration for the playback orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Minimum jump between two forwarded `TimeChanged` events (default: 950ms)
    pub time_coalesce_ms: i64,

    /// Below this elapsed time `previous()` goes back instead of rewinding (default: 5000ms)
    pub previous_restart_ms: i64,

    /// A second `previous()` within this window after a rewind goes back (default: 5000ms)
    pub previous_double_press_ms: u64,

    /// Elapsed time between periodic position saves (default: 5000ms)
    pub save_interval_ms: i64,

    /// Seed for the shuffle random source; entropy when absent
    pub shuffle_seed: Option<u64>,

    /// Re-apply the persisted rate once a stream becomes seekable (default: false)
    pub persist_rate: bool,

    /// Turn shuffle on when an all-audio list that can shuffle is loaded (default: false)
    pub force_shuffle_audio: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            time_coalesce_ms: 950,
            previous_restart_ms: 5000,
            previous_double_press_ms: 5000,
            save_interval_ms: 5000,
            shuffle_seed: None,
            persist_rate: false,
            force_shuffle_audio: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlaybackConfig::default();
        assert_eq!(config.time_coalesce_ms, 950);
        assert_eq!(config.previous_restart_ms, 5000);
        assert_eq!(config.save_interval_ms, 5000);
        assert_eq!(config.shuffle_seed, None);
        assert!(!config.persist_rate);
    }
}
