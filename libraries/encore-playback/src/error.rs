//! Error types for playback orchestration

use thiserror::Error;

/// Playback errors
///
/// Only caller mistakes and lifecycle conditions surface here. Failures of the
/// media engine during playback are absorbed by the orchestrator and reported
/// as notifications instead.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Index outside the playlist bounds
    #[error("Index {index} out of range for playlist of size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    /// Operation needs at least one entry
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// Argument rejected before touching any state
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No engine handle could be created (transient)
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine refused a request
    #[error("Engine error: {0}")]
    Engine(String),

    /// The orchestrator stopped accepting commands
    #[error("Orchestrator is shutting down")]
    ShuttingDown,

    /// Error from the core crate
    #[error(transparent)]
    Core(#[from] encore_core::EncoreError),
}

impl PlaybackError {
    /// Whether retrying the same command later could succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::EngineUnavailable(_))
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
