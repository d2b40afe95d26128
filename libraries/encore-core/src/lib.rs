//! Encore Core
//!
//! Platform-agnostic types, errors and collaborator traits shared by the
//! Encore playback crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `MediaEntry`, `MediaKind`, `EntryFlags`, `RepeatMode`, `PlaybackSnapshot`
//! - **Core Traits**: `PersistenceBridge` (save/restore of the playback session)
//! - **Error Handling**: Unified `EncoreError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use encore_core::types::{MediaEntry, MediaKind, PlaybackSnapshot, RepeatMode};
//!
//! let entry = MediaEntry::new("file:///music/intro.flac");
//! assert_eq!(entry.kind, MediaKind::Audio);
//!
//! let snapshot = PlaybackSnapshot::new(vec![entry.location.clone()], 0)
//!     .with_repeat_mode(RepeatMode::All);
//! assert_eq!(snapshot.repeat_mode.as_i32(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod persistence;
pub mod types;

// Re-export commonly used types
pub use error::{EncoreError, Result};
pub use persistence::PersistenceBridge;
pub use types::*;
