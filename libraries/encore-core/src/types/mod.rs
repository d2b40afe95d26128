//! Domain types

mod media;
mod playback;

pub use media::{EntryFlags, MediaEntry, MediaKind};
pub use playback::{PlaybackSnapshot, RepeatMode};
