//! Playlist entry types
use serde::{Deserialize, Serialize};

const VIDEO_EXTENSIONS: &[&str] = &[
    "3gp", "avi", "flv", "m2ts", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ogv", "ts", "webm",
    "wmv",
];

const STREAM_SCHEMES: &[&str] = &["http", "https", "rtsp", "rtp", "rtmp", "mms", "udp"];

/// Kind of media behind an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Audio,
    Video,
    Stream,
}

impl MediaKind {
    /// Guess the kind from a location alone
    ///
    /// Used when entries are rebuilt from persisted locations, where nothing
    /// but the URI survived.
    #[must_use]
    pub fn guess(location: &str) -> Self {
        if let Some((scheme, _)) = location.split_once("://") {
            if STREAM_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
                return Self::Stream;
            }
        }

        let name = location.rsplit('/').next().unwrap_or(location);
        match name.rsplit_once('.') {
            Some((_, ext)) if VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {
                Self::Video
            }
            _ => Self::Audio,
        }
    }

    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Stream => "stream",
        }
    }
}

/// Mutable per-entry flags
///
/// Flags change in place while the entry keeps its identity in the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryFlags {
    /// Play the audio track only, even for video media
    pub force_audio: bool,

    /// Ignore any remembered position and start at zero (consumed on start)
    pub from_start: bool,

    /// Entry was queued by a benchmark run
    pub benchmark: bool,

    /// Load the entry but leave the engine paused
    pub start_paused: bool,
}

/// One playable item in the playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    /// Location/URI; also the entry's identity in structural events
    pub location: String,

    /// Display title (optional)
    pub title: Option<String>,

    /// Known duration in milliseconds, 0 when unknown
    pub length_ms: i64,

    /// Media kind
    pub kind: MediaKind,

    /// Mutable flags
    pub flags: EntryFlags,

    /// Position remembered for this entry, used as start time when set
    pub resume_ms: Option<i64>,
}

impl MediaEntry {
    /// Create an entry from a location, guessing its kind
    pub fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            kind: MediaKind::guess(&location),
            location,
            title: None,
            length_ms: 0,
            flags: EntryFlags::default(),
            resume_ms: None,
        }
    }

    /// Set the display title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the known length
    #[must_use]
    pub fn with_length_ms(mut self, length_ms: i64) -> Self {
        self.length_ms = length_ms;
        self
    }

    /// Override the guessed kind
    #[must_use]
    pub fn with_kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    /// Whether the entry should be treated as audio for this session
    pub fn plays_as_audio(&self) -> bool {
        self.kind != MediaKind::Video || self.flags.force_audio
    }

    /// Title for display, falling back to the last location segment
    pub fn display_title(&self) -> &str {
        match &self.title {
            Some(title) => title,
            None => self
                .location
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(&self.location),
        }
    }
}
