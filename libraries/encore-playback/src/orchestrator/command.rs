//! Messages consumed by the playback worker

use crate::engine::{EngineEvent, Outcome, TrackKind};
use crate::error::{PlaybackError, Result};
use crate::events::{AbRepeat, PlaybackStatus};
use encore_core::{MediaEntry, RepeatMode};
use tokio::sync::oneshot;

pub(crate) type Reply<T = ()> = oneshot::Sender<Result<T>>;

/// Seek destination
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// Absolute time in milliseconds
    Time(i64),
    /// Fraction of the length (0.0..=1.0)
    Position(f32),
}

/// One entry of the worker's ordered queue
#[derive(Debug)]
pub(crate) enum Inbox {
    Command(Command),
    Engine { generation: u64, event: EngineEvent },
    /// `StartPlayback` for the given attempt failed synchronously
    StartFailed { attempt: u64 },
}

#[derive(Debug)]
pub(crate) enum Command {
    Load {
        entries: Vec<MediaEntry>,
        start: usize,
        reply: Reply,
    },
    Append {
        entries: Vec<MediaEntry>,
        reply: Reply,
    },
    InsertNext {
        entries: Vec<MediaEntry>,
        reply: Reply,
    },
    Remove {
        index: usize,
        reply: Reply,
    },
    RemoveLocation {
        location: String,
        reply: Reply<usize>,
    },
    Move {
        from: usize,
        to: usize,
        reply: Reply,
    },
    Next {
        force: bool,
        reply: Reply,
    },
    Previous {
        force: bool,
        reply: Reply,
    },
    PlayIndex {
        index: usize,
        reply: Reply,
    },
    Play {
        reply: Reply<Outcome>,
    },
    Pause {
        reply: Reply<Outcome>,
    },
    Seek {
        target: SeekTarget,
        reply: Reply<Outcome>,
    },
    SetRate {
        rate: f32,
        persist: bool,
        reply: Reply,
    },
    SelectTrack {
        kind: TrackKind,
        id: i32,
        reply: Reply<Outcome>,
    },
    SetVolume {
        volume: i32,
        reply: Reply,
    },
    Shuffle {
        reply: Reply<bool>,
    },
    SetRepeatMode {
        mode: RepeatMode,
        reply: Reply,
    },
    SetAbRepeatPoint {
        time_ms: Option<i64>,
        reply: Reply<AbRepeat>,
    },
    ClearAbRepeat {
        reply: Reply,
    },
    SetStopAfter {
        index: Option<usize>,
        reply: Reply,
    },
    RestoreLast {
        reply: Reply<bool>,
    },
    Status {
        reply: Reply<PlaybackStatus>,
    },
    Stop {
        system_exit: bool,
        keep_position: bool,
        reply: Reply,
    },
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Append { .. } => "append",
            Self::InsertNext { .. } => "insert_next",
            Self::Remove { .. } => "remove",
            Self::RemoveLocation { .. } => "remove_location",
            Self::Move { .. } => "move",
            Self::Next { .. } => "next",
            Self::Previous { .. } => "previous",
            Self::PlayIndex { .. } => "play_index",
            Self::Play { .. } => "play",
            Self::Pause { .. } => "pause",
            Self::Seek { .. } => "seek",
            Self::SetRate { .. } => "set_rate",
            Self::SelectTrack { .. } => "select_track",
            Self::SetVolume { .. } => "set_volume",
            Self::Shuffle { .. } => "shuffle",
            Self::SetRepeatMode { .. } => "set_repeat_mode",
            Self::SetAbRepeatPoint { .. } => "set_ab_repeat_point",
            Self::ClearAbRepeat { .. } => "clear_ab_repeat",
            Self::SetStopAfter { .. } => "set_stop_after",
            Self::RestoreLast { .. } => "restore_last",
            Self::Status { .. } => "status",
            Self::Stop { .. } => "stop",
        }
    }

    /// Answer the caller with `ShuttingDown` without running the command
    pub(crate) fn reject(self) {
        match self {
            Self::Load { reply, .. }
            | Self::Append { reply, .. }
            | Self::InsertNext { reply, .. }
            | Self::Remove { reply, .. }
            | Self::Move { reply, .. }
            | Self::Next { reply, .. }
            | Self::Previous { reply, .. }
            | Self::PlayIndex { reply, .. }
            | Self::SetRate { reply, .. }
            | Self::SetVolume { reply, .. }
            | Self::SetRepeatMode { reply, .. }
            | Self::ClearAbRepeat { reply }
            | Self::SetStopAfter { reply, .. }
            | Self::Stop { reply, .. } => {
                let _ = reply.send(Err(PlaybackError::ShuttingDown));
            }
            Self::RemoveLocation { reply, .. } => {
                let _ = reply.send(Err(PlaybackError::ShuttingDown));
            }
            Self::Play { reply }
            | Self::Pause { reply }
            | Self::Seek { reply, .. }
            | Self::SelectTrack { reply, .. } => {
                let _ = reply.send(Err(PlaybackError::ShuttingDown));
            }
            Self::Shuffle { reply } | Self::RestoreLast { reply } => {
                let _ = reply.send(Err(PlaybackError::ShuttingDown));
            }
            Self::SetAbRepeatPoint { reply, .. } => {
                let _ = reply.send(Err(PlaybackError::ShuttingDown));
            }
            Self::Status { reply } => {
                let _ = reply.send(Err(PlaybackError::ShuttingDown));
            }
        }
    }
}
