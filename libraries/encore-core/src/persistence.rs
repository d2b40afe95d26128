//! Persistence seam for playback sessions

use crate::error::Result;
use crate::types::PlaybackSnapshot;
use async_trait::async_trait;

/// Save/restore of the playback session
///
/// Implementations only need to round-trip a [`PlaybackSnapshot`] losslessly;
/// the storage format is theirs. Callers treat every failure as best-effort:
/// a failed save never fails a playback command.
#[async_trait]
pub trait PersistenceBridge: Send + Sync {
    /// Store the snapshot, replacing any previous one
    async fn save_snapshot(&self, snapshot: &PlaybackSnapshot) -> Result<()>;

    /// Load the last stored snapshot, if any
    async fn load_snapshot(&self) -> Result<Option<PlaybackSnapshot>>;
}

#[async_trait]
impl<T: PersistenceBridge + ?Sized> PersistenceBridge for std::sync::Arc<T> {
    async fn save_snapshot(&self, snapshot: &PlaybackSnapshot) -> Result<()> {
        (**self).save_snapshot(snapshot).await
    }

    async fn load_snapshot(&self) -> Result<Option<PlaybackSnapshot>> {
        (**self).load_snapshot().await
    }
}
