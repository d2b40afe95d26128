//! [`PersistenceBridge`] implementations

use crate::snapshot;
use async_trait::async_trait;
use encore_core::{PersistenceBridge, PlaybackSnapshot};
use sqlx::SqlitePool;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Session store backed by the `playback_snapshot` table
#[derive(Debug, Clone)]
pub struct SqliteBridge {
    pool: SqlitePool,
}

impl SqliteBridge {
    /// Wrap a pool that already ran [`crate::run_migrations`]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl PersistenceBridge for SqliteBridge {
    async fn save_snapshot(&self, snapshot: &PlaybackSnapshot) -> encore_core::Result<()> {
        snapshot::upsert(&self.pool, snapshot).await?;
        debug!(
            "Saved session: {} entries at {} ({}ms)",
            snapshot.locations.len(),
            snapshot.index,
            snapshot.elapsed_ms
        );
        Ok(())
    }

    async fn load_snapshot(&self) -> encore_core::Result<Option<PlaybackSnapshot>> {
        Ok(snapshot::get(&self.pool).await?)
    }
}

/// Session store that lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryBridge {
    snapshot: Mutex<Option<PlaybackSnapshot>>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved snapshot
    pub fn current(&self) -> Option<PlaybackSnapshot> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PersistenceBridge for MemoryBridge {
    async fn save_snapshot(&self, snapshot: &PlaybackSnapshot) -> encore_core::Result<()> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }

    async fn load_snapshot(&self) -> encore_core::Result<Option<PlaybackSnapshot>> {
        Ok(self.current())
    }
}
