//! Encore Storage
//!
//! Persistence of the playback session for Encore.
//!
//! The session is one row: the ordered entry locations, the current index and
//! elapsed time, shuffle/repeat, whether it was paused and the playback rate.
//! [`SqliteBridge`] keeps it in a `SQLite` file, [`MemoryBridge`] for the
//! lifetime of the process.
//!
//! # Example
//!
//! ```rust,no_run
//! use encore_core::{PersistenceBridge, PlaybackSnapshot};
//! use encore_storage::{create_pool, run_migrations, SqliteBridge};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://encore.db").await?;
//! run_migrations(&pool).await?;
//!
//! let bridge = SqliteBridge::new(pool);
//! bridge
//!     .save_snapshot(&PlaybackSnapshot::new(vec!["/music/a.flac".to_string()], 0))
//!     .await?;
//! assert!(bridge.load_snapshot().await?.is_some());
//! # Ok(())
//! # }
//! ```

mod bridge;
mod error;

pub mod snapshot;

pub use bridge::{MemoryBridge, SqliteBridge};
pub use error::{Result, StorageError};

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;
use tracing::debug;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// Call once at startup, before handing the pool to a [`SqliteBridge`].
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://encore.db>`)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    debug!("Creating pool for {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
