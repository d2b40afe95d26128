//! Queries on the single-row `playback_snapshot` table

use crate::error::{Result, StorageError};
use chrono::{DateTime, TimeZone, Utc};
use encore_core::{PlaybackSnapshot, RepeatMode};
use sqlx::{Row, SqlitePool};

/// Load the stored snapshot, if any
pub async fn get(pool: &SqlitePool) -> Result<Option<PlaybackSnapshot>> {
    let row = sqlx::query(
        "SELECT locations_json, current_index, elapsed_ms, shuffling, repeat_mode, paused, rate
         FROM playback_snapshot WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let locations_json: String = row.try_get("locations_json")?;
    let locations: Vec<String> = serde_json::from_str(&locations_json)?;
    let index: i64 = row.try_get("current_index")?;
    let repeat_code: i64 = row.try_get("repeat_mode")?;

    let index = usize::try_from(index)
        .map_err(|_| StorageError::Corrupt(format!("negative index {}", index)))?;
    // Unknown codes come from newer writers; fall back rather than refuse the session
    let repeat_mode = RepeatMode::from_i32(repeat_code as i32).unwrap_or_default();

    Ok(Some(PlaybackSnapshot {
        locations,
        index,
        elapsed_ms: row.try_get::<i64, _>("elapsed_ms")?.max(0),
        shuffling: row.try_get::<i64, _>("shuffling")? != 0,
        repeat_mode,
        paused: row.try_get::<i64, _>("paused")? != 0,
        rate: row.try_get::<f64, _>("rate")? as f32,
    }))
}

/// Create or replace the stored snapshot
pub async fn upsert(pool: &SqlitePool, snapshot: &PlaybackSnapshot) -> Result<()> {
    let locations_json = serde_json::to_string(&snapshot.locations)?;
    let now = Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO playback_snapshot
         (id, locations_json, current_index, elapsed_ms, shuffling, repeat_mode, paused, rate, updated_at)
         VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id)
         DO UPDATE SET
            locations_json = excluded.locations_json,
            current_index = excluded.current_index,
            elapsed_ms = excluded.elapsed_ms,
            shuffling = excluded.shuffling,
            repeat_mode = excluded.repeat_mode,
            paused = excluded.paused,
            rate = excluded.rate,
            updated_at = excluded.updated_at",
    )
    .bind(locations_json)
    .bind(snapshot.index as i64)
    .bind(snapshot.elapsed_ms)
    .bind(i64::from(snapshot.shuffling))
    .bind(i64::from(snapshot.repeat_mode.as_i32()))
    .bind(i64::from(snapshot.paused))
    .bind(f64::from(snapshot.rate))
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// When the snapshot was last written
pub async fn saved_at(pool: &SqlitePool) -> Result<Option<DateTime<Utc>>> {
    let updated_at: Option<i64> =
        sqlx::query_scalar("SELECT updated_at FROM playback_snapshot WHERE id = 1")
            .fetch_optional(pool)
            .await?;

    Ok(updated_at.and_then(|secs| Utc.timestamp_opt(secs, 0).single()))
}

/// Forget the stored session
pub async fn clear(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM playback_snapshot")
        .execute(pool)
        .await?;
    Ok(())
}
