//! Database migrations

use rusqlite::Connection;

use crate::error::StoreResult;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &Connection) -> StoreResult<()> {
    let version = get_version(conn)?;
    if version >= CURRENT_VERSION {
        return Ok(());
    }

    if version < 1 {
        migrate_v1(conn)?;
    }

    tracing::debug!(from = version, to = CURRENT_VERSION, "database migrated");
    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> StoreResult<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|v| v != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: initial schema
///
/// Both entity families share the same sync shape: the record payload as
/// JSON next to the columns the sync engine queries on.
fn migrate_v1(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "BEGIN;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY
         );
         CREATE TABLE IF NOT EXISTS pantry_items (
             id TEXT PRIMARY KEY,
             updated_at INTEGER NOT NULL,
             is_synced INTEGER NOT NULL DEFAULT 0,
             payload TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_pantry_updated ON pantry_items(updated_at DESC);
         CREATE INDEX IF NOT EXISTS idx_pantry_unsynced ON pantry_items(is_synced);
         CREATE INDEX IF NOT EXISTS idx_pantry_location
             ON pantry_items(json_extract(payload, '$.location'));
         CREATE INDEX IF NOT EXISTS idx_pantry_expiry
             ON pantry_items(json_extract(payload, '$.expires_at'));
         CREATE TABLE IF NOT EXISTS insight_items (
             id TEXT PRIMARY KEY,
             updated_at INTEGER NOT NULL,
             is_synced INTEGER NOT NULL DEFAULT 0,
             payload TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_insight_updated ON insight_items(updated_at DESC);
         CREATE INDEX IF NOT EXISTS idx_insight_unsynced ON insight_items(is_synced);
         INSERT INTO schema_version (version) VALUES (1);
         COMMIT;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        assert_eq!(get_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_fresh_database_reports_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(get_version(&conn).unwrap(), 0);
    }
}
