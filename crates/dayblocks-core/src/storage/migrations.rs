//! Database schema migrations for dayblocks.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{info, warn};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Current schema version, or 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// v1: occurrences and backlog items.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS occurrences (
            id              TEXT PRIMARY KEY,
            owner_id        TEXT NOT NULL,
            title           TEXT NOT NULL,
            date            TEXT NOT NULL,
            start_time      INTEGER NOT NULL,
            total_duration  INTEGER NOT NULL,
            color           TEXT NOT NULL,
            icon            TEXT NOT NULL,
            status          TEXT NOT NULL DEFAULT 'pending',
            kind            TEXT NOT NULL DEFAULT 'one_off',
            cadence         TEXT,
            anchor_date     TEXT,
            forked_from     TEXT,
            exception_dates TEXT NOT NULL DEFAULT '[]',
            sub_items       TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS backlog_items (
            id                 TEXT PRIMARY KEY,
            owner_id           TEXT NOT NULL,
            title              TEXT NOT NULL,
            priority           TEXT NOT NULL DEFAULT 'medium',
            estimated_duration INTEGER NOT NULL,
            linked_block_type  TEXT,
            deadline           TEXT,
            status             TEXT NOT NULL DEFAULT 'pending',
            sub_items          TEXT NOT NULL DEFAULT '[]',
            created_at         TEXT NOT NULL
        );",
    )?;
    set_schema_version(conn, 1)?;
    info!(version = 1, "applied migration");
    Ok(())
}

/// v2: block types and lookup indexes for the resolver's range scans.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let has_block_type = column_exists(conn, "occurrences", "block_type")?;
    if !has_block_type {
        conn.execute(
            "ALTER TABLE occurrences ADD COLUMN block_type TEXT NOT NULL DEFAULT 'general'",
            [],
        )?;
    }
    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_occurrences_owner_date
            ON occurrences(owner_id, kind, date);
        CREATE INDEX IF NOT EXISTS idx_occurrences_forked_from
            ON occurrences(owner_id, forked_from);
        CREATE INDEX IF NOT EXISTS idx_backlog_owner
            ON backlog_items(owner_id, status);",
    )?;
    set_schema_version(conn, 2)?;
    info!(version = 2, "applied migration");
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> SqliteResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), CURRENT_VERSION);
        assert!(column_exists(&conn, "occurrences", "block_type").unwrap());
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), CURRENT_VERSION);
    }

    #[test]
    fn v1_database_gains_block_type() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        assert!(!column_exists(&conn, "occurrences", "block_type").unwrap());

        migrate(&conn).unwrap();
        assert!(column_exists(&conn, "occurrences", "block_type").unwrap());
        assert_eq!(get_schema_version(&conn), 2);
    }
}
