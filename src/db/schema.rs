// Database schema — table creation.
//
// A `schema_version` table records the schema revision the file was
// created with.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all tables if they don't exist yet. Safe to call on every startup.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Trained models, immutable once written
        CREATE TABLE IF NOT EXISTS models (
            name TEXT PRIMARY KEY,
            extractor_state TEXT NOT NULL,     -- JSON: lists, feature names, fingerprint
            classifier_state TEXT NOT NULL,    -- JSON: algorithm-tagged model state
            metrics TEXT NOT NULL,             -- JSON: training info and accuracy
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_models_created ON models(created_at);

        -- Key/value settings (active model name)
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )
    .context("Failed to create database tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )?;

    Ok(())
}

/// Count the number of tables in the database (used by `init` and `status`).
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
