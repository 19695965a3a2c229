// Database layer — SQLite storage for trained models and the active selection.
//
// rusqlite with the "bundled" feature, so there's no system SQLite
// dependency. The file lives wherever PHISHSTREAM_DB_PATH points.

pub mod models;
pub mod queries;
pub mod schema;
pub mod sqlite;
pub mod traits;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::Connection;

pub use models::{ExtractorState, ModelArtifact, ModelSummary};
pub use sqlite::SqliteStore;
pub use traits::ArtifactStore;

/// Open (or create) the database file and run migrations.
pub fn initialize(db_path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for database: {db_path}"))?;
        }
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {db_path}"))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    schema::create_tables(&conn)?;
    Ok(conn)
}

/// Open an existing database (fails if it doesn't exist yet).
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        anyhow::bail!("Database not found at {db_path}. Run `phishstream init` first.");
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {db_path}"))?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    // Picks up migrations added since `init` ran.
    schema::create_tables(&conn)?;
    Ok(conn)
}

/// Open the store behind the trait object the CLI passes around.
pub fn open_store(db_path: &str) -> Result<Arc<dyn ArtifactStore>> {
    Ok(Arc::new(SqliteStore::new(open(db_path)?)))
}

/// In-memory store, for tests and one-off runs.
pub fn open_in_memory() -> Result<Arc<dyn ArtifactStore>> {
    let conn = Connection::open_in_memory()?;
    schema::create_tables(&conn)?;
    Ok(Arc::new(SqliteStore::new(conn)))
}
