// SqliteStore — rusqlite backend implementing the ArtifactStore trait.
//
// The Connection is wrapped in tokio::sync::Mutex because Connection is !Sync.
// Trait methods lock the mutex, do synchronous rusqlite work, and return.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;

use super::models::ModelArtifact;
use super::queries;
use super::traits::ArtifactStore;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap an already-opened connection whose tables exist.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

#[async_trait]
impl ArtifactStore for SqliteStore {
    async fn table_count(&self) -> Result<i64> {
        let conn = self.conn.lock().await;
        super::schema::table_count(&conn)
    }

    async fn put(&self, artifact: &ModelArtifact) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::insert_model(&conn, artifact)
    }

    async fn get(&self, name: &str) -> Result<Option<ModelArtifact>> {
        let conn = self.conn.lock().await;
        queries::get_model(&conn, name)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock().await;
        queries::delete_model(&conn, name)
    }

    async fn list_names(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().await;
        queries::list_model_names(&conn)
    }

    async fn get_active(&self) -> Result<Option<String>> {
        let conn = self.conn.lock().await;
        queries::get_setting(&conn, queries::ACTIVE_MODEL_KEY)
    }

    async fn set_active(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        queries::set_active_model(&conn, name)
    }
}
