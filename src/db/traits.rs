// ArtifactStore trait — backend-agnostic async interface for model storage.
//
// Implementor: SqliteStore (wraps rusqlite). Methods are async so a native
// async backend could sit behind the same interface later.

use anyhow::Result;
use async_trait::async_trait;

use super::models::ModelArtifact;

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    // --- Lifecycle ---

    /// Count the number of user-created tables in the store.
    async fn table_count(&self) -> Result<i64>;

    // --- Artifacts ---

    /// Store a new artifact under `artifact.name`. Fails if the name is taken.
    async fn put(&self, artifact: &ModelArtifact) -> Result<()>;

    /// Load an artifact by name.
    async fn get(&self, name: &str) -> Result<Option<ModelArtifact>>;

    /// Remove an artifact. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool>;

    /// All artifact names, sorted.
    async fn list_names(&self) -> Result<Vec<String>>;

    // --- Active model ---

    /// Name of the model used for scoring, if one is selected.
    async fn get_active(&self) -> Result<Option<String>>;

    /// Select the model used for scoring. Fails if it is not stored.
    async fn set_active(&self, name: &str) -> Result<()>;
}
