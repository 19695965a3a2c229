// Database queries — all SQL for the artifact store.
//
// Artifacts are split over three JSON columns so `models` and `metrics`
// can read a model's metadata without deserializing its weights.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use super::models::ModelArtifact;

pub const ACTIVE_MODEL_KEY: &str = "active_model";

// --- Models ---

/// Insert a new model. Names are keys; an existing name is an error.
pub fn insert_model(conn: &Connection, artifact: &ModelArtifact) -> Result<()> {
    if artifact.name.trim().is_empty() {
        anyhow::bail!("Model name must not be empty");
    }
    if model_exists(conn, &artifact.name)? {
        anyhow::bail!(
            "A model named '{}' already exists. Delete it first or pick another name.",
            artifact.name
        );
    }

    conn.execute(
        "INSERT INTO models (name, extractor_state, classifier_state, metrics, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            artifact.name,
            serde_json::to_string(&artifact.extractor)?,
            serde_json::to_string(&artifact.classifier)?,
            serde_json::to_string(&artifact.metrics)?,
            artifact.created_at,
        ],
    )?;
    Ok(())
}

pub fn model_exists(conn: &Connection, name: &str) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM models WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Load a model by name.
pub fn get_model(conn: &Connection, name: &str) -> Result<Option<ModelArtifact>> {
    let mut stmt = conn.prepare(
        "SELECT extractor_state, classifier_state, metrics, created_at
         FROM models WHERE name = ?1",
    )?;
    let row: Option<(String, String, String, String)> = stmt
        .query_row(params![name], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })
        .optional()?;

    let Some((extractor, classifier, metrics, created_at)) = row else {
        return Ok(None);
    };

    Ok(Some(ModelArtifact {
        name: name.to_string(),
        extractor: serde_json::from_str(&extractor)
            .with_context(|| format!("Corrupt extractor state for model '{name}'"))?,
        classifier: serde_json::from_str(&classifier)
            .with_context(|| format!("Corrupt classifier state for model '{name}'"))?,
        metrics: serde_json::from_str(&metrics)
            .with_context(|| format!("Corrupt metrics for model '{name}'"))?,
        created_at,
    }))
}

/// Delete a model. Clears the active selection if it pointed at this model.
pub fn delete_model(conn: &Connection, name: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM models WHERE name = ?1", params![name])?;
    if deleted > 0 && get_setting(conn, ACTIVE_MODEL_KEY)?.as_deref() == Some(name) {
        conn.execute("DELETE FROM settings WHERE key = ?1", params![ACTIVE_MODEL_KEY])?;
    }
    Ok(deleted > 0)
}

/// All model names, sorted.
pub fn list_model_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM models ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(names)
}

// --- Settings ---

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
    let result = stmt.query_row(params![key], |row| row.get(0)).optional()?;
    Ok(result)
}

/// Set a setting value (upsert).
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
        params![key, value],
    )?;
    Ok(())
}

/// Point the active selection at `name`, which must exist.
pub fn set_active_model(conn: &Connection, name: &str) -> Result<()> {
    if !model_exists(conn, name)? {
        anyhow::bail!("No model named '{name}'. Run `phishstream models` to list stored models.");
    }
    set_setting(conn, ACTIVE_MODEL_KEY, name)
}
