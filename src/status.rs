// System status display — store location, stored models, active model, lists.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::db::ArtifactStore;

/// Display system status to the terminal.
pub async fn show(store: &Arc<dyn ArtifactStore>, config: &Config) -> Result<()> {
    let file_size = std::fs::metadata(&config.db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", config.db_path, file_size);
    println!("Tables: {}", store.table_count().await?);

    let names = store.list_names().await?;
    println!("Models: {}", names.len());

    let active = match &config.model_override {
        Some(name) => Some(format!("{name} (from PHISHSTREAM_MODEL)")),
        None => store.get_active().await?,
    };
    match active {
        Some(name) => println!("Active model: {}", name.green()),
        None => {
            println!("Active model: {}", "none".yellow());
            println!("  Run `phishstream train --name <name> --activate` to create one");
        }
    }

    if config.data_dir.is_dir() {
        println!("Data directory: {}", config.data_dir.display());
    } else {
        println!(
            "Data directory: {} {}",
            config.data_dir.display(),
            "(missing)".red()
        );
    }

    let tiers = config.tiers()?;
    let summary: Vec<String> = tiers
        .tiers()
        .iter()
        .map(|t| format!("{} > {}", t.name, t.threshold))
        .collect();
    println!("Tiers: {}", summary.join(", "));

    if let Some(dir) = &config.log_dir {
        println!("Tier logs: {}", dir.display());
    }

    Ok(())
}

/// Whether `init` has been run for this database path.
pub fn is_initialized(db_path: &str) -> bool {
    Path::new(db_path).exists()
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
