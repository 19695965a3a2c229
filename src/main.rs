use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{error, info, warn};

use phishstream::classifier::training::{Trainer, TrainingSet};
use phishstream::classifier::LogisticRegression;
use phishstream::config::Config;
use phishstream::db::{self, ArtifactStore, SqliteStore};
use phishstream::features::{FeatureRegistry, FeatureVectorBuilder};
use phishstream::output::terminal;
use phishstream::output::tier_log::TierLog;
use phishstream::output::ScoreEvent;
use phishstream::pipeline;
use phishstream::scoring::ScoringDispatcher;
use phishstream::status;

/// phishstream: spot phishing domains as their certificates are issued.
///
/// Scores every hostname in a certificate transparency feed with a trained
/// model and reports the ones that clear a configured tier.
#[derive(Parser)]
#[command(name = "phishstream", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the model database
    Init,

    /// Train a model from the benign/ and malicious/ lists in the data directory
    Train {
        /// Name to store the model under
        #[arg(long)]
        name: String,

        /// Make the new model the one used for scoring
        #[arg(long)]
        activate: bool,
    },

    /// List stored models
    Models,

    /// Select the model used for scoring
    Activate {
        name: String,
    },

    /// Delete a stored model
    Delete {
        name: String,
    },

    /// Show training metrics (defaults to the active model)
    Metrics {
        name: Option<String>,
    },

    /// Score hostnames once and print a verdict for each
    Check {
        #[arg(required = true)]
        hosts: Vec<String>,
    },

    /// Score a feed read from stdin (certstream JSON or plain hostnames)
    Stream {
        /// Emit one JSON event per line instead of coloured text
        #[arg(long)]
        json: bool,
    },

    /// Show system status (database, models, tiers)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so `stream --json` output stays clean on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("phishstream=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    terminal::set_color(config.color);

    match cli.command {
        Commands::Init => {
            info!("Initializing phishstream database...");
            let store = SqliteStore::new(db::initialize(&config.db_path)?);
            let table_count = store.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext step: point PHISHSTREAM_DATA_DIR at your word lists, then run:");
            println!("  phishstream train --name <name> --activate");
        }

        Commands::Train { name, activate } => {
            let store = db::open_store(&config.db_path)?;
            if store.get(&name).await?.is_some() {
                anyhow::bail!("A model named '{name}' already exists. Delete it first or pick another name.");
            }

            let extractor_config = config.extractor_config()?;
            let set = TrainingSet::load(&config.data_dir)?;
            println!(
                "Training '{}' on {} benign and {} phishing hosts...",
                name,
                set.benign_count(),
                set.phishing_count()
            );

            let registry = FeatureRegistry::with_default_extractors(extractor_config)?;
            let builder = FeatureVectorBuilder::new(Arc::new(registry));
            let trainer = Trainer::new(builder, LogisticRegression::default()).with_progress(true);

            let model_name = name.clone();
            let trained =
                tokio::task::spawn_blocking(move || trainer.train(&model_name, &set)).await??;

            store.put(&trained.artifact).await?;
            println!("{} Stored model '{}'", "✓".green(), name);
            if activate {
                store.set_active(&name).await?;
                println!("{} '{}' is now the active model", "✓".green(), name);
            }
            terminal::display_metrics(&name, &trained.artifact.metrics);
        }

        Commands::Models => {
            let store = db::open_store(&config.db_path)?;
            let active = store.get_active().await?;
            let mut summaries = Vec::new();
            for name in store.list_names().await? {
                if let Some(artifact) = store.get(&name).await? {
                    summaries.push(artifact.summary(active.as_deref() == Some(name.as_str())));
                }
            }
            terminal::display_models(&summaries);
        }

        Commands::Activate { name } => {
            let store = db::open_store(&config.db_path)?;
            store.set_active(&name).await?;
            println!("{} '{}' is now the active model", "✓".green(), name);
        }

        Commands::Delete { name } => {
            let store = db::open_store(&config.db_path)?;
            if store.delete(&name).await? {
                println!("Deleted model '{name}'");
            } else {
                anyhow::bail!("No model named '{name}'");
            }
        }

        Commands::Metrics { name } => {
            let store = db::open_store(&config.db_path)?;
            let name = match name.or_else(|| config.model_override.clone()) {
                Some(n) => n,
                None => store.get_active().await?.ok_or_else(|| {
                    anyhow::anyhow!("No active model. Pass a model name or run `phishstream activate <name>`.")
                })?,
            };
            let artifact = store
                .get(&name)
                .await?
                .ok_or_else(|| anyhow::anyhow!("No model named '{name}'"))?;
            terminal::display_metrics(&name, &artifact.metrics);
        }

        Commands::Check { hosts } => {
            let store = db::open_store(&config.db_path)?;
            let dispatcher =
                ScoringDispatcher::from_store(store.as_ref(), config.model_override.as_deref())
                    .await?;
            let scores = dispatcher.score(&hosts);
            println!();
            for (host, score) in hosts.iter().zip(scores) {
                terminal::display_check(host, score);
            }
            println!();
        }

        Commands::Stream { json } => {
            run_stream(&config, json).await?;
        }

        Commands::Status => {
            if !status::is_initialized(&config.db_path) {
                println!("Database: not initialized");
                println!("\nRun `phishstream init` to set up the database.");
                return Ok(());
            }
            let store = db::open_store(&config.db_path)?;
            status::show(&store, &config).await?;
        }
    }

    Ok(())
}

/// Read the feed from stdin until EOF or Ctrl-C, printing flagged hosts.
async fn run_stream(config: &Config, json: bool) -> Result<()> {
    let store = db::open_store(&config.db_path)?;
    let dispatcher =
        ScoringDispatcher::from_store(store.as_ref(), config.model_override.as_deref()).await?;
    let tiers = config.tiers()?;
    let fields = config.context_fields;
    let mut tier_log = config.log_dir.as_deref().map(TierLog::new).transpose()?;

    let (scoring, mut results) = pipeline::spawn(dispatcher, tiers, config.pipeline);

    // Output errors are logged per event; the printer drains until the workers exit.
    let printer = tokio::spawn(async move {
        while let Some(result) = results.recv().await {
            let event = ScoreEvent::from_result(&result, fields);
            if json {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(e) => warn!(host = result.host.as_str(), error = %e, "Failed to encode event"),
                }
            } else {
                terminal::display_event(&event, &result.tier);
            }
            if let Some(log) = tier_log.as_mut() {
                if let Err(e) = log.append(&result.tier.name, &result.host) {
                    warn!(
                        tier = result.tier.name.as_str(),
                        host = result.host.as_str(),
                        error = %e,
                        "Failed to write tier log"
                    );
                }
            }
        }
        if let Some(log) = tier_log.as_mut() {
            if let Err(e) = log.flush() {
                warn!(error = %e, "Failed to flush tier logs");
            }
        }
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let feed = tokio::select! {
        read = pipeline::read_feed(stdin, &scoring) => Some(read),
        _ = tokio::signal::ctrl_c() => None,
    };

    let stats = match &feed {
        Some(Ok(ingest)) => {
            info!(
                lines = ingest.lines,
                accepted = ingest.accepted,
                rejected = ingest.rejected,
                malformed = ingest.malformed,
                "Feed ended"
            );
            scoring.drain().await
        }
        Some(Err(e)) => {
            error!(error = %e, "Feed read failed, finishing queued batches");
            scoring.drain().await
        }
        None => {
            info!("Interrupted, finishing in-flight batches");
            scoring.shutdown().await
        }
    };
    printer.await?;

    eprintln!(
        "Scored {} hosts in {} batches: {} flagged, {} batches rejected (queue full), {} discarded",
        stats.hosts_scored, stats.batches_scored, stats.flagged, stats.rejected, stats.discarded
    );
    match feed {
        Some(Err(e)) => Err(e.context("Failed to read the feed from stdin")),
        _ => Ok(()),
    }
}
