// Streaming pipeline — bounded queue between the feed and the scorers.
//
// The feed cannot be paused, so submission never waits: when the queue is
// full the new batch is rejected, logged, and counted. A fixed pool of
// workers pulls batches off the queue and scores each one on the blocking
// thread pool.
//
// Cancellation is cooperative and per batch. Workers look at the stop signal
// only before taking the next batch, so a batch that has been taken is scored
// and every one of its results is emitted before the worker exits. Batches
// still sitting in the queue at shutdown are discarded and counted.
//
// Losing the result receiver stops the pipeline: scoring without anyone to
// report to would drop every flagged host.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::dedup::dedup_wildcards;
use crate::scoring::{ScoringDispatcher, Tier, TierSet};

pub const DEFAULT_QUEUE_DEPTH: usize = 64;
pub const DEFAULT_WORKERS: usize = 4;
pub const MAX_QUEUE_DEPTH: usize = 65_536;
pub const MAX_WORKERS: usize = 1_024;
/// Flagged results buffered per queued batch before workers wait on output.
const RESULTS_PER_BATCH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Batches that may wait for a worker before new ones are rejected.
    pub queue_depth: usize,
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Certificate metadata that travels with a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertContext {
    /// Time the log entry was seen, epoch seconds.
    pub seen: Option<f64>,
    /// Name of the CT log that delivered it.
    pub source: Option<String>,
    pub issuer_ca: Option<String>,
    pub root_ca: Option<String>,
}

/// Hostnames from one certificate (or one input line).
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: u64,
    pub hosts: Vec<String>,
    pub context: CertContext,
}

/// A host whose score cleared a tier.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub batch: u64,
    pub host: String,
    pub score: f64,
    pub tier: Tier,
    pub context: CertContext,
}

/// Outcome of `Pipeline::submit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted(u64),
    /// Nothing left to score after de-duplication.
    Empty,
    /// Queue full; the batch was dropped.
    Rejected,
    /// The pipeline is shutting down.
    Closed,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    rejected: AtomicU64,
    discarded: AtomicU64,
    batches_scored: AtomicU64,
    hosts_scored: AtomicU64,
    flagged: AtomicU64,
}

/// Snapshot of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub submitted: u64,
    pub rejected: u64,
    /// Queued batches dropped at shutdown.
    pub discarded: u64,
    pub batches_scored: u64,
    pub hosts_scored: u64,
    pub flagged: u64,
}

impl Counters {
    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            batches_scored: self.batches_scored.load(Ordering::Relaxed),
            hosts_scored: self.hosts_scored.load(Ordering::Relaxed),
            flagged: self.flagged.load(Ordering::Relaxed),
        }
    }
}

/// Running pipeline. Dropping it closes the queue; workers finish what is
/// already queued and exit.
pub struct Pipeline {
    tx: Option<mpsc::Sender<Batch>>,
    queue: Arc<Mutex<mpsc::Receiver<Batch>>>,
    stop: Arc<watch::Sender<bool>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
    next_id: AtomicU64,
}

struct Worker {
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<Batch>>>,
    stop: watch::Receiver<bool>,
    halt: Arc<watch::Sender<bool>>,
    dispatcher: Arc<ScoringDispatcher>,
    tiers: Arc<TierSet>,
    results: mpsc::Sender<ScoreResult>,
    counters: Arc<Counters>,
}

/// Start the worker pool. Must be called inside a tokio runtime.
///
/// Returns the pipeline handle and the stream of flagged hosts. The result
/// stream ends once every worker has exited.
pub fn spawn(
    dispatcher: ScoringDispatcher,
    tiers: TierSet,
    config: PipelineConfig,
) -> (Pipeline, mpsc::Receiver<ScoreResult>) {
    let queue_depth = config.queue_depth.clamp(1, MAX_QUEUE_DEPTH);
    let workers = config.workers.clamp(1, MAX_WORKERS);

    let (tx, rx) = mpsc::channel(queue_depth);
    let (results_tx, results_rx) = mpsc::channel(queue_depth * RESULTS_PER_BATCH);
    let (stop_tx, _) = watch::channel(false);
    let stop_tx = Arc::new(stop_tx);

    let queue = Arc::new(Mutex::new(rx));
    let dispatcher = Arc::new(dispatcher);
    let tiers = Arc::new(tiers);
    let counters = Arc::new(Counters::default());

    let handles = (0..workers)
        .map(|id| {
            let worker = Worker {
                id,
                queue: Arc::clone(&queue),
                stop: stop_tx.subscribe(),
                halt: Arc::clone(&stop_tx),
                dispatcher: Arc::clone(&dispatcher),
                tiers: Arc::clone(&tiers),
                results: results_tx.clone(),
                counters: Arc::clone(&counters),
            };
            tokio::spawn(worker.run())
        })
        .collect();

    info!(queue_depth, workers, "Scoring pipeline started");

    let pipeline = Pipeline {
        tx: Some(tx),
        queue,
        stop: stop_tx,
        workers: handles,
        counters,
        next_id: AtomicU64::new(1),
    };
    (pipeline, results_rx)
}

impl Pipeline {
    /// Offer a batch without waiting. Wildcard duplicates are removed first.
    pub fn submit(&self, hosts: Vec<String>, context: CertContext) -> Submission {
        let Some(tx) = &self.tx else {
            return Submission::Closed;
        };
        if *self.stop.borrow() {
            return Submission::Closed;
        }

        let hosts = dedup_wildcards(&hosts);
        if hosts.is_empty() {
            return Submission::Empty;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let size = hosts.len();
        match tx.try_send(Batch { id, hosts, context }) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Submission::Accepted(id)
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                let rejected = self.counters.rejected.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(batch = id, hosts = size, rejected, "Scoring queue full, batch rejected");
                Submission::Rejected
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Submission::Closed,
        }
    }

    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    /// Signal the workers to stop after their current batch. Does not wait.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Stop, wait for in-flight batches, and discard whatever is still queued.
    pub async fn shutdown(mut self) -> PipelineStats {
        self.stop();
        self.tx = None;
        self.join().await
    }

    /// Close the input and score everything already queued.
    pub async fn drain(mut self) -> PipelineStats {
        self.tx = None;
        self.join().await
    }

    /// Wait for every worker to exit, then count batches left in the queue.
    pub async fn join(mut self) -> PipelineStats {
        self.tx = None;
        for result in join_all(self.workers.drain(..)).await {
            if let Err(e) = result {
                error!(error = %e, "Scoring worker panicked");
            }
        }

        let mut queue = self.queue.lock().await;
        let mut discarded = 0u64;
        while queue.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            self.counters.discarded.fetch_add(discarded, Ordering::Relaxed);
            info!(discarded, "Queued batches dropped at shutdown");
        }

        let stats = self.counters.snapshot();
        info!(
            batches = stats.batches_scored,
            hosts = stats.hosts_scored,
            flagged = stats.flagged,
            rejected = stats.rejected,
            "Scoring pipeline stopped"
        );
        stats
    }
}

impl Worker {
    async fn run(mut self) {
        loop {
            if *self.stop.borrow() {
                break;
            }

            let next = {
                let mut queue = self.queue.lock().await;
                tokio::select! {
                    biased;
                    _ = self.stop.changed() => None,
                    batch = queue.recv() => batch,
                }
            };
            let Some(batch) = next else {
                break;
            };

            self.process(batch).await;
        }
        debug!(worker = self.id, "Scoring worker exited");
    }

    /// Score one batch and emit all of its flagged hosts.
    async fn process(&self, batch: Batch) {
        let Batch { id, hosts, context } = batch;
        let size = hosts.len() as u64;
        let dispatcher = Arc::clone(&self.dispatcher);

        let scored = tokio::task::spawn_blocking(move || {
            let scores = dispatcher.score_batch(id, &hosts);
            (hosts, scores)
        })
        .await;

        self.counters.batches_scored.fetch_add(1, Ordering::Relaxed);
        self.counters.hosts_scored.fetch_add(size, Ordering::Relaxed);

        let (hosts, scores) = match scored {
            Ok(pair) => pair,
            Err(e) => {
                // A panicking scorer leaves every host at the neutral score,
                // which no tier reports.
                error!(batch = id, hosts = size, error = %e, "Scoring task failed, batch scored neutral");
                return;
            }
        };

        for (host, score) in hosts.into_iter().zip(scores) {
            let Some(tier) = self.tiers.evaluate(score) else {
                continue;
            };
            self.counters.flagged.fetch_add(1, Ordering::Relaxed);
            let result = ScoreResult {
                batch: id,
                host,
                score,
                tier: tier.clone(),
                context: context.clone(),
            };
            if self.results.send(result).await.is_err() {
                error!(batch = id, "Result receiver dropped, stopping the pipeline");
                self.halt.send_replace(true);
                return;
            }
        }
    }
}
