// Pipeline — feed lines → de-duplicated batches → bounded queue → scorers.

pub mod dedup;
pub mod ingest;
pub mod stream;

pub use dedup::dedup_wildcards;
pub use ingest::{parse_line, read_feed, FeedItem, IngestStats};
pub use stream::{
    spawn, Batch, CertContext, Pipeline, PipelineConfig, PipelineStats, ScoreResult, Submission,
};
