// Feed ingestion — certstream messages or plain host lines into batches.
//
// Each input line is one of:
//   - a JSON certstream message; `certificate_update` messages become one
//     batch of `leaf_cert.all_domains`, everything else (heartbeats) is skipped;
//   - anything else, read as whitespace-separated hostnames forming one batch.
// The reader never blocks on the pipeline: a full queue rejects the batch and
// reading continues with the next line.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tracing::{debug, warn};

use super::stream::{CertContext, Pipeline, Submission};

pub const CERTIFICATE_UPDATE: &str = "certificate_update";

#[derive(Debug, Deserialize)]
struct Message {
    message_type: String,
    #[serde(default)]
    data: Option<UpdateData>,
}

#[derive(Debug, Deserialize)]
struct UpdateData {
    leaf_cert: LeafCert,
    #[serde(default)]
    seen: Option<f64>,
    #[serde(default)]
    source: Option<Source>,
    #[serde(default)]
    chain: Vec<ChainCert>,
}

#[derive(Debug, Deserialize)]
struct LeafCert {
    #[serde(default)]
    all_domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Source {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChainCert {
    #[serde(default)]
    subject: Subject,
}

#[derive(Debug, Default, Deserialize)]
struct Subject {
    #[serde(rename = "O")]
    organization: Option<String>,
}

/// What a single input line turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    Batch {
        hosts: Vec<String>,
        context: CertContext,
    },
    /// A well-formed message that carries no hosts (heartbeat, other types).
    Ignored,
    /// JSON that does not have the certstream shape.
    Malformed(String),
}

/// Classify one line of feed input.
pub fn parse_line(line: &str) -> FeedItem {
    let line = line.trim();
    if line.is_empty() {
        return FeedItem::Ignored;
    }
    if !line.starts_with('{') {
        let hosts: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        return FeedItem::Batch {
            hosts,
            context: CertContext::default(),
        };
    }

    let message: Message = match serde_json::from_str(line) {
        Ok(m) => m,
        Err(e) => return FeedItem::Malformed(e.to_string()),
    };
    if message.message_type != CERTIFICATE_UPDATE {
        return FeedItem::Ignored;
    }
    let Some(data) = message.data else {
        return FeedItem::Malformed("certificate_update without data".to_string());
    };

    let context = CertContext {
        seen: data.seen,
        source: data.source.and_then(|s| s.name),
        issuer_ca: data
            .chain
            .first()
            .and_then(|c| c.subject.organization.clone()),
        root_ca: data
            .chain
            .last()
            .and_then(|c| c.subject.organization.clone()),
    };
    FeedItem::Batch {
        hosts: data.leaf_cert.all_domains,
        context,
    }
}

/// Counters for one `read_feed` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub lines: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub ignored: u64,
    pub malformed: u64,
}

/// Longest accepted input line. Longer lines are skipped as malformed.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Read one raw line into `buf`, without its terminator.
///
/// Returns `None` at EOF and `Some(true)` for a line over `MAX_LINE_BYTES`,
/// whose remainder is consumed without buffering.
async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<bool>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let read = (&mut *reader)
        .take(MAX_LINE_BYTES as u64)
        .read_until(b'\n', buf)
        .await?;
    if read == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        return Ok(Some(false));
    }
    if read < MAX_LINE_BYTES {
        // final line without a newline
        return Ok(Some(false));
    }

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        let newline = available.iter().position(|&b| b == b'\n');
        match newline {
            Some(i) => {
                reader.consume(i + 1);
                break;
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
    Ok(Some(true))
}

/// Read `reader` to EOF, submitting every batch to `pipeline`.
///
/// Lines that are not UTF-8 or exceed `MAX_LINE_BYTES` are counted as
/// malformed and skipped. Returns early if the pipeline closes; only an I/O
/// error on the reader itself is returned as `Err`.
pub async fn read_feed<R>(mut reader: R, pipeline: &Pipeline) -> Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = IngestStats::default();
    let mut buf = Vec::new();

    while let Some(overlong) = next_line(&mut reader, &mut buf).await? {
        stats.lines += 1;
        if overlong {
            warn!(line = stats.lines, limit = MAX_LINE_BYTES, "Skipping overlong feed line");
            stats.malformed += 1;
            continue;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                warn!(line = stats.lines, error = %e, "Skipping feed line that is not UTF-8");
                stats.malformed += 1;
                continue;
            }
        };

        match parse_line(line) {
            FeedItem::Batch { hosts, context } => match pipeline.submit(hosts, context) {
                Submission::Accepted(id) => {
                    debug!(batch = id, "Batch queued");
                    stats.accepted += 1;
                }
                Submission::Empty => stats.ignored += 1,
                Submission::Rejected => stats.rejected += 1,
                Submission::Closed => {
                    debug!("Pipeline closed, stopping feed");
                    break;
                }
            },
            FeedItem::Ignored => stats.ignored += 1,
            FeedItem::Malformed(reason) => {
                warn!(line = stats.lines, error = reason.as_str(), "Skipping malformed feed message");
                stats.malformed += 1;
            }
        }
    }

    Ok(stats)
}
