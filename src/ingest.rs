//! Bounded ingestion: raw messages in, indexed messages out.
//!
//! Items are pulled from the source in batches. Each batch is parsed (in
//! parallel unless disabled) and the results are then inserted one by one in
//! source order, so the index only ever has a single writer.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MailIndexError, Result};
use crate::index::ParticipantIndex;
use crate::model::Message;
use crate::parser::{parse_message, ParseError, ParserOptions};
use crate::source::RawMessage;

/// Largest `max_count` accepted by [`ingest`].
pub const MAX_INGEST: usize = 100_000;

/// How ingestion parses and batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub parser: ParserOptions,
    /// Parse each batch on the rayon thread pool.
    pub parallel: bool,
    /// Messages read from the source per batch (at least 1).
    pub batch_size: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            parser: ParserOptions::default(),
            parallel: true,
            batch_size: 1024,
        }
    }
}

/// Counts from one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Items taken from the source.
    pub consumed: usize,
    /// Items that parsed and were inserted.
    pub indexed: usize,
    /// Items rejected by the parser.
    pub skipped: usize,
    /// Total length of the consumed message text, in bytes.
    pub bytes: u64,
}

/// Check `max_count` against [`MAX_INGEST`].
pub fn validate_max_count(max_count: usize) -> Result<()> {
    if max_count > MAX_INGEST {
        return Err(MailIndexError::InvalidArgument(format!(
            "max count {max_count} exceeds the limit of {MAX_INGEST}"
        )));
    }
    Ok(())
}

/// Feed at most `max_count` items from `source` through the parser into
/// `index`.
///
/// Malformed messages are skipped and counted, never returned as errors.
/// The only failure is an out-of-range `max_count`, detected before the
/// source is touched. `progress` receives the running consumed count after
/// every batch.
pub fn ingest<I>(
    index: &mut ParticipantIndex,
    source: I,
    max_count: usize,
    options: &IngestOptions,
    progress: Option<&dyn Fn(usize)>,
) -> Result<IngestReport>
where
    I: IntoIterator<Item = RawMessage>,
{
    validate_max_count(max_count)?;

    let batch_size = options.batch_size.max(1);
    let mut items = source.into_iter().take(max_count);
    let mut report = IngestReport::default();

    loop {
        let batch: Vec<RawMessage> = items.by_ref().take(batch_size).collect();
        if batch.is_empty() {
            break;
        }

        let parsed = parse_batch(&batch, options);
        for (raw, result) in batch.iter().zip(parsed) {
            report.consumed += 1;
            report.bytes += raw.text.len() as u64;
            match result {
                Ok(message) => {
                    index.insert(message);
                    report.indexed += 1;
                }
                Err(e) => {
                    debug!(path = %raw.path.display(), error = %e, "Skipping malformed message");
                    report.skipped += 1;
                }
            }
        }

        if let Some(progress) = progress {
            progress(report.consumed);
        }
    }

    info!(
        consumed = report.consumed,
        indexed = report.indexed,
        skipped = report.skipped,
        "Ingestion complete"
    );

    Ok(report)
}

/// Parse a batch, preserving its order.
fn parse_batch(
    batch: &[RawMessage],
    options: &IngestOptions,
) -> Vec<std::result::Result<Message, ParseError>> {
    if options.parallel {
        batch
            .par_iter()
            .map(|raw| parse_message(&raw.text, &options.parser))
            .collect()
    } else {
        batch
            .iter()
            .map(|raw| parse_message(&raw.text, &options.parser))
            .collect()
    }
}
