//! `mailindex`: ingest a directory of plain-text email and query it by
//! participant.
//!
//! The crate parses the header block of each message with a small state
//! machine, keeps the results in an in-memory index keyed by sender and
//! recipient address, and answers two queries: every message an address took
//! part in before a cutoff (newest first), and a random sample.

pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod model;
pub mod parser;
pub mod source;

pub use error::{MailIndexError, Result};
pub use index::ParticipantIndex;
pub use ingest::{ingest, IngestOptions, IngestReport, MAX_INGEST};
pub use model::Message;
pub use source::{CorpusSource, RawMessage};
