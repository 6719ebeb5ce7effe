//! Corpus traversal: a lazy stream of message files under a root directory.

use std::path::{Path, PathBuf};

use tracing::{trace, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{MailIndexError, Result};

/// One candidate message file, decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub path: PathBuf,
    pub text: String,
}

impl RawMessage {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// A directory tree of one-message-per-file email, e.g. a maildir dump.
///
/// Files are visited in file-name order within each directory and read only
/// when the iterator reaches them, so a bounded ingest stops walking early.
#[derive(Debug, Clone)]
pub struct CorpusSource {
    root: PathBuf,
    suffix: Option<String>,
    follow_links: bool,
}

impl CorpusSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            suffix: None,
            follow_links: false,
        }
    }

    /// Only yield files whose name ends with `suffix`.
    pub fn with_suffix(mut self, suffix: Option<String>) -> Self {
        self.suffix = suffix.filter(|s| !s.is_empty());
        self
    }

    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start walking.
    ///
    /// Fails only if the root is not a directory. Entries that cannot be
    /// listed or read later on are logged and skipped.
    pub fn iter(&self) -> Result<impl Iterator<Item = RawMessage> + '_> {
        if !self.root.is_dir() {
            return Err(MailIndexError::RootNotFound(self.root.clone()));
        }

        Ok(WalkDir::new(&self.root)
            .follow_links(self.follow_links)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.matches_suffix(entry))
            .filter_map(|entry| read_message(entry.path())))
    }

    fn matches_suffix(&self, entry: &DirEntry) -> bool {
        match &self.suffix {
            Some(suffix) => entry.file_name().to_string_lossy().ends_with(suffix.as_str()),
            None => true,
        }
    }
}

fn read_message(path: &Path) -> Option<RawMessage> {
    trace!(path = %path.display(), "Reading");
    match std::fs::read(path) {
        Ok(bytes) => Some(RawMessage::new(path, decode_text(&bytes))),
        Err(e) => {
            warn!(error = %MailIndexError::io(path, e), "Skipping unreadable file");
            None
        }
    }
}

/// Decode file bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_text(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}
