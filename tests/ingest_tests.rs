//! Integration tests for corpus ingestion, search, and sampling.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use chrono::Utc;
use predicates::prelude::*;

use mailindex::parser::date::parse_cutoff;
use mailindex::parser::{HeaderPolicy, ParserOptions};
use mailindex::{ingest, CorpusSource, IngestOptions, MailIndexError, ParticipantIndex};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn options(policy: HeaderPolicy, unfold_continuations: bool) -> IngestOptions {
    IngestOptions {
        parser: ParserOptions {
            policy,
            unfold_continuations,
        },
        ..IngestOptions::default()
    }
}

fn ingest_fixture(options: &IngestOptions) -> (ParticipantIndex, mailindex::IngestReport) {
    let source = CorpusSource::new(fixture("maildir")).with_suffix(Some("_".to_string()));
    let mut index = ParticipantIndex::new();
    let report = ingest(&mut index, source.iter().unwrap(), 100, options, None).unwrap();
    (index, report)
}

fn ids(found: &[&mailindex::Message]) -> Vec<String> {
    found.iter().map(|m| m.message_id().to_string()).collect()
}

// ─── Strict policy over the fixture corpus ──────────────────────────

#[test]
fn test_strict_skips_malformed() {
    let (index, report) = ingest_fixture(&IngestOptions::default());
    assert_eq!(report.consumed, 7, "README.txt is filtered by suffix");
    assert_eq!(report.indexed, 3);
    assert_eq!(report.skipped, 4);
    assert_eq!(index.len(), 3);
}

#[test]
fn test_strict_rejected_messages_not_indexed() {
    let (index, _) = ingest_fixture(&IngestOptions::default());
    let all: HashSet<&str> = index.messages().map(|m| m.message_id()).collect();
    // missing Subject, swapped From/Date, reordered, folded To
    for rejected in ["<m3.", "<m4.", "<m5.", "<m6."] {
        assert!(
            !all.iter().any(|id| id.starts_with(rejected)),
            "{rejected} should have been skipped"
        );
    }
}

#[test]
fn test_search_sent_and_received() {
    let (index, _) = ingest_fixture(&IngestOptions::default());
    let cutoff = parse_cutoff("2001-05-03T00:00:00Z").unwrap();
    let found = index.search("a@x.com", &cutoff).unwrap();
    assert_eq!(
        ids(&found),
        vec![
            "<m2.1075855378111.JavaMail.evans@thyme>",
            "<m1.1075855378110.JavaMail.evans@thyme>",
            "<b1.1075855378200.JavaMail.evans@thyme>",
        ]
    );
    // Strictly descending
    assert!(found
        .windows(2)
        .all(|w| w[0].sent_instant() > w[1].sent_instant()));
}

#[test]
fn test_search_unknown_address_is_not_found() {
    let (index, _) = ingest_fixture(&IngestOptions::default());
    let result = index.search("d@x.com", &Utc::now());
    assert!(matches!(result, Err(MailIndexError::NotFound(_))));
}

#[test]
fn test_search_known_address_nothing_before_cutoff() {
    let (index, _) = ingest_fixture(&IngestOptions::default());
    let cutoff = parse_cutoff("2000-01-01").unwrap();
    assert!(index.search("a@x.com", &cutoff).unwrap().is_empty());
}

// ─── Other policies ─────────────────────────────────────────────────

#[test]
fn test_scan_accepts_reordered() {
    let (index, report) = ingest_fixture(&options(HeaderPolicy::Scan, false));
    assert_eq!(report.indexed, 6);
    assert_eq!(report.skipped, 1, "only the message without Subject");

    let found = index.search("c@x.com", &Utc::now()).unwrap();
    assert_eq!(found.len(), 3);
    assert_eq!(found[0].subject(), "Folded recipients");
}

#[test]
fn test_unfold_accepts_folded_recipients() {
    let (index, report) = ingest_fixture(&options(HeaderPolicy::Strict, true));
    assert_eq!(report.indexed, 4);

    let found = index.search("d@x.com", &Utc::now()).unwrap();
    assert_eq!(ids(&found), vec!["<m6.1075855378115.JavaMail.evans@thyme>"]);
    assert_eq!(found[0].to(), &["b@x.com", "c@x.com", "d@x.com"]);
}

#[test]
fn test_sender_only_index() {
    let source = CorpusSource::new(fixture("maildir")).with_suffix(Some("_".to_string()));
    let mut index = ParticipantIndex::sender_only();
    ingest(&mut index, source.iter().unwrap(), 100, &IngestOptions::default(), None).unwrap();

    assert!(index.search("c@x.com", &Utc::now()).is_err());
    let found = index.search("a@x.com", &Utc::now()).unwrap();
    assert_eq!(found.len(), 2);
}

// ─── Bounds ─────────────────────────────────────────────────────────

#[test]
fn test_max_count_limits_files_read() {
    let source = CorpusSource::new(fixture("maildir")).with_suffix(Some("_".to_string()));
    let mut index = ParticipantIndex::new();
    let report = ingest(&mut index, source.iter().unwrap(), 2, &IngestOptions::default(), None)
        .unwrap();
    assert_eq!(report.consumed, 2);
    assert_eq!(index.len(), 2);
}

#[test]
fn test_no_suffix_reads_everything() {
    let source = CorpusSource::new(fixture("maildir"));
    let mut index = ParticipantIndex::new();
    let report = ingest(&mut index, source.iter().unwrap(), 100, &IngestOptions::default(), None)
        .unwrap();
    assert_eq!(report.consumed, 8);
    assert_eq!(report.indexed, 3);
}

#[test]
fn test_max_count_over_limit_rejected() {
    let source = CorpusSource::new(fixture("maildir"));
    let mut index = ParticipantIndex::new();
    let result = ingest(
        &mut index,
        source.iter().unwrap(),
        mailindex::MAX_INGEST + 1,
        &IngestOptions::default(),
        None,
    );
    assert!(matches!(result, Err(MailIndexError::InvalidArgument(_))));
}

// ─── Sampling ───────────────────────────────────────────────────────

#[test]
fn test_sample_from_corpus() {
    let (index, _) = ingest_fixture(&IngestOptions::default());

    assert!(index.sample(0).unwrap().is_empty());

    let picked = index.sample(3).unwrap();
    let unique: HashSet<&str> = picked.iter().map(|m| m.message_id()).collect();
    assert_eq!(unique.len(), 3);

    assert!(matches!(
        index.sample(4),
        Err(MailIndexError::InvalidArgument(_))
    ));
}

// ─── The two-message scenario on a fresh corpus ─────────────────────

#[test]
fn test_two_message_scenario() {
    let tmp = assert_fs::TempDir::new().unwrap();
    tmp.child("a/1_")
        .write_str(
            "Message-ID: <M1@x>\nDate: Tue, 1 May 2001 10:00:00 -0700 (PDT)\nFrom: a@x.com\nTo: b@x.com\nSubject: Hi\n\nbody\n",
        )
        .unwrap();
    tmp.child("a/2_")
        .write_str(
            "Message-ID: <M2@x>\nDate: Wed, 2 May 2001 10:00:00 -0700 (PDT)\nFrom: a@x.com\nTo: c@x.com\nSubject: Re\n\nbody\n",
        )
        .unwrap();

    let source = CorpusSource::new(tmp.path());
    let mut index = ParticipantIndex::new();
    ingest(&mut index, source.iter().unwrap(), 10, &IngestOptions::default(), None).unwrap();

    let found = index
        .search("a@x.com", &parse_cutoff("2001-05-03T00:00:00Z").unwrap())
        .unwrap();
    assert_eq!(ids(&found), vec!["<M2@x>", "<M1@x>"]);
    assert!(predicate::str::starts_with("From: a@x.com To: [c@x.com] Subject: Re")
        .eval(&found[0].to_string()));
    assert!(predicate::str::starts_with("From: a@x.com To: [b@x.com] Subject: Hi")
        .and(predicate::str::contains("2001"))
        .eval(&found[1].to_string()));

    let boundary = parse_cutoff("Tue, 1 May 2001 10:00:00 -0700").unwrap();
    assert!(index.search("a@x.com", &boundary).unwrap().is_empty());

    assert!(index.sample(0).unwrap().is_empty());
}

#[test]
fn test_missing_root() {
    let source = CorpusSource::new(fixture("no-such-dir"));
    assert!(matches!(
        source.iter().err(),
        Some(MailIndexError::RootNotFound(_))
    ));
}
