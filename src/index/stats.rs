//! Summary figures over an index, for the `stats` command.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::participant::ParticipantIndex;

/// Return the date range (oldest, newest) across all indexed messages.
pub fn date_range(index: &ParticipantIndex) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut instants = index.messages().map(|m| m.sent_instant());
    let first = instants.next()?;
    Some(instants.fold((first, first), |(min, max), t| (min.min(t), max.max(t))))
}

/// Return the top N senders by number of messages sent.
pub fn top_senders(index: &ParticipantIndex, n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for message in index.messages() {
        *counts.entry(message.from()).or_default() += 1;
    }
    rank(counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect(), n)
}

/// Return the top N addresses by number of messages they took part in.
pub fn top_participants(index: &ParticipantIndex, n: usize) -> Vec<(String, usize)> {
    rank(
        index
            .collection_sizes()
            .map(|(address, size)| (address.to_string(), size))
            .collect(),
        n,
    )
}

/// Most frequent first; ties by address so output is stable.
fn rank(mut counts: Vec<(String, usize)>, n: usize) -> Vec<(String, usize)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(n);
    counts
}
