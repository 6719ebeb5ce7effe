//! In-memory index from participant address to messages, newest first.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;

use crate::error::{MailIndexError, Result};
use crate::model::message::Message;

/// Position of a message inside one address's collection.
///
/// Newest first. Messages sharing a timestamp are ordered by arrival
/// sequence, so a collision never drops one of them.
type SortKey = (Reverse<DateTime<Utc>>, usize);

/// Messages grouped by the addresses that sent or received them.
///
/// Every message is stored once; per-address collections hold its arrival
/// sequence, which doubles as its position in storage. Collections are kept
/// sorted as messages arrive, so queries never sort.
///
/// Addresses are matched exactly as they appear in the headers.
#[derive(Debug)]
pub struct ParticipantIndex {
    messages: Vec<Message>,
    by_address: HashMap<String, BTreeSet<SortKey>>,
    index_recipients: bool,
}

impl Default for ParticipantIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticipantIndex {
    /// An empty index keyed by sender and every recipient.
    pub fn new() -> Self {
        Self::with_recipients(true)
    }

    /// An empty index keyed by sender only.
    pub fn sender_only() -> Self {
        Self::with_recipients(false)
    }

    pub fn with_recipients(index_recipients: bool) -> Self {
        Self {
            messages: Vec::new(),
            by_address: HashMap::new(),
            index_recipients,
        }
    }

    /// Whether recipients get their own collections.
    pub fn indexes_recipients(&self) -> bool {
        self.index_recipients
    }

    /// Add a message and return its arrival sequence.
    ///
    /// An address listed more than once on the same message (a sender
    /// copying themselves, say) still indexes it once.
    pub fn insert(&mut self, message: Message) -> usize {
        let sequence = self.messages.len();
        let key = (Reverse(message.sent_instant()), sequence);

        if self.index_recipients {
            for address in message.participants() {
                self.link(address, key);
            }
        } else {
            self.link(message.from(), key);
        }

        self.messages.push(message);
        sequence
    }

    fn link(&mut self, address: &str, key: SortKey) {
        match self.by_address.get_mut(address) {
            Some(collection) => {
                collection.insert(key);
            }
            None => {
                self.by_address
                    .insert(address.to_string(), BTreeSet::from([key]));
            }
        }
    }

    /// Messages involving `address` sent strictly before `max_time`,
    /// newest first.
    ///
    /// Fails with [`MailIndexError::NotFound`] if the address was never
    /// indexed. A known address with nothing before the cutoff yields an
    /// empty vector.
    pub fn search<Tz: TimeZone>(
        &self,
        address: &str,
        max_time: &DateTime<Tz>,
    ) -> Result<Vec<&Message>> {
        let collection = self
            .by_address
            .get(address)
            .ok_or_else(|| MailIndexError::NotFound(address.to_string()))?;

        // Everything at or after the cutoff sorts at or before this key.
        let boundary = (Reverse(max_time.with_timezone(&Utc)), usize::MAX);

        Ok(collection
            .range((Bound::Excluded(boundary), Bound::Unbounded))
            .map(|&(_, sequence)| &self.messages[sequence])
            .collect())
    }

    /// `n` distinct messages picked uniformly at random, in no particular
    /// order.
    ///
    /// Fails with [`MailIndexError::InvalidArgument`] if `n` exceeds
    /// [`len`](Self::len).
    pub fn sample(&self, n: usize) -> Result<Vec<&Message>> {
        self.sample_with(n, &mut rand::thread_rng())
    }

    /// Like [`sample`](Self::sample) with a caller-supplied RNG.
    pub fn sample_with<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<&Message>> {
        if n > self.messages.len() {
            return Err(MailIndexError::InvalidArgument(format!(
                "cannot sample {n} messages, only {} indexed",
                self.messages.len()
            )));
        }

        Ok(rand::seq::index::sample(rng, self.messages.len(), n)
            .into_iter()
            .map(|i| &self.messages[i])
            .collect())
    }

    /// Number of distinct messages indexed.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of distinct addresses with a collection.
    pub fn participant_count(&self) -> usize {
        self.by_address.len()
    }

    pub fn contains_address(&self, address: &str) -> bool {
        self.by_address.contains_key(address)
    }

    /// All messages in arrival order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Addresses with the size of their collection.
    pub fn collection_sizes(&self) -> impl Iterator<Item = (&str, usize)> {
        self.by_address
            .iter()
            .map(|(address, collection)| (address.as_str(), collection.len()))
    }
}
