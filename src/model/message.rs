//! The structured record extracted from one email file.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

/// Header fields of a single ingested message.
///
/// A `Message` only exists once every field has been extracted; the parser
/// holds partial state in [`MessageBuilder`] and never hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    message_id: String,
    from: String,
    to: Vec<String>,
    subject: String,
    /// Sent time with the offset found in the `Date:` header.
    sent_time: DateTime<FixedOffset>,
}

impl Message {
    /// The `Message-ID` header value, verbatim.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Sender address, exactly as it appeared.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Recipients in header order. May be empty.
    pub fn to(&self) -> &[String] {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn sent_time(&self) -> DateTime<FixedOffset> {
        self.sent_time
    }

    /// The sent time as a UTC instant, used for ordering and cutoffs.
    pub fn sent_instant(&self) -> DateTime<Utc> {
        self.sent_time.with_timezone(&Utc)
    }

    /// Every address this message involves: the sender first, then each
    /// recipient. Duplicates are not removed.
    pub fn participants(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.from.as_str()).chain(self.to.iter().map(String::as_str))
    }
}

/// One-line human-readable rendering.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "From: {} To: [{}] Subject: {} Time: {}",
            self.from,
            self.to.join(", "),
            self.subject,
            self.sent_time.to_rfc2822()
        )
    }
}

/// Accumulates fields while the header state machine runs.
#[derive(Debug, Default)]
pub(crate) struct MessageBuilder {
    pub message_id: Option<String>,
    pub sent_time: Option<DateTime<FixedOffset>>,
    pub from: Option<String>,
    pub to: Option<Vec<String>>,
    pub subject: Option<String>,
}

impl MessageBuilder {
    /// Produce the message, or the label of the first field still missing.
    pub fn build(self) -> Result<Message, &'static str> {
        Ok(Message {
            message_id: self.message_id.ok_or("Message-ID")?,
            sent_time: self.sent_time.ok_or("Date")?,
            from: self.from.ok_or("From")?,
            to: self.to.ok_or("To")?,
            subject: self.subject.ok_or("Subject")?,
        })
    }
}
