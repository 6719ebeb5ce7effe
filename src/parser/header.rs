//! Header block parsing.
//!
//! Two policies turn the lines of one message into a [`Message`]:
//!
//! - [`HeaderPolicy::Strict`] runs a fixed state machine
//!   (`Message-ID` → `Date` → `From` → `To` → `Subject`), one line per state.
//!   Any line that does not carry the header expected next rejects the message.
//! - [`HeaderPolicy::Scan`] reads the whole header block and picks out the
//!   first occurrence of each header wherever it appears.
//!
//! Parsing holds no state outside the call, so any number of messages may be
//! parsed concurrently.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::date::parse_date;
use crate::model::message::{Message, MessageBuilder};

/// Why a message was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line at the current position is not the expected header.
    #[error("expected '{expected}' header, found '{line}'")]
    UnexpectedHeader { expected: &'static str, line: String },

    /// Input ended before the expected header was seen.
    #[error("message ended before '{expected}' header")]
    Truncated { expected: &'static str },

    /// A header that must carry a value is blank.
    #[error("'{0}' header is empty")]
    EmptyField(&'static str),

    /// The `To:` list has an empty entry between separators.
    #[error("malformed recipient list '{0}'")]
    MalformedList(String),

    #[error("unparsable date '{0}'")]
    InvalidDate(String),

    /// A required header never appeared in the header block.
    #[error("'{0}' header missing")]
    MissingField(&'static str),
}

/// The five headers a message must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    MessageId,
    Date,
    From,
    To,
    Subject,
}

impl HeaderField {
    pub const ALL: [HeaderField; 5] = [
        HeaderField::MessageId,
        HeaderField::Date,
        HeaderField::From,
        HeaderField::To,
        HeaderField::Subject,
    ];

    /// Header name without the colon.
    pub fn label(self) -> &'static str {
        match self {
            HeaderField::MessageId => "Message-ID",
            HeaderField::Date => "Date",
            HeaderField::From => "From",
            HeaderField::To => "To",
            HeaderField::Subject => "Subject",
        }
    }

    /// Line prefix identifying the header (case-sensitive).
    pub fn prefix(self) -> &'static str {
        match self {
            HeaderField::MessageId => "Message-ID:",
            HeaderField::Date => "Date:",
            HeaderField::From => "From:",
            HeaderField::To => "To:",
            HeaderField::Subject => "Subject:",
        }
    }
}

/// Position of the strict state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    Start,
    Time,
    From,
    To,
    Subject,
    End,
}

impl HeaderState {
    /// The header this state consumes, or `None` once terminal.
    pub fn field(self) -> Option<HeaderField> {
        match self {
            HeaderState::Start => Some(HeaderField::MessageId),
            HeaderState::Time => Some(HeaderField::Date),
            HeaderState::From => Some(HeaderField::From),
            HeaderState::To => Some(HeaderField::To),
            HeaderState::Subject => Some(HeaderField::Subject),
            HeaderState::End => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            HeaderState::Start => HeaderState::Time,
            HeaderState::Time => HeaderState::From,
            HeaderState::From => HeaderState::To,
            HeaderState::To => HeaderState::Subject,
            HeaderState::Subject | HeaderState::End => HeaderState::End,
        }
    }
}

/// Which messages are accepted, in terms of header order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderPolicy {
    /// Headers must appear in canonical order on consecutive lines.
    #[default]
    Strict,
    /// Headers may appear anywhere in the header block.
    Scan,
}

impl std::str::FromStr for HeaderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(HeaderPolicy::Strict),
            "scan" => Ok(HeaderPolicy::Scan),
            other => Err(format!("unknown header policy '{other}' (expected strict or scan)")),
        }
    }
}

/// Parser settings. Cheap to copy into worker threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserOptions {
    pub policy: HeaderPolicy,
    /// Join folded header lines (leading space or tab) before parsing.
    pub unfold_continuations: bool,
}

/// Parse the full text of one message.
pub fn parse_message(text: &str, options: &ParserOptions) -> Result<Message, ParseError> {
    if options.unfold_continuations {
        let lines = unfold_header_block(text);
        parse_with_policy(lines.iter().map(String::as_str), options.policy)
    } else {
        parse_with_policy(text.lines(), options.policy)
    }
}

fn parse_with_policy<'a, I>(lines: I, policy: HeaderPolicy) -> Result<Message, ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    match policy {
        HeaderPolicy::Strict => parse_lines(lines),
        HeaderPolicy::Scan => scan_lines(lines),
    }
}

/// Run the strict state machine over `lines`.
///
/// Stops consuming as soon as the `Subject:` line has been read, so body
/// lines may be passed in and are never looked at.
pub fn parse_lines<'a, I>(lines: I) -> Result<Message, ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut lines = lines.into_iter();
    let mut builder = MessageBuilder::default();
    let mut state = HeaderState::Start;

    while let Some(field) = state.field() {
        let line = lines.next().ok_or(ParseError::Truncated {
            expected: field.label(),
        })?;
        let value = line
            .strip_prefix(field.prefix())
            .ok_or_else(|| ParseError::UnexpectedHeader {
                expected: field.label(),
                line: line.to_string(),
            })?;
        apply_field(&mut builder, field, value)?;
        state = state.next();
    }

    builder.build().map_err(ParseError::MissingField)
}

/// Collect the five headers from anywhere in the header block.
///
/// The header block ends at the first blank line. If a header repeats, the
/// first occurrence wins and later ones are not inspected.
pub fn scan_lines<'a, I>(lines: I) -> Result<Message, ParseError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut builder = MessageBuilder::default();

    for line in lines.into_iter().take_while(|l| !l.trim().is_empty()) {
        for field in HeaderField::ALL {
            if is_set(&builder, field) {
                continue;
            }
            if let Some(value) = line.strip_prefix(field.prefix()) {
                apply_field(&mut builder, field, value)?;
                break;
            }
        }
    }

    builder.build().map_err(ParseError::MissingField)
}

fn is_set(builder: &MessageBuilder, field: HeaderField) -> bool {
    match field {
        HeaderField::MessageId => builder.message_id.is_some(),
        HeaderField::Date => builder.sent_time.is_some(),
        HeaderField::From => builder.from.is_some(),
        HeaderField::To => builder.to.is_some(),
        HeaderField::Subject => builder.subject.is_some(),
    }
}

/// Validate and store one header value (the text after the colon).
fn apply_field(
    builder: &mut MessageBuilder,
    field: HeaderField,
    value: &str,
) -> Result<(), ParseError> {
    match field {
        HeaderField::MessageId => builder.message_id = Some(required(field, value)?),
        HeaderField::Date => builder.sent_time = Some(parse_date(value)?),
        HeaderField::From => builder.from = Some(required(field, value)?),
        HeaderField::To => builder.to = Some(parse_recipients(value)?),
        HeaderField::Subject => builder.subject = Some(value.trim().to_string()),
    }
    Ok(())
}

fn required(field: HeaderField, value: &str) -> Result<String, ParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyField(field.label()));
    }
    Ok(trimmed.to_string())
}

/// Split a `To:` value into addresses.
///
/// Tokens are separated by `,` or `:` and trimmed; a token equal to the
/// `To` label is dropped. A blank value is an empty list and one trailing
/// separator is tolerated (folded lists end in a comma), but an empty token
/// anywhere else makes the list malformed.
pub fn parse_recipients(value: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens: Vec<&str> = value
        .split([',', ':'])
        .map(str::trim)
        .filter(|t| *t != HeaderField::To.label())
        .collect();

    if tokens.iter().all(|t| t.is_empty()) {
        return Ok(Vec::new());
    }
    if tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    if tokens.iter().any(|t| t.is_empty()) {
        return Err(ParseError::MalformedList(value.trim().to_string()));
    }

    Ok(tokens.into_iter().map(str::to_string).collect())
}

/// Return the header block with folded lines joined onto their header.
///
/// Only lines before the first blank line are returned.
fn unfold_header_block(text: &str) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.push(' ');
                last.push_str(line.trim());
                continue;
            }
        }
        result.push(line.to_string());
    }

    result
}
