//! `Date:` header and cutoff time parsing.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};

use super::header::ParseError;
use crate::error::MailIndexError;

/// Accepted `Date:` layout, e.g. `Fri, 23 Jun 2000 14:05:00 -0700`.
///
/// The weekday must agree with the calendar date.
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// Same layout with the day of month written without a leading zero.
const UNPADDED_DAY_FORMAT: &str = "%a, %-d %b %Y %H:%M:%S %z";

/// Parse a `Date:` header value.
///
/// The value must follow [`DATE_FORMAT`], optionally followed by a
/// parenthesised zone abbreviation such as `(PDT)`. The abbreviation is
/// informational only; the numeric offset is authoritative and is kept.
///
/// The parsed value must format back to exactly the input. Spacing, name
/// case, two-digit time fields and a colon-free offset are all enforced that
/// way, since chrono's own parser is looser about each of them.
pub fn parse_date(value: &str) -> Result<DateTime<FixedOffset>, ParseError> {
    let trimmed = value.trim();
    let invalid = || ParseError::InvalidDate(trimmed.to_string());

    let core = strip_zone_comment(trimmed).ok_or_else(invalid)?;
    let dt = DateTime::parse_from_str(core, DATE_FORMAT).map_err(|_| invalid())?;

    let canonical = [DATE_FORMAT, UNPADDED_DAY_FORMAT]
        .iter()
        .any(|format| dt.format(format).to_string() == core);
    if !canonical {
        return Err(invalid());
    }
    Ok(dt)
}

/// Remove a trailing `(ABBR)` comment. Returns `None` when a comment is
/// present but malformed.
fn strip_zone_comment(s: &str) -> Option<&str> {
    if !s.ends_with(')') {
        return Some(s);
    }
    let open = s.rfind('(')?;
    let abbr = &s[open + 1..s.len() - 1];
    if abbr.is_empty() || !abbr.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let before = &s[..open];
    if !before.ends_with(char::is_whitespace) {
        return None;
    }
    Some(before.trim_end())
}

/// Parse a user-supplied cutoff for `search`.
///
/// Accepts RFC 3339 (`2001-05-03T00:00:00Z`), the `Date:` header layout, or a
/// bare `YYYY-MM-DD` which means midnight UTC of that day.
pub fn parse_cutoff(input: &str) -> crate::error::Result<DateTime<FixedOffset>> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt);
    }
    if let Ok(dt) = parse_date(trimmed) {
        return Ok(dt);
    }
    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight).fixed_offset());
        }
    }

    Err(MailIndexError::InvalidCutoff(trimmed.to_string()))
}
