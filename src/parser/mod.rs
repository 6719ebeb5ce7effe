//! Message parsing: the header state machine and date handling.

pub mod date;
pub mod header;

pub use header::{parse_message, HeaderPolicy, ParseError, ParserOptions};
