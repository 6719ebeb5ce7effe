//! Core data model.

pub mod message;

pub use message::Message;
