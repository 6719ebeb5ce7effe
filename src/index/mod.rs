//! The participant index and summary statistics over it.

pub mod participant;
pub mod stats;

pub use participant::ParticipantIndex;
