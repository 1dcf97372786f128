//! Append-only report storage for the relay.
//!
//! Access, configuration, and feedback records are written as one JSON
//! array file per calendar day, the format the admin log viewer reads.

mod models;
mod reports;

#[cfg(test)]
mod tests;

pub use models::{AccessRecord, ConfigurationRecord, FeedbackRecord, MatchSummary, WristbandNames};
pub use reports::{ReportError, ReportLog};
