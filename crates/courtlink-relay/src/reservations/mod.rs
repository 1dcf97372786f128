//! Wristband reservation state: per-club in-use sets and safety timers.

mod store;
mod timers;

pub use store::{ReleaseOutcome, ReleaseReason, ReservationStore, ReserveOutcome};
pub use timers::{DEFAULT_RELEASE_WINDOW, ReleaseTimers};
