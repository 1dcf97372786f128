//! Relay control surface: configuration sends, subscriptions, occupancy
//! fan-out, and the wristband release protocol.

mod relay;


pub use relay::{RelayError, RelayRouter};
