//! HTTP and socket.io front-ends for the relay.

pub mod http;
pub mod socket;

pub use http::{HttpState, api_router};
pub use socket::attach;
