//! Courtlink Core Library
//!
//! Shared functionality for Courtlink components:
//! - Wire protocol types for the socket and HTTP APIs
//! - Shared tracing/logging initialisation

pub mod protocol;
pub mod tracing_init;

pub use protocol::ServerEvent;
