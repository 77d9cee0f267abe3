//! Fuzzwatch engine: owns the push-channel connection and its lifecycle.
mod connection;
mod types;

pub use connection::ConnectionHandle;
pub use types::{ConnectionError, ConnectionEvent, ConnectionSettings, LinkStatus, ReconnectPolicy};
