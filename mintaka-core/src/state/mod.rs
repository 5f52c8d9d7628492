pub mod connection;
pub mod manager;

pub use connection::{ConnectionPhase, ConnectionStatus};
pub use manager::{ConnectionManager, DEFAULT_RECONNECT_DELAY};
