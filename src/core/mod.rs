//! Core functionality for the relay server

pub mod dispatcher;
pub mod frame;
pub mod handshake;
pub mod server;
pub mod session;

// Re-export main components for convenience
pub use dispatcher::BroadcastDispatcher;
pub use server::{RelayServer, ShutdownHandle};
pub use session::{Session, SessionRegistry};
