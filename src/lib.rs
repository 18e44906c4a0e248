//! Text Relay - a minimal real-time text relay server
//!
//! This library provides two transports over raw TCP: a hand-rolled
//! WebSocket echo endpoint (RFC 6455 handshake plus a single-frame text
//! codec) and a newline-delimited chat protocol with nicknames and
//! globally ordered broadcast.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;

// Re-export main components
pub use config::*;
pub use constants::*;
