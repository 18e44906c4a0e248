//! Connection handlers, one per transport

pub mod chat;
pub mod websocket;

pub use chat::handle_chat_client;
pub use websocket::handle_ws_client;
