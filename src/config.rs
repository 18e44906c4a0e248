//! Server configuration module
//! Handles dynamic configuration parameters for the relay server

use crate::constants::{
    DEFAULT_CHAT_PORT, DEFAULT_HOST, DEFAULT_OUTBOUND_QUEUE, DEFAULT_WS_PATH, DEFAULT_WS_PORT,
};
use crate::error::{RelayError, Result};
use std::env;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    /// Port of the WebSocket echo listener
    pub ws_port: u16,
    /// Port of the plain-TCP chat listener
    pub chat_port: u16,
    /// Request path that accepts WebSocket upgrades
    pub ws_path: String,
    /// Capacity of each chat session's outbound queue
    pub outbound_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            ws_port: DEFAULT_WS_PORT,
            chat_port: DEFAULT_CHAT_PORT,
            ws_path: DEFAULT_WS_PATH.to_string(),
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("TEXT_RELAY_HOST").unwrap_or(DEFAULT_HOST.to_string());

        let ws_port = env::var("TEXT_RELAY_WS_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_WS_PORT);

        let chat_port = env::var("TEXT_RELAY_CHAT_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_CHAT_PORT);

        let ws_path = env::var("TEXT_RELAY_WS_PATH").unwrap_or(DEFAULT_WS_PATH.to_string());

        let outbound_queue = env::var("TEXT_RELAY_OUTBOUND_QUEUE")
            .ok()
            .and_then(|q| q.parse().ok())
            .unwrap_or(DEFAULT_OUTBOUND_QUEUE);

        Self {
            host,
            ws_port,
            chat_port,
            ws_path,
            outbound_queue,
        }
        .validate()
    }

    fn validate(self) -> Result<Self> {
        if !self.ws_path.starts_with('/') {
            return Err(RelayError::Config(format!(
                "WebSocket path must start with '/': {}",
                self.ws_path
            )));
        }

        // Port 0 means "pick an ephemeral port", so two zeros never collide
        if self.ws_port == self.chat_port && self.ws_port != 0 {
            return Err(RelayError::Config(format!(
                "WebSocket and chat listeners cannot share port {}",
                self.ws_port
            )));
        }

        if self.outbound_queue == 0 {
            return Err(RelayError::Config(
                "outbound queue capacity must be at least 1".to_string(),
            ));
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServerConfig::default().validate().unwrap();
        assert_eq!(config.ws_path, DEFAULT_WS_PATH);
        assert_ne!(config.ws_port, config.chat_port);
    }

    #[test]
    fn test_rejects_path_without_leading_slash() {
        let config = ServerConfig {
            ws_path: "ws".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_shared_port() {
        let config = ServerConfig {
            ws_port: 9000,
            chat_port: 9000,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_allows_two_ephemeral_ports() {
        let config = ServerConfig {
            ws_port: 0,
            chat_port: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_capacity_queue() {
        let config = ServerConfig {
            outbound_queue: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
