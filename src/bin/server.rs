use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use text_relay::config::ServerConfig;
use text_relay::core::server::{RelayServer, ShutdownHandle};

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    // Load config from the environment
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, ws_port={}, chat_port={}, ws_path={}",
        config.host, config.ws_port, config.chat_port, config.ws_path
    );

    let server = match RelayServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind listeners: {}", e);
            std::process::exit(1);
        }
    };

    // Typing "exit" on the server console shuts everything down
    watch_console(server.shutdown_handle());

    if let Err(e) = server.run().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn watch_console(shutdown: ShutdownHandle) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim() == "exit" => {
                    info!("Exit requested from console");
                    shutdown.trigger();
                    break;
                }
                Ok(Some(_)) => {}
                // Stdin closed; keep serving, the console is optional
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read console input: {}", e);
                    break;
                }
            }
        }
    });
}
