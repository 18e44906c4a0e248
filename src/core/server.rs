//! Relay server context
//!
//! An explicit value constructed once at startup that owns the session
//! registry, the broadcast dispatcher, both bound listeners and the
//! shutdown signal. No file-scope mutable state anywhere.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{info, warn};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::ServerConfig;
use crate::core::dispatcher::BroadcastDispatcher;
use crate::core::session::SessionRegistry;
use crate::error::Result;
use crate::handlers::{handle_chat_client, handle_ws_client};

/// Resolves once shutdown has been triggered (a dropped sender counts,
/// since that only happens when the server is gone).
///
/// The guard `wait_for` yields is dropped in here, never across another
/// select arm's await, so futures selecting on this stay `Send` and can
/// be handed to `tokio::spawn`.
pub(crate) async fn shutdown_triggered(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Triggers graceful shutdown from outside the server's `run` call.
#[derive(Clone)]
pub struct ShutdownHandle {
    signal: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Stop the accept loops and close every open connection.
    /// Idempotent; shutdown is terminal for the server.
    pub fn trigger(&self) {
        let _ = self.signal.send(true);
    }
}

/// The relay: two listeners, one registry, one broadcast queue
pub struct RelayServer {
    registry: Arc<SessionRegistry>,
    dispatcher: BroadcastDispatcher,
    ws_listener: TcpListener,
    chat_listener: TcpListener,
    ws_path: String,
    outbound_queue: usize,
    shutdown: Arc<watch::Sender<bool>>,
}

impl RelayServer {
    /// Bind both listeners and start the broadcast worker. Listeners are
    /// bound here rather than in `run` so callers (and tests) can ask for
    /// port 0 and read the actual addresses back.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let ws_listener = TcpListener::bind((config.host.as_str(), config.ws_port)).await?;
        let chat_listener = TcpListener::bind((config.host.as_str(), config.chat_port)).await?;

        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = BroadcastDispatcher::start(Arc::clone(&registry));
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            registry,
            dispatcher,
            ws_listener,
            chat_listener,
            ws_path: config.ws_path,
            outbound_queue: config.outbound_queue,
            shutdown: Arc::new(shutdown),
        })
    }

    /// Address the WebSocket listener is bound to.
    pub fn ws_addr(&self) -> Result<SocketAddr> {
        Ok(self.ws_listener.local_addr()?)
    }

    /// Address the chat listener is bound to.
    pub fn chat_addr(&self) -> Result<SocketAddr> {
        Ok(self.chat_listener.local_addr()?)
    }

    /// Handle for triggering graceful shutdown.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            signal: Arc::clone(&self.shutdown),
        }
    }

    /// Drive both accept loops until shutdown is triggered, then close
    /// every registered connection. Returns once the listeners are gone.
    pub async fn run(self) -> Result<()> {
        info!(
            "Relay listening: websocket on {}{}, chat on {}",
            self.ws_addr()?,
            self.ws_path,
            self.chat_addr()?
        );

        let ws_loop = accept_ws_clients(
            self.ws_listener,
            self.ws_path,
            self.shutdown.subscribe(),
        );
        let chat_loop = accept_chat_clients(
            self.chat_listener,
            Arc::clone(&self.registry),
            self.dispatcher.clone(),
            self.shutdown.subscribe(),
            self.outbound_queue,
        );
        tokio::join!(ws_loop, chat_loop);

        // Dropping every outbound sender makes each connection task run
        // its normal cleanup; close errors at this point are best-effort
        if let Err(e) = self.registry.clear() {
            warn!("Failed to clear the registry at shutdown: {}", e);
        }
        info!("Relay stopped");
        Ok(())
    }
}

async fn accept_ws_clients(
    listener: TcpListener,
    ws_path: String,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_triggered(&mut shutdown) => {
                info!("WebSocket accept loop stopped");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    info!("New websocket connection from {}", peer);
                    tokio::spawn(handle_ws_client(
                        stream,
                        peer,
                        ws_path.clone(),
                        shutdown.clone(),
                    ));
                }
                Err(e) => warn!("WebSocket accept failed: {}", e),
            },
        }
    }
}

async fn accept_chat_clients(
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    dispatcher: BroadcastDispatcher,
    mut shutdown: watch::Receiver<bool>,
    queue_capacity: usize,
) {
    loop {
        tokio::select! {
            _ = shutdown_triggered(&mut shutdown) => {
                info!("Chat accept loop stopped");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    info!("New chat connection from {}", peer);
                    tokio::spawn(handle_chat_client(
                        stream,
                        peer,
                        Arc::clone(&registry),
                        dispatcher.clone(),
                        shutdown.clone(),
                        queue_capacity,
                    ));
                }
                Err(e) => warn!("Chat accept failed: {}", e),
            },
        }
    }
}
