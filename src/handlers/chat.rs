//! Plain-TCP chat connection handler
//!
//! One task per connection owns both halves of the socket: it reads
//! newline-delimited UTF-8 from the peer and drains the session's
//! bounded outbound queue into the write half. When the session is
//! dropped from the registry (broadcast failure or shutdown) the queue
//! closes and the task runs its normal cleanup.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::constants::NICK_COMMAND;
use crate::core::dispatcher::BroadcastDispatcher;
use crate::core::server::shutdown_triggered;
use crate::core::session::SessionRegistry;

// Handle a chat connection from accept to cleanup
pub async fn handle_chat_client(
    stream: TcpStream,
    peer: SocketAddr,
    registry: Arc<SessionRegistry>,
    dispatcher: BroadcastDispatcher,
    mut shutdown: watch::Receiver<bool>,
    queue_capacity: usize,
) {
    let (outbound_tx, mut outbound_rx) = mpsc::channel(queue_capacity);
    let id = match registry.register(outbound_tx) {
        Ok(id) => id,
        Err(e) => {
            error!("Failed to register chat client from {}: {}", peer, e);
            return;
        }
    };
    info!("Chat client connected: {} ({})", id, peer);
    match registry.count() {
        Ok(count) => info!("Current chat connections: {}", count),
        Err(e) => error!("Failed to count sessions: {}", e),
    }

    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        tokio::select! {
            _ = shutdown_triggered(&mut shutdown) => {
                debug!("Shutdown reached chat client {}", id);
                break;
            }
            queued = outbound_rx.recv() => match queued {
                Some(line) => {
                    if let Err(e) = write_half.write_all(format!("{}\n", line).as_bytes()).await {
                        debug!("Write to chat client {} failed: {}", id, e);
                        break;
                    }
                }
                // Queue closed: the session was dropped from the registry
                None => break,
            },
            read = lines.next_line() => match read {
                Ok(Some(line)) => handle_line(&line, id, &registry, &dispatcher),
                Ok(None) => {
                    debug!("Chat client {} closed the connection", id);
                    break;
                }
                Err(e) => {
                    debug!("Read from chat client {} failed: {}", id, e);
                    break;
                }
            },
        }
    }

    // Cleanup runs once on every exit path; remove is idempotent
    if let Err(e) = registry.remove(id) {
        error!("Error removing chat client {}: {}", id, e);
    }
    info!("Chat client disconnected: {}", id);
}

// Turn one received line into a rename or a broadcast
fn handle_line(line: &str, id: Uuid, registry: &SessionRegistry, dispatcher: &BroadcastDispatcher) {
    let line = line.trim_end_matches('\r');
    if line.is_empty() {
        return;
    }

    if let Some(requested) = line.strip_prefix(NICK_COMMAND) {
        match registry.rename(id, requested) {
            Ok(Some((old, new))) => dispatcher.enqueue(format!("{} is now {}", old, new)),
            Ok(None) => debug!("Ignored blank rename from {}", id),
            Err(e) => error!("Failed to rename {}: {}", id, e),
        }
        return;
    }

    match registry.nickname(id) {
        Ok(Some(nickname)) => dispatcher.enqueue(format!("[{}] {}", nickname, line)),
        // Already dropped from the registry; the line is discarded
        Ok(None) => debug!("Dropping line from unregistered client {}", id),
        Err(e) => error!("Failed to look up nickname for {}: {}", id, e),
    }
}
