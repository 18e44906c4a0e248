//! WebSocket echo connection handler
//!
//! Runs the upgrade handshake once, then loops decoding one text frame
//! and echoing it back. Any handshake, protocol or I/O error closes only
//! this connection.

use std::net::SocketAddr;

use log::{debug, info, warn};
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::core::frame;
use crate::core::handshake::{self, UpgradeRequest};
use crate::core::server::shutdown_triggered;
use crate::error::RelayError;

// Handle a WebSocket connection from accept to cleanup
pub async fn handle_ws_client(
    stream: TcpStream,
    peer: SocketAddr,
    ws_path: String,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut stream = BufStream::new(stream);

    let request = match UpgradeRequest::read_from(&mut stream).await {
        Ok(request) => request,
        Err(e) => {
            warn!("Unreadable upgrade request from {}: {}", peer, e);
            respond(&mut stream, &handshake::bad_request(&e.to_string())).await;
            return;
        }
    };

    if request.path != ws_path {
        debug!("Request from {} for unknown path {}", peer, request.path);
        respond(&mut stream, &handshake::not_found(&request.path)).await;
        return;
    }

    let response = match handshake::negotiate(&request) {
        Ok(response) => response,
        Err(e) => {
            warn!("Handshake with {} rejected: {}", peer, e);
            respond(&mut stream, &handshake::bad_request(&e.to_string())).await;
            return;
        }
    };

    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!("Failed to send handshake response to {}: {}", peer, e);
        return;
    }
    if let Err(e) = stream.flush().await {
        warn!("Failed to flush handshake response to {}: {}", peer, e);
        return;
    }
    info!("WebSocket client upgraded: {}", peer);

    loop {
        tokio::select! {
            _ = shutdown_triggered(&mut shutdown) => {
                debug!("Shutdown reached websocket client {}", peer);
                break;
            }
            decoded = frame::read_frame(&mut stream) => {
                let msg = match decoded {
                    Ok(msg) => msg,
                    Err(RelayError::Protocol(reason)) => {
                        warn!("Protocol violation from {}: {}", peer, reason);
                        break;
                    }
                    Err(e) => {
                        debug!("Read from websocket client {} failed: {}", peer, e);
                        break;
                    }
                };
                debug!("Received {} bytes from {}", msg.len(), peer);

                if let Err(e) = frame::write_frame(&mut stream, &format!("echo: {}", msg)).await {
                    debug!("Echo to websocket client {} failed: {}", peer, e);
                    break;
                }
            }
        }
    }

    info!("WebSocket client disconnected: {}", peer);
}

// Best-effort error response; the connection is closing either way
async fn respond(stream: &mut BufStream<TcpStream>, response: &str) {
    if stream.write_all(response.as_bytes()).await.is_ok() {
        let _ = stream.flush().await;
    }
}
