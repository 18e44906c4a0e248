//! Broadcast dispatcher
//!
//! All outbound chat traffic flows through one ordered queue consumed by
//! a single worker task, so global delivery order across all senders
//! equals arrival order at the queue. For each message the worker takes
//! a registry snapshot and forwards the line to every session's bounded
//! outbound queue without blocking: a session whose queue is full or
//! closed is dropped from the registry, which closes its connection, and
//! delivery continues to the remaining sessions in the same round. One
//! stalled peer therefore cannot hold up the others.

use std::sync::Arc;

use log::{debug, error, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::core::session::SessionRegistry;

/// Cloneable handle feeding the single broadcast queue
#[derive(Clone)]
pub struct BroadcastDispatcher {
    queue: mpsc::UnboundedSender<String>,
}

impl BroadcastDispatcher {
    /// Spawn the worker task and return the queue handle.
    pub fn start(registry: Arc<SessionRegistry>) -> Self {
        let (queue, inbox) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(registry, inbox));
        Self { queue }
    }

    /// Enqueue one line for delivery to every registered session.
    pub fn enqueue(&self, line: String) {
        if self.queue.send(line).is_err() {
            warn!("Broadcast worker is gone; dropping message");
        }
    }
}

async fn run_worker(registry: Arc<SessionRegistry>, mut inbox: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = inbox.recv().await {
        let snapshot = match registry.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Failed to snapshot registry for broadcast: {}", e);
                continue;
            }
        };

        for (id, outbound) in snapshot {
            match outbound.try_send(line.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("Session {} cannot keep up; disconnecting it", id);
                    drop_session(&registry, id);
                }
                Err(TrySendError::Closed(_)) => {
                    // The connection task already exited; tidy up
                    drop_session(&registry, id);
                }
            }
        }
    }

    debug!("Broadcast worker stopped");
}

fn drop_session(registry: &SessionRegistry, id: Uuid) {
    if let Err(e) = registry.remove(id) {
        error!("Failed to remove session {}: {}", id, e);
    }
}
