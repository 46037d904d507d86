//! Connection registry — process-local mapping from user id to live
//! connections.
//!
//! Owned by the gateway process and constructed at startup; never shared
//! across processes and never persisted. On restart it is empty and clients
//! must reconnect. Cross-process routing is the broadcast channel's job:
//! every gateway subscribes, so it does not matter which process a user's
//! socket landed on.
//!
//! Each connection is represented by a bounded sender feeding that
//! connection's writer task. Fanout uses `try_send` only, so a slow client
//! can never stall the shared subscriber loop; a full buffer is treated the
//! same as a dead connection.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::mpsc;
use uuid::Uuid;

/// Handle identifying one registered connection.
pub type ConnectionId = Uuid;

#[derive(Default)]
struct Inner {
    /// user id -> connections for that user (multiple tabs/devices).
    by_user: HashMap<String, HashMap<ConnectionId, mpsc::Sender<String>>>,
    /// Reverse index so unregister needs only the handle.
    owner: HashMap<ConnectionId, String>,
}

/// Per-process registry of live client connections.
pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Add a connection for `user_id`, returning its handle.
    pub fn register(&self, user_id: &str, sender: mpsc::Sender<String>) -> ConnectionId {
        let conn_id = Uuid::new_v4();
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner
            .by_user
            .entry(user_id.to_string())
            .or_default()
            .insert(conn_id, sender);
        inner.owner.insert(conn_id, user_id.to_string());

        tracing::info!(user_id, conn_id = %conn_id, "Connection registered");
        conn_id
    }

    /// Remove a connection. Returns `false` if the handle was already gone,
    /// which is normal when a disconnect races a failed forward.
    pub fn unregister(&self, conn_id: ConnectionId) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let Some(user_id) = inner.owner.remove(&conn_id) else {
            return false;
        };
        if let Some(conns) = inner.by_user.get_mut(&user_id) {
            conns.remove(&conn_id);
            if conns.is_empty() {
                inner.by_user.remove(&user_id);
            }
        }

        tracing::info!(user_id = %user_id, conn_id = %conn_id, "Connection unregistered");
        true
    }

    /// Senders for every live connection of `user_id`.
    pub fn lookup(&self, user_id: &str) -> Vec<(ConnectionId, mpsc::Sender<String>)> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .by_user
            .get(user_id)
            .map(|conns| {
                conns
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Forward a serialized frame to every connection of `user_id`.
    ///
    /// Non-blocking: the frame is `try_send`-ed into each connection's
    /// bounded buffer. A connection whose buffer is full or whose writer has
    /// hung up is reaped on the spot. Returns the number of connections the
    /// frame was handed to; zero matching connections is a silent no-op.
    pub fn dispatch(&self, user_id: &str, frame: &str) -> usize {
        let targets = self.lookup(user_id);
        if targets.is_empty() {
            return 0;
        }

        let mut forwarded = 0;
        let mut dead = Vec::new();
        for (conn_id, tx) in targets {
            match tx.try_send(frame.to_string()) {
                Ok(()) => forwarded += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(user_id, conn_id = %conn_id, "Outbound buffer full, dropping connection");
                    dead.push(conn_id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(user_id, conn_id = %conn_id, "Connection writer gone, reaping");
                    dead.push(conn_id);
                }
            }
        }
        for conn_id in dead {
            self.unregister(conn_id);
        }

        forwarded
    }

    /// Number of live connections across all users.
    pub fn connection_count(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.owner.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
