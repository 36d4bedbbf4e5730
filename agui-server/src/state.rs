//! Application state shared across all request handlers.

use crate::config::RelayConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{RwLock, broadcast};

/// One event frame on its way to every connected client.
#[derive(Debug, Clone)]
pub struct RelayMessage {
    /// Client that published the frame.
    pub origin: u64,
    /// The JSON text exactly as the publisher sent it.
    pub payload: Arc<str>,
}

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Fan-out channel every WebSocket task subscribes to.
    pub relay_tx: broadcast::Sender<RelayMessage>,
    /// Relay configuration (can be reloaded via SIGHUP).
    pub relay: Arc<RwLock<RelayConfig>>,
    clients: Arc<AtomicUsize>,
    next_client_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(relay: RelayConfig) -> Self {
        let (relay_tx, _) = broadcast::channel(relay.channel_capacity);
        Self {
            relay_tx,
            relay: Arc::new(RwLock::new(relay)),
            clients: Arc::new(AtomicUsize::new(0)),
            next_client_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn connected_clients(&self) -> usize {
        self.clients.load(Ordering::Relaxed)
    }

    /// Count a new client. The returned guard uncounts it when dropped.
    pub fn register_client(&self) -> ClientGuard {
        self.clients.fetch_add(1, Ordering::Relaxed);
        ClientGuard {
            id: self.next_client_id.fetch_add(1, Ordering::Relaxed),
            clients: self.clients.clone(),
        }
    }

    pub async fn echo(&self) -> bool {
        self.relay.read().await.echo
    }

    /// Update the relay configuration (used during SIGHUP reload).
    ///
    /// The broadcast channel keeps its original capacity.
    pub async fn update_relay(&self, new_config: RelayConfig) {
        let mut relay = self.relay.write().await;
        if relay.channel_capacity != new_config.channel_capacity {
            tracing::warn!(
                current = relay.channel_capacity,
                requested = new_config.channel_capacity,
                "relay.channel_capacity only takes effect after a restart"
            );
        }
        *relay = new_config;
    }
}

/// A connected WebSocket client.
pub struct ClientGuard {
    id: u64,
    clients: Arc<AtomicUsize>,
}

impl ClientGuard {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        self.clients.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_guard_counts() {
        let state = AppState::new(RelayConfig::default());
        let first = state.register_client();
        let second = state.register_client();
        assert_ne!(first.id(), second.id());
        assert_eq!(state.connected_clients(), 2);

        drop(first);
        assert_eq!(state.connected_clients(), 1);
    }

    #[tokio::test]
    async fn test_update_relay_changes_echo() {
        let state = AppState::new(RelayConfig::default());
        assert!(!state.echo().await);
        state
            .update_relay(RelayConfig {
                echo: true,
                ..RelayConfig::default()
            })
            .await;
        assert!(state.echo().await);
    }
}
