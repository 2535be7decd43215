use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use learnhub_core::types::{DbId, Timestamp};
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// One open, authenticated connection.
pub struct WsConnection {
    pub user_id: DbId,
    pub sender: WsSender,
    pub connected_at: Timestamp,
}

/// All open connections, keyed by connection id.
///
/// Wrapped in `Arc` and shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
}

impl WsManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection and return the receiver its writer task drains.
    pub async fn add(&self, conn_id: String, user_id: DbId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            user_id,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    pub async fn remove(&self, conn_id: &str) {
        if let Some(conn) = self.connections.write().await.remove(conn_id) {
            let open_for = chrono::Utc::now() - conn.connected_at;
            tracing::debug!(
                conn_id,
                user_id = conn.user_id,
                secs = open_for.num_seconds(),
                "WebSocket connection removed"
            );
        }
    }

    /// Send a message to every connection of one user.
    ///
    /// Returns the number of connections the message was queued on. Closed
    /// channels are skipped; their reader loop removes them.
    pub async fn send_to_user(&self, user_id: DbId, message: Message) -> usize {
        let conns = self.connections.read().await;
        let mut count = 0;
        for conn in conns.values().filter(|c| c.user_id == user_id) {
            if conn.sender.send(message.clone()).is_ok() {
                count += 1;
            }
        }
        count
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connection.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn messages_reach_only_the_addressed_user() {
        let manager = WsManager::new();
        let mut first_tab = manager.add("a".into(), 1).await;
        let mut second_tab = manager.add("b".into(), 1).await;
        let mut other_user = manager.add("c".into(), 2).await;

        let sent = manager
            .send_to_user(1, Message::Text("hello".into()))
            .await;
        assert_eq!(sent, 2);
        assert!(matches!(first_tab.try_recv(), Ok(Message::Text(_))));
        assert!(matches!(second_tab.try_recv(), Ok(Message::Text(_))));
        assert!(other_user.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_receivers_are_not_counted() {
        let manager = WsManager::new();
        let rx = manager.add("a".into(), 1).await;
        drop(rx);
        assert_eq!(manager.send_to_user(1, Message::Text("x".into())).await, 0);
    }

    #[tokio::test]
    async fn shutdown_sends_close_and_clears() {
        let manager = WsManager::new();
        let mut rx = manager.add("a".into(), 1).await;
        manager.shutdown_all().await;
        assert!(matches!(rx.try_recv(), Ok(Message::Close(None))));
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn remove_drops_the_connection() {
        let manager = WsManager::new();
        let _rx = manager.add("a".into(), 7).await;
        manager.remove("a").await;
        manager.remove("missing").await;
        assert_eq!(manager.connection_count().await, 0);
    }
}
