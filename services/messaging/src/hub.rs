//! Real-time hub: tracks live connections, groups them per user, and pushes
//! events to groups. The WebSocket plumbing lives in `handlers::hub`; this
//! module is the registry the rest of the service talks to.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::repository::Notifier;

pub const EVENT_CONNECT: &str = "connect";
pub const EVENT_USER_CONNECTION: &str = "userConnection";
pub const EVENT_MESSAGE_RECEIVED: &str = "messageReceived";
pub const EVENT_MESSAGE_SEEN: &str = "messageSeen";

/// One server-pushed frame, serialized as JSON text on the socket.
#[derive(Debug, Clone, Serialize)]
pub struct HubEvent {
    pub event: String,
    pub payload: serde_json::Value,
}

impl HubEvent {
    pub fn new(event: &str, payload: serde_json::Value) -> Self {
        Self {
            event: event.to_owned(),
            payload,
        }
    }
}

struct Connection {
    sender: mpsc::UnboundedSender<HubEvent>,
    user_id: Option<Uuid>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<Uuid, Connection>,
    /// Group key is the stringified user id.
    groups: HashMap<String, HashSet<Uuid>>,
}

/// Connection registry with per-user groups. All sends are fire-and-forget:
/// a closed or missing receiver is silently skipped, never an error.
#[derive(Default)]
pub struct Hub {
    registry: Mutex<Registry>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly accepted connection. No group membership yet — that
    /// happens when the client authenticates via `bind_user`.
    pub fn register(&self, connection_id: Uuid, sender: mpsc::UnboundedSender<HubEvent>) {
        let mut registry = self.registry.lock().unwrap();
        registry.connections.insert(
            connection_id,
            Connection {
                sender,
                user_id: None,
            },
        );
    }

    /// Bind an authenticated user to the connection and join their group.
    pub fn bind_user(&self, connection_id: Uuid, user_id: Uuid) {
        let mut registry = self.registry.lock().unwrap();
        if let Some(conn) = registry.connections.get_mut(&connection_id) {
            conn.user_id = Some(user_id);
            registry
                .groups
                .entry(user_id.to_string())
                .or_default()
                .insert(connection_id);
        }
    }

    /// Drop a connection, leaving its group. Returns the bound user (if the
    /// connection had authenticated) and whether that user has no remaining
    /// live connections.
    pub fn unregister(&self, connection_id: Uuid) -> Option<(Uuid, bool)> {
        let mut registry = self.registry.lock().unwrap();
        let conn = registry.connections.remove(&connection_id)?;
        let user_id = conn.user_id?;
        let key = user_id.to_string();
        let now_empty = match registry.groups.get_mut(&key) {
            Some(members) => {
                members.remove(&connection_id);
                members.is_empty()
            }
            None => true,
        };
        if now_empty {
            registry.groups.remove(&key);
        }
        Some((user_id, now_empty))
    }

    pub fn send_to_connection(&self, connection_id: Uuid, event: &str, payload: serde_json::Value) {
        let registry = self.registry.lock().unwrap();
        if let Some(conn) = registry.connections.get(&connection_id) {
            let _ = conn.sender.send(HubEvent::new(event, payload));
        }
    }

    pub fn send_to_group(&self, group: &str, event: &str, payload: serde_json::Value) {
        let registry = self.registry.lock().unwrap();
        let Some(members) = registry.groups.get(group) else {
            return;
        };
        for connection_id in members {
            if let Some(conn) = registry.connections.get(connection_id) {
                let _ = conn.sender.send(HubEvent::new(event, payload.clone()));
            }
        }
    }

    pub fn broadcast_all(&self, event: &str, payload: serde_json::Value) {
        let registry = self.registry.lock().unwrap();
        for conn in registry.connections.values() {
            let _ = conn.sender.send(HubEvent::new(event, payload.clone()));
        }
    }
}

impl Notifier for Arc<Hub> {
    fn send_to_user(&self, user_id: Uuid, event: &str, payload: serde_json::Value) {
        self.send_to_group(&user_id.to_string(), event, payload);
    }

    fn broadcast(&self, event: &str, payload: serde_json::Value) {
        self.broadcast_all(event, payload);
    }
}
