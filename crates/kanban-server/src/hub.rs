//! In-memory board groups for real-time subscribers.
//!
//! Each connection owns a bounded queue. Groups are keyed by the board id
//! string and hold connection ids only; nothing here survives a restart and a
//! reconnecting client has to join again.

use std::collections::{HashMap, HashSet};

use kanban_domain::BoardEvent;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::notifier::ChangeNotifier;

pub type ConnectionId = Uuid;

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnectionId, mpsc::Sender<String>>,
    groups: HashMap<String, HashSet<ConnectionId>>,
}

pub struct BoardHub {
    capacity: usize,
    state: Mutex<HubState>,
}

impl BoardHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(HubState::default()),
        }
    }

    /// Register a connection and hand back the receiving end of its queue.
    pub fn connect(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4();
        self.state.lock().connections.insert(id, tx);
        tracing::debug!(connection = %id, "connection registered");
        (id, rx)
    }

    /// Returns false when the connection is unknown.
    pub fn join(&self, connection: ConnectionId, group: &str) -> bool {
        let mut state = self.state.lock();
        if !state.connections.contains_key(&connection) {
            return false;
        }
        state
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(connection);
        tracing::debug!(connection = %connection, %group, "joined group");
        true
    }

    pub fn leave(&self, connection: ConnectionId, group: &str) -> bool {
        let mut state = self.state.lock();
        let Some(members) = state.groups.get_mut(group) else {
            return false;
        };
        let removed = members.remove(&connection);
        if members.is_empty() {
            state.groups.remove(group);
        }
        removed
    }

    /// Drop the connection's queue and remove it from every group.
    pub fn disconnect(&self, connection: ConnectionId) {
        let mut state = self.state.lock();
        state.connections.remove(&connection);
        state.groups.retain(|_, members| {
            members.remove(&connection);
            !members.is_empty()
        });
        tracing::debug!(connection = %connection, "connection removed");
    }

    pub fn group_size(&self, group: &str) -> usize {
        self.state.lock().groups.get(group).map_or(0, HashSet::len)
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }
}

impl ChangeNotifier for BoardHub {
    fn publish(&self, event: BoardEvent) {
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("failed to serialize board event: {}", e);
                return;
            }
        };

        let group = event.group();
        let state = self.state.lock();
        let Some(members) = state.groups.get(&group) else {
            return;
        };
        for connection in members {
            let Some(queue) = state.connections.get(connection) else {
                continue;
            };
            match queue.try_send(payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(connection = %connection, %group, "queue full, event dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection = %connection, %group, "queue closed, event dropped");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_domain::EventKind;

    fn event(board_id: Uuid) -> BoardEvent {
        BoardEvent::new(EventKind::TaskDeleted, board_id, Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_joined_connection_receives_event() {
        let hub = BoardHub::new(8);
        let board_id = Uuid::new_v4();
        let (conn, mut rx) = hub.connect();
        assert!(hub.join(conn, &board_id.to_string()));

        let sent = event(board_id);
        hub.publish(sent.clone());

        let payload = rx.recv().await.unwrap();
        let received: BoardEvent = serde_json::from_str(&payload).unwrap();
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn test_other_boards_are_not_delivered() {
        let hub = BoardHub::new(8);
        let (conn, mut rx) = hub.connect();
        hub.join(conn, &Uuid::new_v4().to_string());

        hub.publish(event(Uuid::new_v4()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let hub = BoardHub::new(1);
        let board_id = Uuid::new_v4();
        let (conn, mut rx) = hub.connect();
        hub.join(conn, &board_id.to_string());

        hub.publish(event(board_id));
        hub.publish(event(board_id));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_leave_and_disconnect() {
        let hub = BoardHub::new(4);
        let group = Uuid::new_v4().to_string();
        let (a, _rx_a) = hub.connect();
        let (b, _rx_b) = hub.connect();
        hub.join(a, &group);
        hub.join(b, &group);
        assert_eq!(hub.group_size(&group), 2);

        assert!(hub.leave(a, &group));
        assert!(!hub.leave(a, &group));
        assert_eq!(hub.group_size(&group), 1);

        hub.disconnect(b);
        assert_eq!(hub.group_size(&group), 0);
        assert_eq!(hub.connection_count(), 1);
    }

    #[test]
    fn test_unknown_connection_cannot_join() {
        let hub = BoardHub::new(4);
        assert!(!hub.join(Uuid::new_v4(), "board"));
    }
}
