use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use kanban_domain::{BoardEvent, BoardId, Caller, EventKind};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::api::SharedState;
use crate::hub::ConnectionId;
use crate::identity::Identity;

/// How often to send WebSocket Ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for a Pong response before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

// ── WebSocket message types ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinBoard { board_id: BoardId },
    LeaveBoard { board_id: BoardId },
}

/// Replies to client messages. Board events are pushed as serialized
/// `BoardEvent`s alongside these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerReply {
    Joined { board_id: BoardId },
    Left { board_id: BoardId },
    Error { message: String, status_code: u16 },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Identity(caller): Identity,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, caller))
}

async fn handle_socket(socket: WebSocket, state: SharedState, caller: Caller) {
    let (sender, receiver) = socket.split();
    let (connection, events) = state.hub.connect();
    tracing::debug!(%connection, user = %caller, "websocket connected");

    run_socket_loop(sender, receiver, events, &state, &caller, connection).await;

    state.hub.disconnect(connection);
    tracing::debug!(%connection, user = %caller, "websocket disconnected");
}

/// Forward hub events to the client, answer join/leave requests, and keep
/// the connection alive with pings. Exits when either side goes away or no
/// Pong arrives within [`PONG_TIMEOUT`].
async fn run_socket_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut receiver: SplitStream<WebSocket>,
    mut events: mpsc::Receiver<String>,
    state: &SharedState,
    caller: &Caller,
    connection: ConnectionId,
) {
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await;
    let mut last_pong = Instant::now();
    let mut awaiting_pong = false;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if awaiting_pong && last_pong.elapsed() > PONG_TIMEOUT {
                    tracing::debug!(%connection, "pong timeout");
                    break;
                }
                if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
                awaiting_pong = true;
            }

            event = events.recv() => {
                match event {
                    Some(json) => {
                        if !admit_event(state, caller, connection, &json).await {
                            continue;
                        }
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_client_message(state, caller, connection, text.as_str()).await;
                        let Ok(json) = serde_json::to_string(&reply) else { continue };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        awaiting_pong = false;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }
}

/// Apply one client request to the hub. Joining requires read access to
/// the board; leaving a group the connection never joined is a no-op.
pub async fn handle_client_message(
    state: &SharedState,
    caller: &Caller,
    connection: ConnectionId,
    text: &str,
) -> ServerReply {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            return ServerReply::Error {
                message: format!("invalid message: {}", err),
                status_code: 400,
            }
        }
    };

    match message {
        ClientMessage::JoinBoard { board_id } => {
            if let Err(err) = state.service.ensure_board_access(caller, board_id).await {
                return ServerReply::Error {
                    message: err.to_string(),
                    status_code: err.status_code(),
                };
            }
            state.hub.join(connection, &board_id.to_string());
            ServerReply::Joined { board_id }
        }
        ClientMessage::LeaveBoard { board_id } => {
            state.hub.leave(connection, &board_id.to_string());
            ServerReply::Left { board_id }
        }
    }
}

/// Access is re-checked on delivery. A connection whose caller lost access
/// to the board leaves its group, seeing only the event that revoked it.
async fn admit_event(
    state: &SharedState,
    caller: &Caller,
    connection: ConnectionId,
    json: &str,
) -> bool {
    let Ok(event) = serde_json::from_str::<BoardEvent>(json) else {
        return true;
    };
    if state
        .service
        .ensure_board_access(caller, event.board_id)
        .await
        .is_ok()
    {
        return true;
    }
    state.hub.leave(connection, &event.board_id.to_string());
    tracing::debug!(%connection, user = %caller, board_id = %event.board_id, "board access revoked");
    matches!(event.kind, EventKind::BoardDeleted | EventKind::MemberRemoved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AppState;
    use crate::files::MockFileStorage;
    use crate::hub::BoardHub;
    use crate::service::{AddMember, CreateBoard, CreateTask, KanbanService};
    use kanban_core::AppConfig;
    use kanban_domain::BoardRole;
    use kanban_persistence::Database;
    use std::sync::Arc;

    fn state() -> SharedState {
        let hub = Arc::new(BoardHub::new(8));
        let service = KanbanService::new(
            Arc::new(Database::in_memory()),
            hub.clone(),
            Arc::new(MockFileStorage::new()),
            Arc::new(AppConfig::default()),
        );
        Arc::new(AppState {
            service: Arc::new(service),
            hub,
            identity_header: "x-user-id".into(),
        })
    }

    fn caller(id: &str) -> Caller {
        Caller::from_identity(Some(id)).unwrap()
    }

    #[test]
    fn test_client_message_format() {
        let board_id = uuid::Uuid::new_v4();
        let json = format!(r#"{{"action":"join_board","board_id":"{}"}}"#, board_id);
        assert_eq!(
            serde_json::from_str::<ClientMessage>(&json).unwrap(),
            ClientMessage::JoinBoard { board_id }
        );
    }

    #[tokio::test]
    async fn test_member_joins_and_receives_events() {
        let state = state();
        let alice = caller("alice");
        let board = state
            .service
            .create_board(&alice, CreateBoard::named("Roadmap"))
            .await
            .unwrap();
        let (connection, mut events) = state.hub.connect();

        let join = format!(r#"{{"action":"join_board","board_id":"{}"}}"#, board.id);
        let reply = handle_client_message(&state, &alice, connection, &join).await;
        assert_eq!(reply, ServerReply::Joined { board_id: board.id });

        let columns = state.service.list_columns(&alice, board.id).await.unwrap();
        let task = state
            .service
            .create_task(&alice, board.id, CreateTask::titled(columns[0].id, "Ship"))
            .await
            .unwrap();
        state.service.delete_task(&alice, task.id).await.unwrap();

        let created: BoardEvent = serde_json::from_str(&events.recv().await.unwrap()).unwrap();
        let deleted: BoardEvent = serde_json::from_str(&events.recv().await.unwrap()).unwrap();
        assert_eq!(created.kind, EventKind::TaskCreated);
        assert_eq!(deleted.kind, EventKind::TaskDeleted);
        assert_eq!(deleted.resource_id, task.id);
    }

    #[tokio::test]
    async fn test_non_member_cannot_join() {
        let state = state();
        let board = state
            .service
            .create_board(&caller("alice"), CreateBoard::named("Private"))
            .await
            .unwrap();
        let (connection, _events) = state.hub.connect();

        let join = format!(r#"{{"action":"join_board","board_id":"{}"}}"#, board.id);
        let reply = handle_client_message(&state, &caller("mallory"), connection, &join).await;
        assert!(matches!(reply, ServerReply::Error { status_code: 403, .. }));
        assert_eq!(state.hub.group_size(&board.id.to_string()), 0);
    }

    #[tokio::test]
    async fn test_garbage_is_rejected() {
        let state = state();
        let (connection, _events) = state.hub.connect();
        let reply = handle_client_message(&state, &caller("alice"), connection, "hello").await;
        assert!(matches!(reply, ServerReply::Error { status_code: 400, .. }));
    }

    #[tokio::test]
    async fn test_removed_member_stops_receiving_events() {
        let state = state();
        let alice = caller("alice");
        let bob = caller("bob");
        let board = state
            .service
            .create_board(&alice, CreateBoard::named("Roadmap"))
            .await
            .unwrap();
        state
            .service
            .add_member(
                &alice,
                board.id,
                AddMember {
                    user_id: "bob".into(),
                    role: BoardRole::Member,
                },
            )
            .await
            .unwrap();
        let (connection, mut events) = state.hub.connect();
        let join = format!(r#"{{"action":"join_board","board_id":"{}"}}"#, board.id);
        handle_client_message(&state, &bob, connection, &join).await;

        state.service.remove_member(&alice, board.id, "bob").await.unwrap();
        let removed = events.recv().await.unwrap();
        assert!(admit_event(&state, &bob, connection, &removed).await);
        assert_eq!(state.hub.group_size(&board.id.to_string()), 0);

        let later = BoardEvent::new(EventKind::TaskCreated, board.id, uuid::Uuid::new_v4());
        let later = serde_json::to_string(&later).unwrap();
        assert!(!admit_event(&state, &bob, connection, &later).await);
        assert!(admit_event(&state, &alice, connection, &later).await);
    }
}
