//! WebSocket handler for the two player clients
//!
//! Message types are aligned between engine and clients. Each connection
//! joins as Hero or Buddy, enqueues timestamped actions toward the tick
//! loop, and receives the full snapshot stream keyed by tick number.
//! Denial replies go only to the client whose action was rejected.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::application::services::{ClientCommand, ClientEnvelope, EngineReply};
use crate::domain::snapshot::GameSnapshot;
use crate::domain::value_objects::{Action, ClientRole, DenyReason, EpisodeId};
use crate::infrastructure::state::AppState;

/// Messages from a client to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Claim a role for this connection. Must come first.
    Join { role: ClientRole },
    /// A gameplay action with the client's merge keys.
    Action {
        seq: u64,
        timestamp_ms: u64,
        action: Action,
    },
    SubmitChoice {
        episode_id: EpisodeId,
        option_index: usize,
    },
    Restart,
    RequestSnapshot,
    Ping,
}

/// Messages from the engine to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Joined {
        role: ClientRole,
        tick: u64,
        /// Renderer-friendly wall grid, `(2w+1) x (2h+1)`.
        wall_grid: Vec<Vec<bool>>,
        grid_width: usize,
        grid_height: usize,
    },
    Snapshot {
        tick: u64,
        snapshot: GameSnapshot,
    },
    ActionDenied {
        seq: u64,
        reason: DenyReason,
    },
    ChoiceRejected {
        episode_id: EpisodeId,
        reason: String,
    },
    Error {
        code: String,
        message: String,
    },
    Pong,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Channel for everything going out to this client.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    tracing::info!("new WebSocket connection established");

    // Forward outbound messages to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&message) {
                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Engine replies for this client map onto server messages.
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<EngineReply>();
    let reply_forward = {
        let tx = tx.clone();
        tokio::spawn(async move {
            while let Some(reply) = reply_rx.recv().await {
                let message = match reply {
                    EngineReply::ActionDenied { seq, reason } => {
                        ServerMessage::ActionDenied { seq, reason }
                    }
                    EngineReply::ChoiceRejected { episode, reason } => {
                        ServerMessage::ChoiceRejected {
                            episode_id: episode,
                            reason,
                        }
                    }
                };
                if tx.send(message).is_err() {
                    break;
                }
            }
        })
    };

    // Snapshot stream, started once the client joins.
    let mut role: Option<ClientRole> = None;
    let mut snapshot_task: Option<tokio::task::JoinHandle<()>> = None;

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => {
                    if let Some(response) = handle_message(
                        message,
                        &state,
                        &mut role,
                        &mut snapshot_task,
                        &tx,
                        &reply_tx,
                    ) {
                        if tx.send(response).is_err() {
                            break;
                        }
                    }
                }
                Err(error) => {
                    tracing::warn!("failed to parse client message: {}", error);
                    let message = ServerMessage::Error {
                        code: "PARSE_ERROR".to_string(),
                        message: format!("Invalid message format: {}", error),
                    };
                    if tx.send(message).is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!(?role, "WebSocket connection closed by client");
                break;
            }
            Ok(Message::Ping(_)) => {
                let _ = tx.send(ServerMessage::Pong);
            }
            Err(error) => {
                tracing::error!("WebSocket error: {}", error);
                break;
            }
            _ => {}
        }
    }

    if let Some(task) = snapshot_task {
        task.abort();
    }
    reply_forward.abort();
    send_task.abort();
    tracing::info!(?role, "WebSocket connection terminated");
}

/// Process one parsed client message; the return value is sent back.
fn handle_message(
    message: ClientMessage,
    state: &Arc<AppState>,
    role: &mut Option<ClientRole>,
    snapshot_task: &mut Option<tokio::task::JoinHandle<()>>,
    tx: &mpsc::UnboundedSender<ServerMessage>,
    reply_tx: &mpsc::UnboundedSender<EngineReply>,
) -> Option<ServerMessage> {
    match message {
        ClientMessage::Join { role: wanted } => {
            *role = Some(wanted);
            let snapshot = state.engine.snapshots.borrow().clone();
            let (wall_grid, (grid_width, grid_height)) = snapshot.maze.wall_grid();

            // Stream every published snapshot to this client.
            if snapshot_task.is_none() {
                let mut snapshots = state.engine.snapshots.clone();
                let tx = tx.clone();
                *snapshot_task = Some(tokio::spawn(async move {
                    while snapshots.changed().await.is_ok() {
                        let snapshot = snapshots.borrow_and_update().clone();
                        let message = ServerMessage::Snapshot {
                            tick: snapshot.run.tick,
                            snapshot: (*snapshot).clone(),
                        };
                        if tx.send(message).is_err() {
                            break;
                        }
                    }
                }));
            }

            tracing::info!(role = %wanted, "client joined");
            Some(ServerMessage::Joined {
                role: wanted,
                tick: snapshot.run.tick,
                wall_grid,
                grid_width,
                grid_height,
            })
        }
        ClientMessage::Action {
            seq,
            timestamp_ms,
            action,
        } => {
            let Some(client) = *role else {
                return Some(not_joined());
            };
            let envelope = ClientEnvelope {
                client,
                seq,
                timestamp_ms,
                command: ClientCommand::Act(action),
                reply: Some(reply_tx.clone()),
            };
            if state.engine.commands.send(envelope).is_err() {
                return Some(engine_gone());
            }
            None
        }
        ClientMessage::SubmitChoice {
            episode_id,
            option_index,
        } => {
            let Some(client) = *role else {
                return Some(not_joined());
            };
            let envelope = ClientEnvelope {
                client,
                seq: 0,
                timestamp_ms: 0,
                command: ClientCommand::SubmitChoice {
                    episode: episode_id,
                    option_index,
                },
                reply: Some(reply_tx.clone()),
            };
            if state.engine.commands.send(envelope).is_err() {
                return Some(engine_gone());
            }
            None
        }
        ClientMessage::Restart => {
            let Some(client) = *role else {
                return Some(not_joined());
            };
            let envelope = ClientEnvelope {
                client,
                seq: 0,
                timestamp_ms: 0,
                command: ClientCommand::Restart,
                reply: None,
            };
            if state.engine.commands.send(envelope).is_err() {
                return Some(engine_gone());
            }
            None
        }
        ClientMessage::RequestSnapshot => {
            let snapshot = state.engine.snapshots.borrow().clone();
            Some(ServerMessage::Snapshot {
                tick: snapshot.run.tick,
                snapshot: (*snapshot).clone(),
            })
        }
        ClientMessage::Ping => Some(ServerMessage::Pong),
    }
}

fn not_joined() -> ServerMessage {
    ServerMessage::Error {
        code: "NOT_JOINED".to_string(),
        message: "Join with a role before sending actions".to_string(),
    }
}

fn engine_gone() -> ServerMessage {
    ServerMessage::Error {
        code: "ENGINE_UNAVAILABLE".to_string(),
        message: "The game engine is not running".to_string(),
    }
}
