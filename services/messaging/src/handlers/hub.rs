//! WebSocket endpoint for the real-time hub.
//!
//! Clients connect unauthenticated, then invoke `connect` with their access
//! token as the first frame:
//! `{"method": "connect", "accessToken": "..."}`.
//! Server frames are `{event, payload}` with the shared response envelope as
//! payload.

use axum::extract::State;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use chrono::Utc;
use futures::{SinkExt as _, StreamExt as _};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use courier_auth_types::token::validate_access_token;

use crate::domain::repository::UserRepository as _;
use crate::handlers::profile::ProfileResponse;
use crate::hub::{EVENT_CONNECT, EVENT_USER_CONNECTION};
use crate::response::reply;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
enum ClientCommand {
    #[serde(rename_all = "camelCase")]
    Connect { access_token: String },
}

// ── GET /hub ─────────────────────────────────────────────────────────────────

pub async fn hub_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| hub_connection(state, socket))
}

async fn hub_connection(state: AppState, socket: WebSocket) {
    let connection_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.hub.register(connection_id, tx);

    let (mut sink, mut stream) = socket.split();

    // Outbound pump: hub events → socket frames.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        match frame {
            WsMessage::Text(text) => {
                // Unknown or malformed invocations are ignored, not errors.
                if let Ok(ClientCommand::Connect { access_token }) =
                    serde_json::from_str::<ClientCommand>(&text)
                {
                    handle_connect(&state, connection_id, &access_token).await;
                }
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    handle_disconnect(&state, connection_id).await;
    writer.abort();
}

async fn handle_connect(state: &AppState, connection_id: Uuid, access_token: &str) {
    let info = match validate_access_token(access_token, &state.jwt_secret) {
        Ok(info) => info,
        Err(_) => {
            // Rejection goes to the caller only, never broadcast.
            state.hub.send_to_connection(
                connection_id,
                EVENT_CONNECT,
                envelope(reply::fail("Token invalid or expired")),
            );
            return;
        }
    };

    let users = state.user_repo();
    match users.set_presence(info.user_id, true, Utc::now()).await {
        Err(e) => {
            tracing::error!(error = %e, "could not flag user active on connect");
        }
        Ok(None) => {
            state.hub.send_to_connection(
                connection_id,
                EVENT_CONNECT,
                envelope(reply::fail("User not found")),
            );
        }
        Ok(Some(user)) => {
            state.hub.bind_user(connection_id, user.id);
            state.hub.send_to_connection(
                connection_id,
                EVENT_CONNECT,
                envelope(reply::success("Connect success", ProfileResponse::from(user))),
            );
            state.hub.broadcast_all(EVENT_USER_CONNECTION, json!(""));
        }
    }
}

async fn handle_disconnect(state: &AppState, connection_id: Uuid) {
    let Some((user_id, _last_connection)) = state.hub.unregister(connection_id) else {
        return;
    };
    // Presence cleanup is best-effort; a db hiccup here must not propagate.
    let users = state.user_repo();
    if let Err(e) = users.set_presence(user_id, false, Utc::now()).await {
        tracing::error!(error = %e, "could not flag user inactive on disconnect");
    }
    state.hub.broadcast_all(EVENT_USER_CONNECTION, json!(""));
}

fn envelope<T: serde::Serialize>(body: crate::response::Reply<T>) -> serde_json::Value {
    serde_json::to_value(body).unwrap_or(serde_json::Value::Null)
}
