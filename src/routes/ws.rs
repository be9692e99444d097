//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. Most requests get a single JSON reply; `spin`
//! gets `spinning` immediately and `revealed` after the reveal delay.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::logic::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "prompt_wheel", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  socket.send(Message::Text(out)).await
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "prompt_wheel", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let sent = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(ClientWsMessage::Spin) => stream_spin(&mut socket, &state).await,
          Ok(incoming) => {
            debug!(target: "prompt_wheel", "WS received: {:?}", &incoming);
            let reply = handle_client_ws(incoming, &state).await;
            send(&mut socket, &reply).await
          }
          Err(e) => send(&mut socket, &ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }).await,
        };

        if let Err(e) = sent {
          error!(target: "prompt_wheel", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "prompt_wheel", "WebSocket disconnected");
}

/// `spinning` now, `revealed` after the delay. Messages arriving meanwhile
/// wait in the socket buffer.
async fn stream_spin(socket: &mut WebSocket, state: &AppState) -> Result<(), axum::Error> {
  let (plan, slot) = match begin_spin(state, &state.user_id).await {
    Ok(started) => started,
    Err(e) => return send(socket, &ServerWsMessage::from(e)).await,
  };
  let spinning = ServerWsMessage::Spinning { plan, duration_ms: state.config.wheel.spin_duration_ms };
  let sent = send(socket, &spinning).await;

  // The wheel must leave the spinning phase even if the client went away.
  tokio::time::sleep(state.spin_delay()).await;
  let revealed = match reveal(&slot).await {
    Ok(winner) => ServerWsMessage::Revealed { winner },
    Err(e) => e.into(),
  };
  sent?;
  send(socket, &revealed).await
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  let user_id = state.user_id.as_str();
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::LoadWheel { grade, section } => match load_wheel(state, user_id, grade, section).await {
      Ok(wheel) => {
        info!(target: "wheel", %grade, %section, shown = wheel.prompts.len(), "WS wheel loaded");
        ServerWsMessage::Wheel { wheel }
      }
      Err(e) => e.into(),
    },

    ClientWsMessage::MarkFinished { prompt_id } => match set_finished(state, user_id, &prompt_id, true).await {
      Ok(out) => ServerWsMessage::Progress { prompt_id: out.prompt_id, finished: out.finished },
      Err(e) => e.into(),
    },

    ClientWsMessage::UnmarkFinished { prompt_id } => match set_finished(state, user_id, &prompt_id, false).await {
      Ok(out) => ServerWsMessage::Progress { prompt_id: out.prompt_id, finished: out.finished },
      Err(e) => e.into(),
    },

    ClientWsMessage::Spin => ServerWsMessage::Error { message: "spin must be sent on its own".into() },
  }
}
