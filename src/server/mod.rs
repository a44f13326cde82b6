use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::agent::{AgentSession, TurnEvent, TurnRequest};
use crate::memory::MemoryStore;

const MISSING_PROMPT: &str = "Prompt is required";

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<AgentSession>,
    pub store: Arc<MemoryStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/ws/chat", get(ws_chat))
        .route("/api/v1/tools", get(list_tools))
        .route("/api/v1/tools/execute", post(execute_tool))
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    use anyhow::Context;

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, "lyra listening");
    axum::serve(listener, app).await.context("Server error")
}

async fn health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "Lyra"}))
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    #[serde(default)]
    prompt: String,
    system_prompt: Option<String>,
    conversation_id: Option<String>,
}

async fn chat(State(state): State<AppState>, Json(body): Json<ChatBody>) -> Json<Value> {
    if body.prompt.is_empty() {
        return Json(json!({"error": MISSING_PROMPT}));
    }

    let conversation_id = match body.conversation_id {
        Some(id) => id,
        None => match state.store.create(None).await {
            Ok(id) => id,
            Err(e) => return Json(json!({"error": e.to_string()})),
        },
    };

    let request = TurnRequest {
        conversation_id: conversation_id.clone(),
        prompt: body.prompt,
        system_prompt: body.system_prompt,
    };

    match state.session.submit(&request).await {
        Ok(reply) => Json(json!({"response": reply, "conversation_id": conversation_id})),
        Err(e) => Json(json!({"error": e.to_string()})),
    }
}

#[derive(Debug, Deserialize)]
struct WsTurn {
    #[serde(default)]
    prompt: String,
    system_prompt: Option<String>,
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WsFrame {
    Chunk { content: String },
    End,
    Error { content: String },
}

impl From<TurnEvent> for WsFrame {
    fn from(event: TurnEvent) -> Self {
        match event {
            TurnEvent::Chunk(content) => WsFrame::Chunk { content },
            TurnEvent::End => WsFrame::End,
            TurnEvent::Error(content) => WsFrame::Error { content },
        }
    }
}

async fn ws_chat(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// One duplex chat session. Each inbound text frame is a turn; the reply is
/// streamed back as chunk frames followed by one end frame. Disconnecting
/// drops the in-flight turn stream, which cancels the turn.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    debug!("websocket connection accepted");

    // Turns without an explicit conversation id share one per connection.
    let mut default_conversation: Option<String> = None;

    while let Some(Ok(message)) = socket.recv().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let turn = match serde_json::from_str::<WsTurn>(&text) {
            Ok(turn) if !turn.prompt.is_empty() => turn,
            _ => {
                let frame = WsFrame::Error {
                    content: MISSING_PROMPT.to_string(),
                };
                if !send_frame(&mut socket, &frame).await {
                    return;
                }
                continue;
            }
        };

        let conversation_id = match turn.conversation_id.or_else(|| default_conversation.clone()) {
            Some(id) => id,
            None => match state.store.create(None).await {
                Ok(id) => {
                    default_conversation = Some(id.clone());
                    id
                }
                Err(e) => {
                    let frame = WsFrame::Error {
                        content: e.to_string(),
                    };
                    if !send_frame(&mut socket, &frame).await {
                        return;
                    }
                    continue;
                }
            },
        };

        let request = TurnRequest {
            conversation_id,
            prompt: turn.prompt,
            system_prompt: turn.system_prompt,
        };

        let events = state.session.submit_streaming(request);
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            if !send_frame(&mut socket, &WsFrame::from(event)).await {
                // Client went away mid-turn: dropping the event stream
                // abandons the turn without persisting a partial reply.
                return;
            }
        }
    }

    debug!("websocket connection closed");
}

async fn send_frame(socket: &mut WebSocket, frame: &WsFrame) -> bool {
    match serde_json::to_string(frame) {
        Ok(text) => socket.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            error!(error = %e, "failed to encode websocket frame");
            false
        }
    }
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let tools: Vec<Value> = state
        .session
        .tools()
        .list_tools()
        .await
        .into_iter()
        .map(|(name, description)| json!({"name": name, "description": description}))
        .collect();

    Json(json!({"tools": tools}))
}

#[derive(Debug, Deserialize)]
struct ToolCallBody {
    name: String,
    #[serde(default)]
    parameters: Value,
}

async fn execute_tool(
    State(state): State<AppState>,
    Json(body): Json<ToolCallBody>,
) -> Json<crate::tool_executor::ToolOutcome> {
    Json(state.session.dispatch_tool(&body.name, &body.parameters).await)
}
