use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use crate::backends::LlmService;
use crate::memory::{MemoryStore, Role, StorageError};
use crate::tool_executor::{ToolExecutor, ToolOutcome};

/// One inbound turn: a prompt against a conversation.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub conversation_id: String,
    pub prompt: String,
    pub system_prompt: Option<String>,
}

/// Events a streaming turn emits toward the transport, in order: zero or
/// more chunks, then exactly one end. An error replaces the chunk sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    Chunk(String),
    End,
    Error(String),
}

/// Coordinates one turn across the store, the generation service, and the
/// tool gateway: persist the user message, generate, persist the reply,
/// signal end of turn.
pub struct AgentSession {
    store: Arc<MemoryStore>,
    llm: Arc<LlmService>,
    tools: Arc<ToolExecutor>,
}

impl AgentSession {
    pub fn new(store: Arc<MemoryStore>, llm: Arc<LlmService>, tools: Arc<ToolExecutor>) -> Self {
        Self { store, llm, tools }
    }

    pub fn tools(&self) -> &ToolExecutor {
        &self.tools
    }

    /// Blocking turn. A storage fault while recording the user message
    /// aborts before generation begins; generation faults degrade to the
    /// apology reply inside the service and still complete the turn.
    pub async fn submit(&self, request: &TurnRequest) -> Result<String, StorageError> {
        self.store
            .append_message(&request.conversation_id, Role::User, &request.prompt)
            .await?;

        let reply = self
            .llm
            .complete(&request.prompt, request.system_prompt.as_deref())
            .await;

        self.store
            .append_message(&request.conversation_id, Role::Assistant, &reply)
            .await?;

        debug!(conversation = %request.conversation_id, "turn completed");
        Ok(reply)
    }

    /// Streaming turn. Chunks are forwarded in arrival order; the assembled
    /// reply is persisted only after the final chunk, so abandoning the
    /// stream mid-turn persists nothing for the assistant.
    pub fn submit_streaming(
        &self,
        request: TurnRequest,
    ) -> impl Stream<Item = TurnEvent> + Send + '_ {
        async_stream::stream! {
            if let Err(e) = self
                .store
                .append_message(&request.conversation_id, Role::User, &request.prompt)
                .await
            {
                error!(conversation = %request.conversation_id, error = %e, "failed to record user message");
                yield TurnEvent::Error(e.to_string());
                return;
            }

            let mut chunks = self
                .llm
                .stream(&request.prompt, request.system_prompt.as_deref())
                .await;

            let mut assembled = String::new();
            while let Some(chunk) = chunks.next().await {
                assembled.push_str(&chunk);
                yield TurnEvent::Chunk(chunk);
            }

            match self
                .store
                .append_message(&request.conversation_id, Role::Assistant, &assembled)
                .await
            {
                Ok(()) => yield TurnEvent::End,
                Err(e) => {
                    error!(conversation = %request.conversation_id, error = %e, "failed to record assistant message");
                    yield TurnEvent::Error(e.to_string());
                }
            }
        }
    }

    /// Tool invocation path: straight through the permission gateway. The
    /// outcome is returned to the caller, not persisted as a conversation
    /// message.
    pub async fn dispatch_tool(&self, name: &str, params: &Value) -> ToolOutcome {
        self.tools.execute(name, params).await
    }
}
