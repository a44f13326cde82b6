use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;

pub mod llm_error;
pub mod mock;
pub mod ollama;
#[cfg(test)]
mod ollama_tests;
pub mod service;

pub use llm_error::LlmError;
pub use mock::{FailingBackend, MockBackend};
pub use ollama::{OllamaBackend, OllamaConfig};
pub use service::{APOLOGY, LlmService};

/// A finite, forward-only sequence of generated text fragments. Dropping it
/// early releases the underlying backend connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// A generation backend: optional system prompt plus one user prompt in,
/// either a full completion or a lazy chunk sequence out.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn chat(&self, prompt: &str, system_prompt: Option<&str>)
    -> Result<String, LlmError>;

    async fn chat_stream(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<ChunkStream, LlmError>;

    fn backend_name(&self) -> &str;
}
