use super::LlmBackend;
use futures_util::{Stream, StreamExt, stream};
use std::pin::Pin;
use tracing::warn;

/// Fixed in-band reply for any generation failure. Keeps the transport
/// protocol free of a separate error frame for backend faults.
pub const APOLOGY: &str = "Sorry, I encountered an error while processing your request.";

pub type TextStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Degradation wrapper around a generation backend: failures never escape
/// as errors, they surface to the user as an apology message.
pub struct LlmService {
    backend: Box<dyn LlmBackend>,
}

impl LlmService {
    pub fn new(backend: Box<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    /// Full completion; a non-empty apology string on any backend fault.
    pub async fn complete(&self, prompt: &str, system_prompt: Option<&str>) -> String {
        match self.backend.chat(prompt, system_prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(backend = self.backend.backend_name(), error = %e, "generation failed");
                APOLOGY.to_string()
            }
        }
    }

    /// Lazy chunk sequence. A fault opening the stream yields a single
    /// apology fragment; a mid-stream fault yields the apology as the final
    /// fragment and terminates. Abandoning the stream drops the backend
    /// connection, which is the cancellation mechanism.
    pub async fn stream(&self, prompt: &str, system_prompt: Option<&str>) -> TextStream {
        let mut upstream = match self.backend.chat_stream(prompt, system_prompt).await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!(backend = self.backend.backend_name(), error = %e, "generation stream failed to open");
                return Box::pin(stream::once(async { APOLOGY.to_string() }));
            }
        };

        Box::pin(async_stream::stream! {
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => yield chunk,
                    Err(e) => {
                        warn!(error = %e, "generation stream failed mid-flight");
                        yield APOLOGY.to_string();
                        return;
                    }
                }
            }
        })
    }
}
