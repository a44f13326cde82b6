use super::{ChunkStream, LlmBackend, LlmError};
use async_trait::async_trait;
use futures_util::stream;

/// Offline backend for tests and dry runs. By default it echoes the prompt;
/// scripted fragments make the chunking deterministic.
pub struct MockBackend {
    fragments: Option<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self { fragments: None }
    }

    pub fn with_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: Some(fragments.into_iter().map(Into::into).collect()),
        }
    }

    fn reply(&self, prompt: &str) -> String {
        match &self.fragments {
            Some(fragments) => fragments.concat(),
            None => format!("Mock response to: {}", prompt),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn chat(&self, prompt: &str, _system_prompt: Option<&str>) -> Result<String, LlmError> {
        Ok(self.reply(prompt))
    }

    async fn chat_stream(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
    ) -> Result<ChunkStream, LlmError> {
        let fragments = match &self.fragments {
            Some(fragments) => fragments.clone(),
            None => self
                .reply(prompt)
                .split_inclusive(' ')
                .map(|s| s.to_string())
                .collect(),
        };

        Ok(Box::pin(stream::iter(
            fragments.into_iter().map(Ok::<_, LlmError>),
        )))
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}

/// Backend that fails every call; exercises the degradation path.
pub struct FailingBackend;

#[async_trait]
impl LlmBackend for FailingBackend {
    async fn chat(&self, _prompt: &str, _system_prompt: Option<&str>) -> Result<String, LlmError> {
        Err(LlmError::Network {
            message: "mock backend failure".to_string(),
        })
    }

    async fn chat_stream(
        &self,
        _prompt: &str,
        _system_prompt: Option<&str>,
    ) -> Result<ChunkStream, LlmError> {
        Err(LlmError::Network {
            message: "mock backend failure".to_string(),
        })
    }

    fn backend_name(&self) -> &str {
        "failing"
    }
}
