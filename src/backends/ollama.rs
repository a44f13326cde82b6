use super::{ChunkStream, LlmBackend, LlmError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};

const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "gemma3:4b-it-q4_K_M";

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            temperature: None,
        }
    }
}

pub struct OllamaBackend {
    client: reqwest::Client,
    config: OllamaConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ModelOptions>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

// One line of Ollama's NDJSON streaming body.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, config })
    }

    fn create_request(&self, prompt: &str, system_prompt: Option<&str>, stream: bool) -> ChatRequest {
        let mut messages = Vec::new();

        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }

        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });

        ChatRequest {
            model: self.config.model.clone(),
            messages,
            stream,
            options: self.config.temperature.map(|temperature| ModelOptions {
                temperature: Some(temperature),
            }),
        }
    }

    async fn send_request(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let request = self.create_request(prompt, system_prompt, stream);
        let url = format!("{}/api/chat", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Network {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn chat(&self, prompt: &str, system_prompt: Option<&str>) -> Result<String, LlmError> {
        let response = self.send_request(prompt, system_prompt, false).await?;

        let data: ChatResponse = response.json().await.map_err(|e| LlmError::InvalidResponse {
            message: format!("Failed to parse Ollama response: {}", e),
        })?;

        Ok(data.message.content)
    }

    async fn chat_stream(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<ChunkStream, LlmError> {
        let response = self.send_request(prompt, system_prompt, true).await?;

        // Ollama streams newline-delimited JSON objects, one per fragment,
        // ending with a `done: true` line.
        let mut buf = String::new();
        let mut finished = false;

        let chunks = response
            .bytes_stream()
            .map_err(|e| LlmError::Network {
                message: e.to_string(),
            })
            .map(move |bytes| -> Result<Vec<String>, LlmError> {
                let bytes = bytes?;
                let mut fragments = Vec::new();
                if finished {
                    return Ok(fragments);
                }

                buf.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(pos) = buf.find('\n') {
                    let line: String = buf.drain(..=pos).collect();
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let parsed: StreamChunk =
                        serde_json::from_str(line).map_err(|e| LlmError::InvalidResponse {
                            message: format!("Failed to parse Ollama stream chunk: {}", e),
                        })?;

                    let done = parsed.done;
                    if let Some(message) = parsed.message
                        && !message.content.is_empty()
                    {
                        fragments.push(message.content);
                    }
                    if done {
                        finished = true;
                        break;
                    }
                }

                Ok(fragments)
            })
            .map_ok(|fragments| stream::iter(fragments.into_iter().map(Ok::<_, LlmError>)))
            .try_flatten();

        Ok(Box::pin(chunks))
    }

    fn backend_name(&self) -> &str {
        "ollama"
    }
}
