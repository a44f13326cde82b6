pub mod agent;
pub mod backends;
pub mod cli;
pub mod config;
pub mod memory;
pub mod permissions;
pub mod server;
pub mod tool_executor;
pub mod tools;

pub use agent::{AgentSession, TurnEvent, TurnRequest};
pub use backends::{LlmBackend, LlmError, LlmService, MockBackend, OllamaBackend, OllamaConfig};
pub use config::AppConfig;
pub use memory::{Conversation, MemoryStore, Message, Role, StorageError};
pub use permissions::PermissionSet;
pub use tool_executor::{ToolExecutor, ToolOutcome};
pub use tools::{AppLauncherTool, Tool, ToolRegistry};
