use anyhow::{Result, bail};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use lyra::backends::{LlmBackend, LlmService, MockBackend, OllamaBackend, OllamaConfig};
use lyra::cli::{Cli, Commands, ConfigAction};
use lyra::config::AppConfig;
use lyra::memory::MemoryStore;
use lyra::server::{AppState, serve};
use lyra::tool_executor::ToolExecutor;
use lyra::tools::AppLauncherTool;
use lyra::{AgentSession, TurnRequest};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let backend_kind = cli.backend.clone().unwrap_or_else(|| config.backend.kind.clone());

    match cli.command {
        Commands::Serve {
            host,
            port,
            allow_tools,
        } => {
            handle_serve(&config, &backend_kind, host, port, allow_tools).await?;
        }
        Commands::Chat {
            message,
            system,
            conversation,
        } => {
            handle_chat(&config, &backend_kind, message, system, conversation).await?;
        }
        Commands::Config { action } => {
            handle_config(action)?;
        }
    }

    Ok(())
}

fn create_backend(kind: &str, config: &AppConfig) -> Result<Box<dyn LlmBackend>> {
    match kind {
        "ollama" => {
            let defaults = OllamaConfig::default();
            let backend = OllamaBackend::new(OllamaConfig {
                model: config.backend.model.clone().unwrap_or(defaults.model),
                base_url: config.backend.base_url.clone().unwrap_or(defaults.base_url),
                temperature: config.backend.temperature,
            })?;
            Ok(Box::new(backend))
        }
        "mock" => Ok(Box::new(MockBackend::new())),
        other => bail!("Unknown backend '{}' (expected ollama or mock)", other),
    }
}

async fn build_state(config: &AppConfig, backend_kind: &str) -> Result<AppState> {
    let store = Arc::new(MemoryStore::open(config.storage_path()?)?);
    let llm = Arc::new(LlmService::new(create_backend(backend_kind, config)?));

    let tools = Arc::new(ToolExecutor::new());
    tools.register(Arc::new(AppLauncherTool)).await;

    let session = Arc::new(AgentSession::new(store.clone(), llm, tools));
    Ok(AppState { session, store })
}

async fn handle_serve(
    config: &AppConfig,
    backend_kind: &str,
    host: Option<String>,
    port: Option<u16>,
    allow_tools: Vec<String>,
) -> Result<()> {
    let state = build_state(config, backend_kind).await?;

    for name in &allow_tools {
        state.session.tools().grant(name).await;
        tracing::info!(tool = %name, "tool permission granted for this run");
    }

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}:{}: {}", host, port, e))?;

    serve(state, addr).await
}

async fn handle_chat(
    config: &AppConfig,
    backend_kind: &str,
    message: String,
    system: Option<String>,
    conversation: Option<String>,
) -> Result<()> {
    let state = build_state(config, backend_kind).await?;
    let conversation_id = state.store.create(conversation).await?;

    let reply = state
        .session
        .submit(&TurnRequest {
            conversation_id: conversation_id.clone(),
            prompt: message,
            system_prompt: system,
        })
        .await?;

    println!("{}", reply);
    tracing::debug!(conversation = %conversation_id, "chat turn recorded");
    Ok(())
}

fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = AppConfig::load()?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = AppConfig::load()?;
            config.update_setting(&key, &value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }
    }

    Ok(())
}
