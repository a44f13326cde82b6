use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub mod app_launcher;

pub use app_launcher::AppLauncherTool;

/// A named, side-effecting capability the assistant may invoke. Whether it
/// is allowed to run is the gateway's concern, not the tool's.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Execute with a mapping of named parameters, producing a structured
    /// result. Errors here surface to callers as tool execution failures.
    async fn execute(&self, params: &Value) -> Result<Value>;
}

/// Tools keyed by name. Registering an existing name replaces the
/// implementation.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<(&'static str, &'static str)> {
        let mut tools: Vec<_> = self
            .tools
            .values()
            .map(|tool| (tool.name(), tool.description()))
            .collect();
        tools.sort_by_key(|(name, _)| *name);
        tools
    }
}
