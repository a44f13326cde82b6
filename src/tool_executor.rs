use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::permissions::PermissionSet;
use crate::tools::{Tool, ToolRegistry};

/// Outcome of a gated tool invocation. Always data, never a raised fault:
/// callers render these without exception-handling paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    UnknownTool { name: String },
    PermissionDenied { name: String },
    Completed { name: String, result: Value },
    ExecutionError { name: String, message: String },
}

/// The permission gateway: a tool registry plus per-tool authorization
/// flags. Permission is checked strictly before invocation; a denied tool
/// never runs, even transiently.
pub struct ToolExecutor {
    registry: RwLock<ToolRegistry>,
    permissions: PermissionSet,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(ToolRegistry::new()),
            permissions: PermissionSet::new(),
        }
    }

    /// Register a tool under its name, denied by default. Re-registering an
    /// existing name replaces the implementation and resets the permission
    /// to denied: registration is re-initialization.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        self.registry.write().await.register(tool);
        self.permissions.register_denied(name).await;
    }

    pub async fn grant(&self, name: &str) {
        self.permissions.grant(name).await;
    }

    pub async fn revoke(&self, name: &str) {
        self.permissions.revoke(name).await;
    }

    pub async fn list_tools(&self) -> Vec<(&'static str, &'static str)> {
        self.registry.read().await.list()
    }

    pub async fn execute(&self, name: &str, params: &Value) -> ToolOutcome {
        let tool = match self.registry.read().await.get(name) {
            Some(tool) => tool,
            None => {
                return ToolOutcome::UnknownTool {
                    name: name.to_string(),
                };
            }
        };

        if !self.permissions.is_granted(name).await {
            debug!(tool = name, "tool execution denied");
            return ToolOutcome::PermissionDenied {
                name: name.to_string(),
            };
        }

        match tool.execute(params).await {
            Ok(result) => ToolOutcome::Completed {
                name: name.to_string(),
                result,
            },
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                ToolOutcome::ExecutionError {
                    name: name.to_string(),
                    message: e.to_string(),
                }
            }
        }
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Echo parameters back"
        }

        async fn execute(&self, params: &Value) -> anyhow::Result<Value> {
            Ok(json!({"echoed": params}))
        }
    }

    struct PanickyTool;

    #[async_trait]
    impl Tool for PanickyTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Always fails"
        }

        async fn execute(&self, _params: &Value) -> anyhow::Result<Value> {
            Err(anyhow!("tool blew up"))
        }
    }

    async fn executor_with_echo() -> ToolExecutor {
        let executor = ToolExecutor::new();
        executor.register(Arc::new(EchoTool)).await;
        executor
    }

    #[tokio::test]
    async fn unknown_tool_is_a_structured_outcome() {
        let executor = ToolExecutor::new();

        let outcome = executor.execute("nonexistent", &json!({})).await;

        assert_eq!(
            outcome,
            ToolOutcome::UnknownTool {
                name: "nonexistent".to_string()
            }
        );
    }

    #[tokio::test]
    async fn freshly_registered_tool_is_denied() {
        let executor = executor_with_echo().await;

        let outcome = executor.execute("echo", &json!({})).await;

        assert_eq!(
            outcome,
            ToolOutcome::PermissionDenied {
                name: "echo".to_string()
            }
        );
    }

    #[tokio::test]
    async fn grant_then_execute_succeeds() {
        let executor = executor_with_echo().await;
        executor.grant("echo").await;

        let outcome = executor.execute("echo", &json!({"k": "v"})).await;

        assert_eq!(
            outcome,
            ToolOutcome::Completed {
                name: "echo".to_string(),
                result: json!({"echoed": {"k": "v"}}),
            }
        );
    }

    #[tokio::test]
    async fn revoke_then_execute_is_denied() {
        let executor = executor_with_echo().await;
        executor.grant("echo").await;
        executor.revoke("echo").await;

        let outcome = executor.execute("echo", &json!({})).await;

        assert_eq!(
            outcome,
            ToolOutcome::PermissionDenied {
                name: "echo".to_string()
            }
        );
    }

    #[tokio::test]
    async fn tool_failure_becomes_execution_error() {
        let executor = ToolExecutor::new();
        executor.register(Arc::new(PanickyTool)).await;
        executor.grant("echo").await;

        let outcome = executor.execute("echo", &json!({})).await;

        assert_eq!(
            outcome,
            ToolOutcome::ExecutionError {
                name: "echo".to_string(),
                message: "tool blew up".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn re_registration_overwrites_and_resets_permission() {
        let executor = executor_with_echo().await;
        executor.grant("echo").await;

        executor.register(Arc::new(PanickyTool)).await;

        let outcome = executor.execute("echo", &json!({})).await;
        assert_eq!(
            outcome,
            ToolOutcome::PermissionDenied {
                name: "echo".to_string()
            }
        );
    }

    #[tokio::test]
    async fn outcome_serializes_with_status_tag() {
        let outcome = ToolOutcome::PermissionDenied {
            name: "app_launcher".to_string(),
        };

        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(
            json,
            json!({"status": "permission_denied", "name": "app_launcher"})
        );
    }
}
