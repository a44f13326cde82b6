use super::Tool;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::process::Stdio;
use tokio::process::Command;
use tracing::info;

/// Launches a desktop application by name. Fire-and-forget: the launch
/// attempt is reported, the child process is not supervised.
pub struct AppLauncherTool;

#[async_trait]
impl Tool for AppLauncherTool {
    fn name(&self) -> &'static str {
        "app_launcher"
    }

    fn description(&self) -> &'static str {
        "Launch desktop applications"
    }

    async fn execute(&self, params: &Value) -> Result<Value> {
        let app_name = params
            .get("app_name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("app_name parameter is required"))?;

        let args: Vec<String> = params
            .get("args")
            .and_then(|v| v.as_array())
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        let child = Command::new(app_name)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to launch {}", app_name))?;

        info!(app = app_name, pid = child.id(), "launched application");

        Ok(json!({
            "status": "success",
            "message": format!("Launched {}", app_name),
            "pid": child.id(),
        }))
    }
}
