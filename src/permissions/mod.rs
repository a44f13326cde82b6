use std::collections::HashMap;
use tokio::sync::RwLock;

/// Per-tool authorization flags, denied by default and never persisted:
/// every tool starts denied on each launch. An explicit context object
/// rather than process globals, so gateways stay testable in isolation.
///
/// One lock guards the whole map, which makes grant/revoke/check
/// linearizable per tool name.
#[derive(Default)]
pub struct PermissionSet {
    granted: RwLock<HashMap<String, bool>>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a tool name, (re)setting it to denied.
    pub async fn register_denied(&self, name: &str) {
        self.granted.write().await.insert(name.to_string(), false);
    }

    /// No-op for unregistered names.
    pub async fn grant(&self, name: &str) {
        if let Some(flag) = self.granted.write().await.get_mut(name) {
            *flag = true;
        }
    }

    /// No-op for unregistered names.
    pub async fn revoke(&self, name: &str) {
        if let Some(flag) = self.granted.write().await.get_mut(name) {
            *flag = false;
        }
    }

    pub async fn is_granted(&self, name: &str) -> bool {
        self.granted.read().await.get(name).copied().unwrap_or(false)
    }
}
