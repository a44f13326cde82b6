use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5252,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Which generation backend to use: "ollama" or "mock".
    pub kind: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: "ollama".to_string(),
            model: None,
            base_url: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let config = if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save()?;
            config
        };

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content).context("Failed to write config file")
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to resolve config directory")?;
        Ok(config_dir.join("lyra").join("config.toml"))
    }

    /// Where conversations live when no explicit path is configured.
    pub fn storage_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir().context("Failed to resolve data directory")?;
        Ok(data_dir.join("lyra").join("conversations.json"))
    }

    /// Update a single dotted setting, e.g. `backend.model`.
    pub fn update_setting(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server.host" => self.server.host = value.to_string(),
            "server.port" => {
                self.server.port = value.parse().context("Port must be a number")?;
            }
            "backend.kind" => match value {
                "ollama" | "mock" => self.backend.kind = value.to_string(),
                _ => bail!("Unknown backend kind '{}' (expected ollama or mock)", value),
            },
            "backend.model" => self.backend.model = Some(value.to_string()),
            "backend.base_url" => self.backend.base_url = Some(value.to_string()),
            "backend.temperature" => {
                self.backend.temperature =
                    Some(value.parse().context("Temperature must be a number")?);
            }
            "storage.path" => self.storage.path = Some(PathBuf::from(value)),
            _ => bail!("Unknown setting '{}'", key),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_serve_on_localhost() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5252);
        assert_eq!(config.backend.kind, "ollama");
    }

    #[test]
    fn update_setting_round_trips_through_toml() {
        let mut config = AppConfig::default();
        config.update_setting("backend.model", "llama3").unwrap();
        config.update_setting("server.port", "8080").unwrap();

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();

        assert_eq!(parsed.backend.model.as_deref(), Some("llama3"));
        assert_eq!(parsed.server.port, 8080);
    }

    #[test]
    fn update_setting_rejects_unknown_keys() {
        let mut config = AppConfig::default();

        assert!(config.update_setting("nope.nope", "x").is_err());
        assert!(config.update_setting("backend.kind", "skynet").is_err());
        assert!(config.update_setting("server.port", "not-a-port").is_err());
    }
}
