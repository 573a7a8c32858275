use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "deckedit";

pub const DEFAULT_WIDTH: u32 = 960;
pub const DEFAULT_HEIGHT: u32 = 540;
pub const DEFAULT_TEMPLATE: &str = "title";
pub const DEFAULT_RECONNECT_SECS: u64 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaboration: Option<CollaborationConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<HistoryConfig>,

    /// YAML file with additional slide templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub provider: AiProvider,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// API key for HTTP providers. If not set, falls back to the provider's
    /// environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl AiConfig {
    /// Resolve API key from config or environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var(AiProvider::OPENAI_KEY_VAR)
            .ok()
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AiProvider {
    #[default]
    Claude,
    Codex,
    Ollama,
    OpenAi,
}

impl AiProvider {
    pub const OPENAI_KEY_VAR: &'static str = "OPENAI_API_KEY";

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Claude => "Claude",
            Self::Codex => "Codex",
            Self::Ollama => "Ollama",
            Self::OpenAi => "OpenAI",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Claude => "Anthropic Claude via claude CLI",
            Self::Codex => "OpenAI Codex via codex CLI",
            Self::Ollama => "Local models via Ollama",
            Self::OpenAi => "OpenAI chat completions API",
        }
    }

    /// Executable behind a CLI provider. HTTP providers have none.
    pub fn binary_name(&self) -> Option<&'static str> {
        match self {
            Self::Claude => Some("claude"),
            Self::Codex => Some("codex"),
            Self::Ollama => Some("ollama"),
            Self::OpenAi => None,
        }
    }

    pub fn default_model(&self) -> Option<&'static str> {
        match self {
            Self::Claude => Some("sonnet"),
            Self::Codex | Self::Ollama | Self::OpenAi => None,
        }
    }

    pub fn all() -> &'static [AiProvider] {
        &[
            AiProvider::Claude,
            AiProvider::Codex,
            AiProvider::Ollama,
            AiProvider::OpenAi,
        ]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "claude" => Some(Self::Claude),
            "codex" => Some(Self::Codex),
            "ollama" => Some(Self::Ollama),
            "open-ai" | "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollaborationConfig {
    /// WebSocket URL of the relay server, e.g. `ws://localhost:8080/ws`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    /// TrueType/OpenType file used for all text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `deckedit config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default configuration: {e}");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# deckedit configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn default_template(&self) -> &str {
        self.defaults
            .as_ref()
            .and_then(|d| d.template.as_deref())
            .unwrap_or(DEFAULT_TEMPLATE)
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        let defaults = self.defaults.as_ref();
        (
            defaults.and_then(|d| d.width).unwrap_or(DEFAULT_WIDTH),
            defaults.and_then(|d| d.height).unwrap_or(DEFAULT_HEIGHT),
        )
    }

    pub fn server(&self) -> Option<&str> {
        self.collaboration.as_ref().and_then(|c| c.server.as_deref())
    }

    pub fn reconnect_delay(&self) -> std::time::Duration {
        let secs = self
            .collaboration
            .as_ref()
            .and_then(|c| c.reconnect_secs)
            .unwrap_or(DEFAULT_RECONNECT_SECS);
        std::time::Duration::from_secs(secs)
    }

    pub fn font_path(&self) -> Option<&Path> {
        self.render.as_ref().and_then(|r| r.font.as_deref())
    }

    pub fn history_limit(&self) -> Option<usize> {
        self.history.as_ref().and_then(|h| h.limit)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "defaults.template" => {
                let catalog = crate::templates::TemplateCatalog::builtin();
                if catalog.get(value).is_none() && self.templates.is_none() {
                    let ids: Vec<&str> = catalog.ids().collect();
                    anyhow::bail!("Unknown template: {value}. Built-in templates: {}", ids.join(", "));
                }
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .template = Some(value.to_string());
            }
            "defaults.width" | "defaults.height" => {
                let pixels: u32 = value
                    .parse()
                    .ok()
                    .filter(|v| (16..=8192).contains(v))
                    .ok_or_else(|| {
                        anyhow::anyhow!("Invalid size: {value}. Must be a number between 16 and 8192.")
                    })?;
                let defaults = self.defaults.get_or_insert_with(DefaultsConfig::default);
                if key == "defaults.width" {
                    defaults.width = Some(pixels);
                } else {
                    defaults.height = Some(pixels);
                }
            }
            "ai.provider" => {
                let provider = AiProvider::from_name(value).ok_or_else(|| {
                    anyhow::anyhow!(
                        "Invalid provider: {value}. Must be 'claude', 'codex', 'ollama', or 'open-ai'."
                    )
                })?;
                match &mut self.ai {
                    Some(ai) => ai.provider = provider,
                    None => {
                        self.ai = Some(AiConfig {
                            provider,
                            model: None,
                            api_key: None,
                        })
                    }
                }
            }
            "ai.model" => {
                let ai = self.ai.get_or_insert_with(|| AiConfig {
                    provider: AiProvider::default(),
                    model: None,
                    api_key: None,
                });
                ai.model = Some(value.to_string());
            }
            "collaboration.server" => {
                if !value.starts_with("ws://") && !value.starts_with("wss://") {
                    anyhow::bail!("Invalid server: {value}. Must be a ws:// or wss:// URL.");
                }
                self.collaboration
                    .get_or_insert_with(CollaborationConfig::default)
                    .server = Some(value.to_string());
            }
            "collaboration.reconnect_secs" => {
                let secs: u64 = value.parse().map_err(|_| {
                    anyhow::anyhow!("Invalid reconnect_secs: {value}. Must be a whole number of seconds.")
                })?;
                self.collaboration
                    .get_or_insert_with(CollaborationConfig::default)
                    .reconnect_secs = Some(secs);
            }
            "render.font" => {
                let path = PathBuf::from(value);
                if !path.exists() {
                    anyhow::bail!("Font file not found: {value}");
                }
                self.render.get_or_insert_with(RenderConfig::default).font = Some(path);
            }
            "history.limit" => {
                let limit: usize = value
                    .parse()
                    .ok()
                    .filter(|v| *v > 0)
                    .ok_or_else(|| anyhow::anyhow!("Invalid history limit: {value}. Must be a positive number."))?;
                self.history.get_or_insert_with(HistoryConfig::default).limit = Some(limit);
            }
            _ => anyhow::bail!(
                "Unknown config key: {key}. Valid keys: defaults.template, defaults.width, defaults.height, ai.provider, ai.model, collaboration.server, collaboration.reconnect_secs, render.font, history.limit"
            ),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::default();
        assert_eq!(config.default_template(), "title");
        assert_eq!(config.canvas_size(), (960, 540));
        assert_eq!(config.reconnect_delay().as_secs(), 5);
        assert!(config.server().is_none());
    }

    #[test]
    fn test_set_validates_values() {
        let mut config = Config::default();
        config.set("defaults.width", "1280").unwrap();
        config.set("ai.provider", "open-ai").unwrap();
        config.set("collaboration.server", "ws://localhost:9000/ws").unwrap();
        config.set("history.limit", "50").unwrap();

        assert_eq!(config.canvas_size(), (1280, 540));
        assert_eq!(config.ai.as_ref().unwrap().provider, AiProvider::OpenAi);
        assert_eq!(config.server(), Some("ws://localhost:9000/ws"));
        assert_eq!(config.history_limit(), Some(50));

        assert!(config.set("defaults.width", "0").is_err());
        assert!(config.set("defaults.template", "nope").is_err());
        assert!(config.set("collaboration.server", "http://x").is_err());
        assert!(config.set("ai.provider", "gpt").is_err());
        assert!(config.set("history.limit", "0").is_err());
        assert!(config.set("theme", "dark").is_err());
    }

    #[test]
    fn test_yaml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = Config::default();
        config.set("defaults.template", "content").unwrap();
        config.set("collaboration.reconnect_secs", "2").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_template(), "content");
        assert_eq!(loaded.reconnect_delay().as_secs(), 2);
    }

    #[test]
    fn test_provider_yaml_names() {
        let ai: AiConfig = serde_yaml::from_str("provider: open-ai\nmodel: gpt-4o").unwrap();
        assert_eq!(ai.provider, AiProvider::OpenAi);
        assert_eq!(ai.model.as_deref(), Some("gpt-4o"));
    }
}
