use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{LlmError, Result};

/// Shared LLM configuration (`~/.config/cli-programs/llm.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Preset used when a program has no default of its own
    #[serde(default = "default_preset")]
    pub default_preset: String,

    /// Per-program default presets (program name -> preset name)
    #[serde(default)]
    pub defaults: HashMap<String, String>,

    #[serde(default)]
    pub presets: HashMap<String, ModelPreset>,

    /// Provider-specific overrides
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_preset() -> String {
    "deepseek".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPreset {
    /// Provider identifier (deepseek, openrouter)
    pub provider: String,

    pub model: String,
}

/// Provider-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (optional, the provider's env var is used otherwise)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Custom base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    /// Read `llm.toml`; built-in presets when the file does not exist.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        let home =
            std::env::var("HOME").map_err(|_| LlmError::ConfigError("HOME not set".into()))?;
        Ok(PathBuf::from(home).join(".config/cli-programs/llm.toml"))
    }

    pub fn get_preset(&self, name: &str) -> Result<&ModelPreset> {
        self.presets
            .get(name)
            .ok_or_else(|| LlmError::InvalidPreset(name.to_string()))
    }

    /// Default preset name for a program, falling back to `default_preset`.
    pub fn get_default_for_program(&self, program: &str) -> &str {
        self.defaults
            .get(program)
            .map(String::as_str)
            .unwrap_or(&self.default_preset)
    }

    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.providers.get(provider)
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut presets = HashMap::new();

        presets.insert(
            "deepseek".to_string(),
            ModelPreset {
                provider: "deepseek".to_string(),
                model: "deepseek-chat".to_string(),
            },
        );
        presets.insert(
            "openrouter-deepseek".to_string(),
            ModelPreset {
                provider: "openrouter".to_string(),
                model: "deepseek/deepseek-chat".to_string(),
            },
        );

        Self {
            default_preset: default_preset(),
            defaults: HashMap::new(),
            presets,
            providers: HashMap::new(),
        }
    }
}
