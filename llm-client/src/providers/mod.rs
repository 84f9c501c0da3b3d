//! LLM provider implementations

pub mod mock;
mod openai_compatible;

pub use mock::MockProvider;
pub use openai_compatible::OpenAICompatibleProvider;

use std::str::FromStr;

use crate::config::{ModelPreset, ProviderConfig};
use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    DeepSeek,
    OpenRouter,
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "deepseek" => Ok(Self::DeepSeek),
            "openrouter" => Ok(Self::OpenRouter),
            _ => Err(LlmError::ConfigError(format!("Unknown provider: {}", s))),
        }
    }
}

impl ProviderKind {
    /// Environment variable holding this provider's API key
    pub fn env_var(&self) -> &'static str {
        match self {
            Self::DeepSeek => "DEEPSEEK_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DeepSeek => "DeepSeek",
            Self::OpenRouter => "OpenRouter",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Self::DeepSeek => "https://api.deepseek.com",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }
}

/// Create a provider instance from a preset and optional config
pub fn get_provider(
    preset: &ModelPreset,
    provider_config: Option<&ProviderConfig>,
) -> Result<Box<dyn LlmProvider>> {
    let kind: ProviderKind = preset.provider.parse()?;
    let api_key = get_api_key(provider_config, kind)?;
    let base_url = provider_config
        .and_then(|c| c.base_url.as_deref())
        .unwrap_or(kind.default_base_url());

    Ok(Box::new(OpenAICompatibleProvider::new(
        &preset.model,
        base_url,
        api_key,
        kind.display_name(),
    )))
}

/// Get API key from config or environment variable
fn get_api_key(config: Option<&ProviderConfig>, kind: ProviderKind) -> Result<String> {
    if let Some(key) = config.and_then(|c| c.api_key.clone()) {
        return Ok(key);
    }

    std::env::var(kind.env_var()).map_err(|_| LlmError::MissingApiKey {
        provider: kind.display_name().to_string(),
        env_var: kind.env_var().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("deepseek".parse::<ProviderKind>().unwrap(), ProviderKind::DeepSeek);
        assert_eq!("OpenRouter".parse::<ProviderKind>().unwrap(), ProviderKind::OpenRouter);
        assert!("cerebras".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_get_provider_uses_configured_key() {
        let preset = ModelPreset {
            provider: "deepseek".to_string(),
            model: "deepseek-chat".to_string(),
        };
        let provider_config = ProviderConfig {
            api_key: Some("sk-test".to_string()),
            base_url: Some("http://localhost:9999/".to_string()),
        };
        let provider = get_provider(&preset, Some(&provider_config)).unwrap();
        assert_eq!(provider.name(), "DeepSeek");
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let preset = ModelPreset {
            provider: "nope".to_string(),
            model: "x".to_string(),
        };
        assert!(matches!(
            get_provider(&preset, None),
            Err(LlmError::ConfigError(_))
        ));
    }
}
