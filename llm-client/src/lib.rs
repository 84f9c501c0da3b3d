//! LLM client library for the subalign workspace
//!
//! Provides one interface over chat-completion providers:
//! - DeepSeek (default, OpenAI-compatible API)
//! - OpenRouter (OpenAI-compatible API)
//! - Mock (tests)

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;

pub use config::{Config, ModelPreset, ProviderConfig};
pub use error::{LlmError, Result};
pub use provider::{LlmProvider, LlmRequest, LlmResponse, TokenUsage};
pub use providers::{MockProvider, ProviderKind, get_provider};
