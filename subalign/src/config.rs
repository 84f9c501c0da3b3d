//! subalign configuration: translation settings and alignment run options.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const DEFAULT_CHUNK_SIZE: usize = 80;
const DEFAULT_FULL_PASS_THRESHOLD: usize = 120;
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_EXAMPLES: usize = 3;
const DEFAULT_LOW_SCORE_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubalignConfig {
    /// llm-client preset used for translation. None uses the llm-client
    /// default for this program.
    #[serde(default)]
    pub translation_preset: Option<String>,

    /// Cues per request when translating in parts
    #[serde(default = "default_chunk_size")]
    pub translation_chunk_size: usize,

    /// Documents with at most this many cues are translated in one request
    #[serde(default = "default_full_pass_threshold")]
    pub full_pass_threshold: usize,

    #[serde(default = "default_temperature")]
    pub translation_temperature: f32,

    /// Mandarin SRT paired with `example_target` to prime the translator
    #[serde(default)]
    pub example_source: Option<PathBuf>,

    /// Cantonese SRT paired with `example_source`
    #[serde(default)]
    pub example_target: Option<PathBuf>,

    /// Cue pairs taken from the example files
    #[serde(default = "default_max_examples")]
    pub max_examples: usize,

    /// Align cues on a thread pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Cues scoring below this are reported as weak matches
    #[serde(default = "default_low_score_threshold")]
    pub low_score_threshold: f64,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_full_pass_threshold() -> usize {
    DEFAULT_FULL_PASS_THRESHOLD
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_examples() -> usize {
    DEFAULT_MAX_EXAMPLES
}

fn default_parallel() -> bool {
    true
}

fn default_low_score_threshold() -> f64 {
    DEFAULT_LOW_SCORE_THRESHOLD
}

impl Default for SubalignConfig {
    fn default() -> Self {
        Self {
            translation_preset: None,
            translation_chunk_size: default_chunk_size(),
            full_pass_threshold: default_full_pass_threshold(),
            translation_temperature: default_temperature(),
            example_source: None,
            example_target: None,
            max_examples: default_max_examples(),
            parallel: default_parallel(),
            low_score_threshold: default_low_score_threshold(),
        }
    }
}

impl SubalignConfig {
    /// Get the config file path: ~/.config/cli-programs/subalign.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("subalign.toml"))
    }

    /// Load config from file, returning default if file doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: SubalignConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Both example files, when both are configured.
    pub fn example_pair(&self) -> Option<(PathBuf, PathBuf)> {
        match (&self.example_source, &self.example_target) {
            (Some(src), Some(tgt)) => Some((src.clone(), tgt.clone())),
            _ => None,
        }
    }
}
