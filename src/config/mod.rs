// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Configuration management for SnapKeeper

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::providers::Language;

/// Vision provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Openai,
    #[default]
    Dashscope,
    Ollama,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Openai => "openai",
            Self::Dashscope => "dashscope",
            Self::Ollama => "ollama",
        })
    }
}

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Which vision provider describes images
    #[serde(default)]
    pub provider: ProviderKind,

    /// Label language
    #[serde(default)]
    pub language: Language,

    /// Per-provider connection settings
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Extra attempts after a failed description request
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Replaces the built-in language prompt
    #[serde(default)]
    pub prompt_override: Option<String>,

    /// Naming and scanning rules
    #[serde(default)]
    pub rules: RuleConfig,

    /// Rename journal settings
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_openai")]
    pub openai: RemoteProviderConfig,
    #[serde(default = "default_dashscope")]
    pub dashscope: RemoteProviderConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// An OpenAI-compatible chat completions endpoint
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RemoteProviderConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuleConfig {
    #[serde(default = "default_max_label_chars")]
    pub max_label_chars: usize,
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    /// Longest image side sent to the provider; larger images are downscaled
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
    #[serde(default = "default_true")]
    pub recursive: bool,
    /// Only touch files whose names carry a screenshot date
    #[serde(default)]
    pub screenshots_only: bool,
    /// Leave files already named `YYYYMMDD-label.ext` alone
    #[serde(default = "default_true")]
    pub skip_renamed: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_history_path")]
    pub path: String,
}

// Default value functions
fn default_retries() -> u32 { 2 }
fn default_remote_timeout() -> u64 { 20 }
fn default_ollama_timeout() -> u64 { 120 }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_ollama_model() -> String { "moondream".to_string() }
fn default_max_label_chars() -> usize { 50 }
fn default_max_file_size_mb() -> u64 { 20 }
fn default_max_dimension() -> u32 { 1024 }
fn default_true() -> bool { true }
fn default_history_path() -> String { "snapkeeper_history.jsonl".to_string() }

fn default_openai() -> RemoteProviderConfig {
    RemoteProviderConfig {
        base_url: "https://api.openai.com/v1".to_string(),
        model: "gpt-4o-mini".to_string(),
        api_key_env: "OPENAI_API_KEY".to_string(),
        timeout_secs: default_remote_timeout(),
    }
}

fn default_dashscope() -> RemoteProviderConfig {
    RemoteProviderConfig {
        base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
        model: "qwen-vl-max".to_string(),
        api_key_env: "DASHSCOPE_API_KEY".to_string(),
        timeout_secs: default_remote_timeout(),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            language: Language::default(),
            providers: ProvidersConfig::default(),
            retries: default_retries(),
            prompt_override: None,
            rules: RuleConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: default_openai(),
            dashscope: default_dashscope(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_ollama_model(),
            timeout_secs: default_ollama_timeout(),
        }
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            max_label_chars: default_max_label_chars(),
            max_file_size_mb: default_max_file_size_mb(),
            max_dimension: default_max_dimension(),
            recursive: true,
            screenshots_only: false,
            skip_renamed: true,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_history_path(),
        }
    }
}

impl RemoteProviderConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> crate::Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(crate::SnapKeeperError::MissingApiKey(self.api_key_env.clone())),
        }
    }
}

impl RuleConfig {
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::SnapKeeperError::Config(format!("Failed to parse config: {}", e)))?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make every file fail
    pub fn validate(&self) -> crate::Result<()> {
        if self.rules.max_label_chars == 0 {
            return Err(crate::SnapKeeperError::Config(
                "rules.max_label_chars must be at least 1".to_string(),
            ));
        }
        if self.rules.max_dimension == 0 {
            return Err(crate::SnapKeeperError::Config(
                "rules.max_dimension must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
