// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Vision providers that turn an image into a short label

pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::warn;

use crate::config::{AppConfig, ProviderKind};
use crate::image_prep::PreparedImage;
use crate::{Result, SnapKeeperError};

pub use ollama::OllamaClient;
pub use openai::OpenAiCompatibleClient;

/// Output language of the label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Language {
    ZhHans,
    ZhHant,
    #[default]
    En,
    Jp,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZhHans => "zh-hans",
            Self::ZhHant => "zh-hant",
            Self::En => "en",
            Self::Jp => "jp",
        }
    }

    /// Built-in description prompt
    pub fn prompt(self) -> &'static str {
        match self {
            Self::ZhHans => "请用简洁中文描述这张图片的主要内容，不要超过10个字",
            Self::ZhHant => "請用簡潔繁體中文描述這張圖片的主要內容，不要超過10個字",
            Self::En => "Describe the main content of this image in brief English within 10 words",
            Self::Jp => "画像の主要内容を10字以内の簡潔な日本語で説明してください",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can describe an image in a few words
#[async_trait]
pub trait Describer: Send + Sync {
    /// Provider name for logs and history
    fn name(&self) -> &'static str;

    /// Describe an image; the reply is raw model text
    async fn describe(&self, image: &PreparedImage, language: Language) -> Result<String>;

    /// Cheap reachability check run before a batch starts
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Prompt for a language, honouring a configured override
pub(crate) fn prompt_for(language: Language, prompt_override: Option<&str>) -> &str {
    prompt_override.unwrap_or_else(|| language.prompt())
}

/// Map a send failure, keeping timeouts distinguishable
pub(crate) fn classify_send_error(provider: &str, err: reqwest::Error) -> SnapKeeperError {
    if err.is_timeout() {
        SnapKeeperError::Timeout(format!("{} did not answer in time", provider))
    } else {
        SnapKeeperError::Http(err)
    }
}

/// Describe with bounded exponential backoff (1s, 2s, 4s, ...)
pub async fn describe_with_retry(
    describer: &dyn Describer,
    image: &PreparedImage,
    language: Language,
    retries: u32,
) -> Result<String> {
    describe_with_backoff(describer, image, language, retries, Duration::from_secs(1)).await
}

async fn describe_with_backoff(
    describer: &dyn Describer,
    image: &PreparedImage,
    language: Language,
    retries: u32,
    base_delay: Duration,
) -> Result<String> {
    let mut attempt = 0;

    loop {
        match describer.describe(image, language).await {
            Ok(text) => return Ok(text),
            Err(e) if attempt < retries && e.is_transient() => {
                let delay = base_delay * 2u32.saturating_pow(attempt);
                attempt += 1;
                warn!(
                    "{} request failed ({}), retrying in {:?} (attempt {})",
                    describer.name(),
                    e,
                    delay,
                    attempt + 1
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Reduce a model reply to the label text
///
/// Keeps the first non-empty line, drops a short `Prefix:` and keeps only
/// letters, digits, `-`, `_` and whitespace. A colon with digits in front of
/// it (a clock time, a ratio) is part of the description, not a prefix.
pub fn clean_label(raw: &str) -> String {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");

    let mut text = line;
    if let Some((idx, colon)) = text.char_indices().find(|(_, c)| *c == ':' || *c == '：') {
        let head = &text[..idx];
        if idx < 30 && !head.chars().any(char::is_numeric) {
            text = &text[idx + colon.len_utf8()..];
        }
    }

    text.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Build the describer for a provider
///
/// Remote providers need their API key up front, so a missing key fails
/// here, before any file is touched.
pub fn build_describer(
    config: &AppConfig,
    kind: ProviderKind,
    model_override: Option<&str>,
) -> Result<Box<dyn Describer>> {
    let describer: Box<dyn Describer> = match kind {
        ProviderKind::Openai | ProviderKind::Dashscope => {
            let (name, settings) = if kind == ProviderKind::Openai {
                ("openai", &config.providers.openai)
            } else {
                ("dashscope", &config.providers.dashscope)
            };
            let api_key = settings.api_key()?;
            let mut client = OpenAiCompatibleClient::new(name, settings, api_key)?
                .with_prompt_override(config.prompt_override.clone());
            if let Some(model) = model_override {
                client = client.with_model(model);
            }
            Box::new(client)
        }
        ProviderKind::Ollama => {
            let settings = &config.providers.ollama;
            let model = model_override.unwrap_or(&settings.model);
            let client = OllamaClient::new(&settings.url, model, Duration::from_secs(settings.timeout_secs))?
                .with_prompt_override(config.prompt_override.clone());
            Box::new(client)
        }
    };

    Ok(describer)
}
