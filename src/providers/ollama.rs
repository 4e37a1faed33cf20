// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Ollama client for local vision models

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::{classify_send_error, prompt_for, Describer, Language};
use crate::image_prep::PreparedImage;
use crate::{Result, SnapKeeperError};

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    prompt_override: Option<String>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    images: Vec<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Deserialize)]
struct ModelInfo {
    name: String,
}

/// Strip API paths people tend to paste into the URL setting
fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/')
        .replace("/api/generate", "")
        .replace("/api/chat", "")
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            model: model.to_string(),
            prompt_override: None,
        })
    }

    pub fn with_prompt_override(mut self, prompt: Option<String>) -> Self {
        self.prompt_override = prompt;
        self
    }

    /// List installed models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_send_error("ollama", e))?;

        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Whether the configured model is installed
    pub async fn model_available(&self) -> Result<bool> {
        let models = self.list_models().await?;
        Ok(model_matches(&models, &self.model))
    }
}

fn model_matches(installed: &[String], model: &str) -> bool {
    installed.iter().any(|m| m == model || m.starts_with(&format!("{}:", model)))
}

#[async_trait]
impl Describer for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                SnapKeeperError::Provider(format!(
                    "Cannot connect to Ollama at {}: {}",
                    self.base_url, e
                ))
            })?;

        match self.model_available().await {
            Ok(true) => debug!("Vision model '{}' available", self.model),
            Ok(false) => warn!("Vision model '{}' not installed. Try: ollama pull {}", self.model, self.model),
            Err(e) => warn!("Could not list Ollama models: {}", e),
        }

        Ok(())
    }

    async fn describe(&self, image: &PreparedImage, language: Language) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt: prompt_for(language, self.prompt_override.as_deref()),
            stream: false,
            images: vec![image.base64.as_str()],
        };

        debug!("Sending vision request to Ollama: model={}", self.model);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_send_error("ollama", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SnapKeeperError::Rejected {
                provider: "ollama".to_string(),
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let result: GenerateResponse = response.json().await?;
        Ok(result.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_normalization() {
        assert_eq!(normalize_base_url("http://localhost:11434/"), "http://localhost:11434");
        assert_eq!(
            normalize_base_url("http://localhost:11434/api/generate"),
            "http://localhost:11434"
        );
    }

    #[test]
    fn test_model_matching() {
        let installed = vec!["moondream:latest".to_string(), "llava:13b".to_string()];
        assert!(model_matches(&installed, "moondream"));
        assert!(model_matches(&installed, "llava:13b"));
        assert!(!model_matches(&installed, "llava:7b"));
        assert!(!model_matches(&installed, "moon"));
    }

    #[test]
    fn test_request_carries_image() {
        let request = GenerateRequest {
            model: "moondream",
            prompt: Language::Jp.prompt(),
            stream: false,
            images: vec!["aGk="],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["images"][0], "aGk=");
        assert_eq!(json["stream"], false);
    }
}
