// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! OpenAI-compatible chat completions client (OpenAI, DashScope)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{classify_send_error, prompt_for, Describer, Language};
use crate::config::RemoteProviderConfig;
use crate::image_prep::PreparedImage;
use crate::{Result, SnapKeeperError};

/// Client for any `/chat/completions` endpoint that accepts image parts
pub struct OpenAiCompatibleClient {
    client: Client,
    name: &'static str,
    base_url: String,
    api_key: String,
    model: String,
    prompt_override: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiCompatibleClient {
    pub fn new(name: &'static str, settings: &RemoteProviderConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            name,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
            prompt_override: None,
        })
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_prompt_override(mut self, prompt: Option<String>) -> Self {
        self.prompt_override = prompt;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(&'a self, image: &PreparedImage, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: image.data_url() },
                    },
                ],
            }],
        }
    }
}

/// Pull the first choice's text out of a completions body
fn parse_response(provider: &str, body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
        SnapKeeperError::Provider(format!("{} sent an unexpected response: {}", provider, e))
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| SnapKeeperError::Provider(format!("{} returned no description", provider)))
}

#[async_trait]
impl Describer for OpenAiCompatibleClient {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn describe(&self, image: &PreparedImage, language: Language) -> Result<String> {
        let prompt = prompt_for(language, self.prompt_override.as_deref());
        let request = self.build_request(image, prompt);

        debug!("Sending vision request to {}: model={}", self.name, self.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_send_error(self.name, e))?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SnapKeeperError::Rejected {
                provider: self.name.to_string(),
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        parse_response(self.name, &body)
    }
}
