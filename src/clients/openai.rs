pub mod models;

use crate::config::KeyFromEnv;
use crate::core::{ChatClient, ChatRequest, TextStream};
use crate::error::{AIError, OpenAIError};
use crate::streaming::text_deltas_from_sse;
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub base_url: String,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: DEFAULT_BASE_URL.to_string() }
    }

    /// Base URL from `OPENAI_BASE_URL`, or the public endpoint.
    pub fn with_env_base_url(mut self) -> Self {
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            if !url.trim().is_empty() {
                self.base_url = url.trim().trim_end_matches('/').to_string();
            }
        }
        self
    }
}

#[derive(Clone, Debug)]
pub struct OpenAIClient {
    config: OpenAIConfig,
    http: reqwest::Client,
}

impl KeyFromEnv for OpenAIClient {
    const KEY_NAME: &'static str = "OPENAI_API_KEY";
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> Self {
        info!(base_url = %config.base_url, "Creating new OpenAI client");
        Self { config, http: reqwest::Client::new() }
    }

    /// Client from a discovered key; `None` when no key is available.
    pub fn from_key(api_key: Option<String>) -> Option<Self> {
        api_key.map(|key| Self::new(OpenAIConfig::new(key).with_env_base_url()))
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url)
    }

    async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, AIError> {
        let resp = self.http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send().await
            .map_err(|e| {
                error!(error = %e, "HTTP request failed");
                AIError::OpenAI(OpenAIError::Http(e.to_string()))
            })?;

        debug!(status = %resp.status(), "Received response from OpenAI API");

        if resp.status() == 401 {
            error!("OpenAI API authentication failed");
            return Err(AIError::OpenAI(OpenAIError::Authentication));
        }
        if resp.status() == 429 {
            warn!("OpenAI API rate limit exceeded");
            return Err(AIError::OpenAI(OpenAIError::RateLimit));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let txt = resp.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %txt, "OpenAI API error");
            return Err(AIError::OpenAI(OpenAIError::Api(txt)));
        }
        Ok(resp)
    }
}

#[async_trait]
impl ChatClient for OpenAIClient {
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, mut request: ChatRequest) -> Result<String, AIError> {
        request.stream = false;
        let resp = self.send(&request).await?;

        #[derive(Deserialize)]
        struct Choices { choices: Vec<Choice> }
        #[derive(Deserialize)]
        struct Choice { message: Msg }
        #[derive(Deserialize)]
        struct Msg { content: Option<String> }

        let parsed: Choices = resp.json().await
            .map_err(|e| AIError::OpenAI(OpenAIError::Http(e.to_string())))?;
        let content = parsed.choices.into_iter().next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| AIError::OpenAI(OpenAIError::Api("No choices".into())))?;
        info!(response_len = content.len(), "Received completion");
        Ok(content)
    }

    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    async fn stream(&self, mut request: ChatRequest) -> Result<TextStream, AIError> {
        request.stream = true;
        let resp = self.send(&request).await?;
        info!("Streaming response started");

        let bytes = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| AIError::OpenAI(OpenAIError::Http(e.to_string()))));
        Ok(Box::pin(text_deltas_from_sse(Box::pin(bytes))))
    }
}
