//! # LLM provider clients
//!
//! Bridges the core [`LlmClient`] trait to real HTTP APIs:
//! - `anthropic`: the Messages API (`/v1/messages`)
//! - `openai`: Chat Completions (`/chat/completions`) on any compatible base
//!   URL, which covers OpenAI itself, OpenRouter and a local Ollama
//! - `gemini`: Google's `generateContent`
//!
//! Provider and model come from the YAML `llm` section, overridden by the
//! `LLM_PROVIDER` and `LLM_MODEL` environment variables. API keys are only
//! ever read from the environment.

use async_trait::async_trait;
use codebase_tutor_core::contract::{LlmClient, LlmError};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_MAX_TOKENS: u32 = 8192;
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Gemini,
}

impl Provider {
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-sonnet-4-20250514",
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Gemini => "gemini-2.5-pro",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    pub fn api_key_env(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" | "openrouter" | "ollama" => Ok(Provider::OpenAi),
            "gemini" | "google" => Ok(Provider::Gemini),
            other => Err(format!(
                "unknown LLM provider {other:?} (expected anthropic, openai or gemini)"
            )),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::Gemini => "gemini",
        })
    }
}

/// Fully resolved connection settings for one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl LlmSettings {
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            api_key_env: provider.api_key_env().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
        }
    }

    /// An OpenAI-compatible server other than api.openai.com may not need a key.
    fn key_optional(&self) -> bool {
        self.provider == Provider::OpenAi && self.base_url != Provider::OpenAi.default_base_url()
    }
}

/// HTTP client for the configured provider.
pub struct ProviderClient {
    http: Client,
    settings: LlmSettings,
    api_key: Option<String>,
}

impl ProviderClient {
    pub fn from_settings(settings: LlmSettings) -> Result<Self, LlmError> {
        let api_key = match std::env::var(&settings.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Some(key),
            _ if settings.key_optional() => {
                warn!(
                    env = %settings.api_key_env,
                    base_url = %settings.base_url,
                    "No API key set, calling OpenAI-compatible server without authentication"
                );
                None
            }
            _ => {
                error!(env = %settings.api_key_env, "LLM API key missing in environment");
                return Err(LlmError::MissingApiKey(settings.api_key_env.clone()));
            }
        };
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        info!(
            provider = %settings.provider,
            model = %settings.model,
            base_url = %settings.base_url,
            "Initialised LLM client"
        );
        Ok(Self {
            http,
            settings,
            api_key,
        })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, LlmError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(provider = %self.settings.provider, "LLM provider rate limit hit");
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            error!(status = %status, body = %body, "LLM API returned an error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "Failed to decode LLM response");
            LlmError::Parse(e.to_string())
        })
    }

    async fn complete_anthropic(&self, prompt: &str) -> Result<String, LlmError> {
        let body = AnthropicRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
        };
        let mut request = self
            .http
            .post(self.url("v1/messages"))
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        let response: AnthropicResponse = self.send(request).await?;
        Ok(response.text())
    }

    async fn complete_openai(&self, prompt: &str) -> Result<String, LlmError> {
        let body = OpenAiRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };
        let mut request = self.http.post(self.url("chat/completions")).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response: OpenAiResponse = self.send(request).await?;
        Ok(response.text())
    }

    async fn complete_gemini(&self, prompt: &str) -> Result<String, LlmError> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            },
        };
        let path = format!("models/{}:generateContent", self.settings.model);
        let mut request = self.http.post(self.url(&path)).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("x-goog-api-key", key);
        }
        let response: GeminiResponse = self.send(request).await?;
        Ok(response.text())
    }
}

#[async_trait]
impl LlmClient for ProviderClient {
    async fn complete(&self, prompt: &str, _use_cache: bool) -> Result<String, LlmError> {
        debug!(
            provider = %self.settings.provider,
            model = %self.settings.model,
            prompt_len = prompt.len(),
            "Sending completion request"
        );
        let text = match self.settings.provider {
            Provider::Anthropic => self.complete_anthropic(prompt).await?,
            Provider::OpenAi => self.complete_openai(prompt).await?,
            Provider::Gemini => self.complete_gemini(prompt).await?,
        };
        if text.trim().is_empty() {
            error!(provider = %self.settings.provider, "LLM returned no text");
            return Err(LlmError::Empty);
        }
        debug!(response_len = text.len(), "Received completion");
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicResponse {
    fn text(self) -> String {
        self.content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text)
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiResponse {
    fn text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

impl GeminiResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default()
    }
}
