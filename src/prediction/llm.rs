//! OpenAI-compatible chat and embedding clients.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-5";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-large";

/// Sampling parameters sent with every completion. `None` leaves the provider default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelSettings {
    pub temperature: Option<f32>,
}

impl ModelSettings {
    pub fn with_temperature(temperature: f32) -> Self {
        ModelSettings {
            temperature: Some(temperature),
        }
    }
}

/// A chat model bound to its sampling settings.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Authenticated HTTP access to an OpenAI-compatible API.
#[derive(Clone)]
pub struct OpenAiProvider {
    http: Client,
    base_url: String,
    api_key: String,
}

pub fn get_openai_provider(api_key: &str, base_url: Option<&str>) -> Result<OpenAiProvider> {
    let http = Client::builder()
        .timeout(Duration::from_secs(180))
        .build()
        .context("Failed to build HTTP client")?;
    Ok(OpenAiProvider {
        http,
        base_url: base_url
            .unwrap_or(DEFAULT_OPENAI_BASE_URL)
            .trim_end_matches('/')
            .to_string(),
        api_key: api_key.to_string(),
    })
}

impl OpenAiProvider {
    async fn post<B: Serialize + Sync, R: for<'de> Deserialize<'de> + Send>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("POST {}", url);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .context("OpenAI API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error {}: {}", status, body);
        }

        resp.json().await.context("Failed to parse OpenAI response")
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiChatModel {
    provider: OpenAiProvider,
    model: String,
    settings: ModelSettings,
}

impl OpenAiChatModel {
    pub fn new(model: &str, provider: OpenAiProvider, settings: ModelSettings) -> Self {
        OpenAiChatModel {
            provider,
            model: model.to_string(),
            settings,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.settings.temperature,
        };
        let response: ChatResponse = self.provider.post("chat/completions", &request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("OpenAI response contained no message")
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

pub struct OpenAiEmbeddingModel {
    provider: OpenAiProvider,
    model: String,
}

impl OpenAiEmbeddingModel {
    pub fn new(model: &str, provider: OpenAiProvider) -> Self {
        OpenAiEmbeddingModel {
            provider,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingModel for OpenAiEmbeddingModel {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(vec![]);
        }
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };
        let mut response: EmbeddingResponse = self.provider.post("embeddings", &request).await?;
        if response.data.len() != inputs.len() {
            anyhow::bail!(
                "Expected {} embeddings, got {}",
                inputs.len(),
                response.data.len()
            );
        }
        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
