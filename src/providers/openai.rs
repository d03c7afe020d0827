// OpenAI-compatible provider
//
// Works with api.openai.com and anything that speaks the same chat
// completions format (LM Studio, vLLM, llama.cpp server, Groq, ...).

use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use super::retry::{with_retry, RetryPolicy};
use super::types::{GenerationOptions, ProviderError};
use super::CompletionProvider;
use crate::config::constants::{DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL};

/// System prompt sent ahead of every request
const SYSTEM_PROMPT: &str = "You are an expert Python developer. \
Answer with working code in a single ```python fenced block unless asked otherwise.";

/// OpenAI-compatible chat completions provider
#[derive(Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    provider_name: String,
    options: GenerationOptions,
    retry: RetryPolicy,
}

impl OpenAIProvider {
    /// Create a provider for api.openai.com
    pub fn new_openai(api_key: String, request_timeout: Duration) -> Result<Self, ProviderError> {
        Self::new(
            Some(api_key),
            DEFAULT_OPENAI_URL,
            DEFAULT_OPENAI_MODEL,
            "openai",
            request_timeout,
        )
    }

    /// Create a provider for a self-hosted OpenAI-compatible server (key optional)
    pub fn new_compatible(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Self::new(api_key, base_url, model, "openai-compatible", request_timeout)
    }

    fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        provider_name: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            provider_name: provider_name.into(),
            options: GenerationOptions::default(),
            retry: RetryPolicy::default(),
        })
    }

    /// Set custom model for this provider
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn to_openai_request(&self, prompt: &str, stream: bool) -> OpenAIRequest {
        OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            max_tokens: Some(self.options.max_tokens),
            temperature: Some(self.options.temperature),
            top_p: Some(self.options.top_p),
            stream,
        }
    }

    fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(url)
            .header("content-type", "application/json");
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    fn transport(&self, url: &str, source: reqwest::Error) -> ProviderError {
        ProviderError::Transport {
            provider: self.provider_name.clone(),
            url: url.to_string(),
            source,
        }
    }

    fn empty_response(&self) -> ProviderError {
        ProviderError::EmptyResponse {
            provider: self.provider_name.clone(),
        }
    }

    fn decode(&self, message: impl Into<String>) -> ProviderError {
        ProviderError::Decode {
            provider: self.provider_name.clone(),
            message: message.into(),
        }
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Status {
            provider: self.provider_name.clone(),
            status: status.as_u16(),
            body,
        })
    }

    /// Send a single message request (no retry)
    async fn complete_once(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = self.to_openai_request(prompt, false);

        tracing::debug!(model = %self.model, "Sending request to {}", self.provider_name);

        let response = self
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport(&url, e))?;
        let response = self.check_status(response).await?;

        let parsed: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| self.decode(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(self.empty_response());
        }

        Ok(text)
    }

    /// Send a message with streaming response (no retry)
    async fn complete_stream_once(
        &self,
        prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String, ProviderError>>, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let request = self.to_openai_request(prompt, true);

        tracing::debug!("Sending streaming request to {}", self.provider_name);

        let response = self
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport(&url, e))?;
        let response = self.check_status(response).await?;

        let (tx, rx) = mpsc::channel(100);
        let provider = self.clone();

        // Spawn task to parse SSE stream
        tokio::spawn(async move {
            tracing::debug!("[STREAM] {} streaming task started", provider.provider_name);
            let mut stream = response.bytes_stream();
            let mut buffer = Vec::new();
            let mut sent_any = false;

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);

                        // Parse line by line
                        while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                            let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                            let line = String::from_utf8_lossy(&line_bytes);

                            // SSE format: "data: {...}\n"
                            let Some(json_str) = line.strip_prefix("data: ") else {
                                continue;
                            };
                            let json_str = json_str.trim();

                            if json_str == "[DONE]" {
                                tracing::debug!("[STREAM] Received [DONE]");
                                if !sent_any {
                                    let _ = tx.send(Err(provider.empty_response())).await;
                                }
                                return;
                            }

                            match serde_json::from_str::<OpenAIStreamChunk>(json_str) {
                                Ok(chunk) => {
                                    let delta = chunk
                                        .choices
                                        .into_iter()
                                        .next()
                                        .and_then(|choice| choice.delta.content);
                                    if let Some(content) = delta.filter(|c| !c.is_empty()) {
                                        sent_any = true;
                                        if tx.send(Ok(content)).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                                Err(e) => {
                                    let _ = tx.send(Err(provider.decode(e.to_string()))).await;
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Stream error: {}", e);
                        let _ = tx.send(Err(provider.transport(&url, e))).await;
                        return;
                    }
                }
            }

            if !sent_any {
                let _ = tx.send(Err(provider.empty_response())).await;
            }
            tracing::debug!("[STREAM] {} streaming task finished", provider.provider_name);
        });

        Ok(rx)
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        with_retry(self.retry, || self.complete_once(prompt)).await
    }

    async fn complete_stream(
        &self,
        prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String, ProviderError>>, ProviderError> {
        with_retry(self.retry, || self.complete_stream_once(prompt)).await
    }

    async fn check_available(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/v1/models", self.base_url);
        let mut builder = self.client.get(&url);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder.send().await.map_err(|e| self.transport(&url, e))?;
        let response = self.check_status(response).await?;
        let models: ModelList = response
            .json()
            .await
            .map_err(|e| self.decode(e.to_string()))?;

        Ok(models.data.iter().any(|m| m.id == self.model))
    }

    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// OpenAI API types

#[derive(Debug, Clone, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "is_false")]
    stream: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIStreamChunk {
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIStreamChoice {
    delta: OpenAIDelta,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelEntry {
    id: String,
}
