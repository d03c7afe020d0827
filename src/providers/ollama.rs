// Ollama provider - local models served by `ollama serve`
//
// Uses the native /api/generate endpoint (single prompt, no chat history) and
// /api/tags to check whether the model has been pulled.

use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use super::retry::{with_retry, RetryPolicy};
use super::types::{GenerationOptions, ProviderError};
use super::CompletionProvider;

const PROVIDER_NAME: &str = "ollama";

/// Client for a local (or remote) Ollama server
#[derive(Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
    options: GenerationOptions,
    retry: RetryPolicy,
}

impl OllamaProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            options: GenerationOptions::default(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the models the server has pulled
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), body));
        }

        let tags: TagsResponse = response.json().await.map_err(|e| decode(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn generate_request(&self, prompt: &str, stream: bool) -> GenerateRequest<'_> {
        GenerateRequest {
            model: &self.model,
            prompt: prompt.to_string(),
            stream,
            options: OllamaOptions {
                temperature: self.options.temperature,
                top_p: self.options.top_p,
                num_predict: self.options.max_tokens,
            },
        }
    }

    /// Ollama answers 404 on /api/generate when the model was never pulled
    fn generate_error(&self, status: u16, body: String) -> ProviderError {
        if status == 404 && body.contains("not found") {
            ProviderError::ModelMissing {
                provider: PROVIDER_NAME.to_string(),
                model: self.model.clone(),
            }
        } else {
            status_error(status, body)
        }
    }

    /// Send a single non-streaming request (no retry)
    async fn complete_once(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = self.generate_request(prompt, false);

        tracing::debug!(model = %self.model, "Sending generate request to Ollama");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.generate_error(status.as_u16(), body));
        }

        let generated: GenerateResponse =
            response.json().await.map_err(|e| decode(e.to_string()))?;

        if let Some(message) = generated.error {
            return Err(decode(message));
        }

        if generated.response.trim().is_empty() {
            return Err(empty_response());
        }

        tracing::debug!(chars = generated.response.len(), "Received Ollama response");
        Ok(generated.response)
    }

    /// Send a streaming request (no retry). Ollama streams NDJSON: one
    /// `{"response": "...", "done": false}` object per line.
    async fn complete_stream_once(
        &self,
        prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String, ProviderError>>, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = self.generate_request(prompt, true);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|source| transport(&url, source))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.generate_error(status.as_u16(), body));
        }

        let (tx, rx) = mpsc::channel(100);

        tokio::spawn(async move {
            tracing::debug!("[STREAM] Ollama streaming task started");
            let mut stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            // A stream that finishes without any text is reported like a blank reply
            let mut sent_any = false;

            while let Some(chunk) = stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);

                        while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                            let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                            let line = String::from_utf8_lossy(&line_bytes);
                            match parse_stream_line(&line) {
                                StreamLine::Skip => {}
                                StreamLine::Delta(text) if text.is_empty() => {}
                                StreamLine::Delta(text) => {
                                    sent_any = true;
                                    if tx.send(Ok(text)).await.is_err() {
                                        return;
                                    }
                                }
                                StreamLine::Done(text) => {
                                    if !text.is_empty() {
                                        sent_any = true;
                                        let _ = tx.send(Ok(text)).await;
                                    }
                                    if !sent_any {
                                        let _ = tx.send(Err(empty_response())).await;
                                    }
                                    tracing::debug!("[STREAM] Ollama reported done");
                                    return;
                                }
                                StreamLine::Failed(e) => {
                                    let _ = tx.send(Err(e)).await;
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Stream error: {}", e);
                        let _ = tx.send(Err(transport(&url, e))).await;
                        return;
                    }
                }
            }

            // Server closed without a trailing newline
            let rest = String::from_utf8_lossy(&buffer).into_owned();
            match parse_stream_line(&rest) {
                StreamLine::Delta(text) | StreamLine::Done(text) if !text.is_empty() => {
                    let _ = tx.send(Ok(text)).await;
                }
                StreamLine::Failed(e) => {
                    let _ = tx.send(Err(e)).await;
                }
                _ if !sent_any => {
                    let _ = tx.send(Err(empty_response())).await;
                }
                _ => {}
            }

            tracing::debug!("[STREAM] Ollama streaming task finished");
        });

        Ok(rx)
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
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
        let models = self.list_models().await?;
        let available = model_is_listed(&self.model, &models);
        if !available {
            tracing::warn!(
                model = %self.model,
                installed = %models.join(", "),
                "Model not found on Ollama server"
            );
        }
        Ok(available)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Ollama lists untagged models with an implicit ":latest"
fn model_is_listed(model: &str, installed: &[String]) -> bool {
    installed
        .iter()
        .any(|name| name == model || (!model.contains(':') && *name == format!("{}:latest", model)))
}

enum StreamLine {
    Skip,
    Delta(String),
    Done(String),
    Failed(ProviderError),
}

fn parse_stream_line(line: &str) -> StreamLine {
    let line = line.trim();
    if line.is_empty() {
        return StreamLine::Skip;
    }

    match serde_json::from_str::<GenerateResponse>(line) {
        Ok(GenerateResponse {
            error: Some(message),
            ..
        }) => StreamLine::Failed(decode(message)),
        Ok(chunk) if chunk.done => StreamLine::Done(chunk.response),
        Ok(chunk) => StreamLine::Delta(chunk.response),
        Err(e) => StreamLine::Failed(decode(e.to_string())),
    }
}

fn transport(url: &str, source: reqwest::Error) -> ProviderError {
    ProviderError::Transport {
        provider: PROVIDER_NAME.to_string(),
        url: url.to_string(),
        source,
    }
}

fn status_error(status: u16, body: String) -> ProviderError {
    ProviderError::Status {
        provider: PROVIDER_NAME.to_string(),
        status,
        body,
    }
}

fn empty_response() -> ProviderError {
    ProviderError::EmptyResponse {
        provider: PROVIDER_NAME.to_string(),
    }
}

fn decode(message: String) -> ProviderError {
    ProviderError::Decode {
        provider: PROVIDER_NAME.to_string(),
        message,
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}
