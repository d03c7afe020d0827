// Completion backends
//
// The repair loop only needs "prompt in, text out". This module provides that
// seam as a trait, plus implementations for a local Ollama server and any
// OpenAI-compatible chat endpoint.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, Receiver};

pub mod factory;
pub mod ollama;
pub mod openai;
pub mod retry;
pub mod types;

pub use factory::create_provider;
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use retry::{with_retry, RetryPolicy};
pub use types::{GenerationOptions, ProviderError};

/// Text-completion service
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send a prompt and wait for the complete response text
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Send a prompt and stream text deltas as they arrive.
    ///
    /// The channel closes when the response is complete. Providers without
    /// native streaming deliver the whole response as a single delta.
    async fn complete_stream(
        &self,
        prompt: &str,
    ) -> Result<Receiver<Result<String, ProviderError>>, ProviderError> {
        let text = self.complete(prompt).await?;
        let (tx, rx) = mpsc::channel(1);
        // Capacity 1 and a fresh receiver: this send cannot block.
        let _ = tx.send(Ok(text)).await;
        Ok(rx)
    }

    /// Whether the configured model can be served. Default: assume yes.
    async fn check_available(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }

    /// Provider name for logging (e.g. "ollama")
    fn name(&self) -> &str;

    /// Model this provider sends requests to
    fn model(&self) -> &str;
}

/// Drain a stream into the full response text, passing each delta to `on_delta`.
pub async fn collect_stream<F>(
    mut rx: Receiver<Result<String, ProviderError>>,
    mut on_delta: F,
) -> Result<String, ProviderError>
where
    F: FnMut(&str),
{
    let mut full = String::new();
    while let Some(chunk) = rx.recv().await {
        let delta = chunk?;
        on_delta(&delta);
        full.push_str(&delta);
    }
    Ok(full)
}
