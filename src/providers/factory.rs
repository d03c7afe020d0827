// Provider factory
// Creates the completion provider named by the configuration

use anyhow::{Context, Result};
use std::sync::Arc;

use super::{CompletionProvider, GenerationOptions, OllamaProvider, OpenAIProvider, RetryPolicy};
use crate::config::{Config, ProviderEntry};

/// Build the provider described by `config`
pub fn create_provider(config: &Config) -> Result<Arc<dyn CompletionProvider>> {
    create_provider_from_entry(
        &config.provider,
        &config.generation,
        config.request_timeout(),
        RetryPolicy::new(config.repair.request_retries),
    )
}

pub fn create_provider_from_entry(
    entry: &ProviderEntry,
    generation: &GenerationOptions,
    request_timeout: std::time::Duration,
    retry: RetryPolicy,
) -> Result<Arc<dyn CompletionProvider>> {
    tracing::debug!(
        provider = entry.provider_type(),
        model = entry.model(),
        url = entry.base_url(),
        "Creating completion provider"
    );

    let provider: Arc<dyn CompletionProvider> = match entry {
        ProviderEntry::Ollama { base_url, model } => Arc::new(
            OllamaProvider::new(base_url.clone(), model.clone(), request_timeout)
                .context("Failed to create Ollama provider")?
                .with_options(generation.clone())
                .with_retry_policy(retry),
        ),
        ProviderEntry::Openai {
            api_key,
            base_url: Some(url),
            model,
        } => Arc::new(
            OpenAIProvider::new_compatible(url.clone(), api_key.clone(), model.clone(), request_timeout)
                .context("Failed to create OpenAI-compatible provider")?
                .with_options(generation.clone())
                .with_retry_policy(retry),
        ),
        ProviderEntry::Openai {
            api_key,
            base_url: None,
            model,
        } => {
            let key = api_key.clone().context(
                "OpenAI provider requires an API key\n\n\
                 Set OPENAI_API_KEY or add api_key under [provider] in ~/.mender/config.toml",
            )?;
            Arc::new(
                OpenAIProvider::new_openai(key, request_timeout)
                    .context("Failed to create OpenAI provider")?
                    .with_model(model.clone())
                    .with_options(generation.clone())
                    .with_retry_policy(retry),
            )
        }
    };

    Ok(provider)
}
