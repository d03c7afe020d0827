// Shared provider types: errors and generation options

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure talking to a completion backend.
///
/// The repair loop treats every variant as fatal for the current run; the
/// only retrying happens inside the provider, for transient variants.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Failed to create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Could not reach {provider} at {url}: {source}")]
    Transport {
        provider: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} request failed\n\nStatus: {status}\nBody: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Failed to parse {provider} response: {message}")]
    Decode { provider: String, message: String },

    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: String },

    #[error("Model '{model}' is not available on {provider}. Try: ollama pull {model}")]
    ModelMissing { provider: String, model: String },
}

impl ProviderError {
    /// Worth another try: connection trouble, rate limiting, server errors
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport { .. } => true,
            ProviderError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Sampling options sent with every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Low by default for more deterministic code
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Upper bound on generated tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_top_p() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    2048
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let status = |code| ProviderError::Status {
            provider: "ollama".into(),
            status: code,
            body: String::new(),
        };
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(401).is_transient());
        assert!(!status(404).is_transient());
        assert!(!ProviderError::EmptyResponse {
            provider: "ollama".into()
        }
        .is_transient());
    }

    #[test]
    fn test_generation_defaults_from_empty_toml() {
        let options: GenerationOptions = toml::from_str("").unwrap();
        assert_eq!(options, GenerationOptions::default());
        assert!((options.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(options.max_tokens, 2048);
    }
}
