// Provider entry - which completion backend to talk to

use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL};

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_ollama_model() -> String {
    DEFAULT_OLLAMA_MODEL.to_string()
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

/// A completion backend.
///
/// Serializes with a `type` tag, e.g.:
/// ```toml
/// [provider]
/// type = "ollama"
/// base_url = "http://localhost:11434"
/// model = "qwen2.5-coder:1.5b"
///
/// [provider]
/// type = "openai"
/// api_key = "sk-..."
/// base_url = "http://localhost:1234"   # optional, for LM Studio / vLLM
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderEntry {
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        #[serde(default = "default_ollama_model")]
        model: String,
    },
    Openai {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
        #[serde(default = "default_openai_model")]
        model: String,
    },
}

impl Default for ProviderEntry {
    fn default() -> Self {
        Self::Ollama {
            base_url: default_ollama_url(),
            model: default_ollama_model(),
        }
    }
}

impl ProviderEntry {
    /// Short provider-type tag ("ollama" or "openai").
    pub fn provider_type(&self) -> &'static str {
        match self {
            Self::Ollama { .. } => "ollama",
            Self::Openai { .. } => "openai",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Ollama { model, .. } | Self::Openai { model, .. } => model,
        }
    }

    pub fn set_model(&mut self, new_model: impl Into<String>) {
        match self {
            Self::Ollama { model, .. } | Self::Openai { model, .. } => *model = new_model.into(),
        }
    }

    /// Endpoint the provider will connect to
    pub fn base_url(&self) -> &str {
        match self {
            Self::Ollama { base_url, .. } => base_url,
            Self::Openai { base_url, .. } => base_url.as_deref().unwrap_or(DEFAULT_OPENAI_URL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        provider: ProviderEntry,
    }

    #[test]
    fn test_default_is_local_ollama() {
        let entry = ProviderEntry::default();
        assert_eq!(entry.provider_type(), "ollama");
        assert_eq!(entry.base_url(), "http://localhost:11434");
        assert_eq!(entry.model(), "qwen2.5-coder:1.5b");
    }

    #[test]
    fn test_ollama_fields_default_from_toml() {
        let w: Wrapper = toml::from_str("[provider]\ntype = \"ollama\"\n").unwrap();
        assert_eq!(w.provider, ProviderEntry::default());
    }

    #[test]
    fn test_openai_entry_from_toml() {
        let w: Wrapper = toml::from_str(
            "[provider]\ntype = \"openai\"\nbase_url = \"http://localhost:1234\"\nmodel = \"local-coder\"\n",
        )
        .unwrap();
        assert_eq!(w.provider.provider_type(), "openai");
        assert_eq!(w.provider.base_url(), "http://localhost:1234");
        assert_eq!(w.provider.model(), "local-coder");
    }

    #[test]
    fn test_openai_base_url_fallback() {
        let entry = ProviderEntry::Openai {
            api_key: Some("sk-test".into()),
            base_url: None,
            model: default_openai_model(),
        };
        assert_eq!(entry.base_url(), "https://api.openai.com");
    }

    #[test]
    fn test_set_model() {
        let mut entry = ProviderEntry::default();
        entry.set_model("codellama:7b");
        assert_eq!(entry.model(), "codellama:7b");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result: Result<Wrapper, _> = toml::from_str("[provider]\ntype = \"gemini\"\n");
        assert!(result.is_err());
    }
}
