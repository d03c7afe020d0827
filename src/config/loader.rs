// Configuration loader
// Loads ~/.mender/config.toml, then applies environment overrides

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{CONFIG_DIR_NAME, DEFAULT_OPENAI_MODEL};
use super::provider::ProviderEntry;
use super::settings::{Config, ExecutorConfig, FeaturesConfig, RepairConfig};
use crate::providers::GenerationOptions;

/// ~/.mender
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Load configuration from ~/.mender/config.toml (defaults when absent)
pub fn load_config() -> Result<Config> {
    let dir = config_dir()?;
    load_config_from(&dir.join("config.toml"), &dir, |key| std::env::var(key).ok())
}

/// Load configuration from `path`, falling back to defaults rooted at
/// `config_dir` when the file does not exist. `env` looks up overrides.
pub fn load_config_from<E>(path: &Path, config_dir: &Path, env: E) -> Result<Config>
where
    E: Fn(&str) -> Option<String>,
{
    let file_exists = path.exists();

    let mut config = if file_exists {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        parse_config(&contents, config_dir)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    } else {
        tracing::debug!("No config file at {}, using defaults", path.display());
        Config::new(config_dir.to_path_buf())
    };

    apply_env_overrides(&mut config, file_exists, env);

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

/// Parse the TOML text of a config file
pub fn parse_config(contents: &str, config_dir: &Path) -> Result<Config> {
    #[derive(serde::Deserialize)]
    struct TomlConfig {
        #[serde(default)]
        provider: Option<ProviderEntry>,
        #[serde(default)]
        generation: Option<GenerationOptions>,
        #[serde(default)]
        executor: Option<ExecutorConfig>,
        #[serde(default)]
        repair: Option<RepairConfig>,
        #[serde(default)]
        features: Option<FeaturesConfig>,
        #[serde(default)]
        metrics_dir: Option<PathBuf>,
    }

    let toml_config: TomlConfig = toml::from_str(contents).context("Invalid TOML in config")?;

    let mut config = Config::new(config_dir.to_path_buf());
    if let Some(provider) = toml_config.provider {
        config.provider = provider;
    }
    if let Some(generation) = toml_config.generation {
        config.generation = generation;
    }
    if let Some(executor) = toml_config.executor {
        config.executor = executor;
    }
    if let Some(repair) = toml_config.repair {
        config.repair = repair;
    }
    if let Some(features) = toml_config.features {
        config.features = features;
    }
    if let Some(metrics_dir) = toml_config.metrics_dir {
        config.metrics_dir = metrics_dir;
    }

    Ok(config)
}

/// MENDER_MODEL, OLLAMA_HOST and OPENAI_API_KEY.
///
/// OPENAI_API_KEY only switches providers when there is no config file;
/// with a file it fills in a missing key on an openai entry.
fn apply_env_overrides<E>(config: &mut Config, file_exists: bool, env: E)
where
    E: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty("OPENAI_API_KEY") {
        match &mut config.provider {
            ProviderEntry::Openai { api_key, .. } if api_key.is_none() => {
                *api_key = Some(key);
            }
            ProviderEntry::Ollama { .. } if !file_exists => {
                tracing::debug!("OPENAI_API_KEY set and no config file, using OpenAI");
                config.provider = ProviderEntry::Openai {
                    api_key: Some(key),
                    base_url: None,
                    model: DEFAULT_OPENAI_MODEL.to_string(),
                };
            }
            _ => {}
        }
    }

    if let Some(host) = non_empty("OLLAMA_HOST") {
        if let ProviderEntry::Ollama { base_url, .. } = &mut config.provider {
            // `ollama serve` accepts a bare host:port here
            *base_url = if host.starts_with("http://") || host.starts_with("https://") {
                host
            } else {
                format!("http://{}", host)
            };
        }
    }

    if let Some(model) = non_empty("MENDER_MODEL") {
        config.provider.set_model(model);
    }
}
