// Configuration module
// Public interface for configuration loading

pub mod constants;
mod loader;
mod provider;
mod settings;

pub use loader::{config_dir, load_config, load_config_from, parse_config};
pub use provider::ProviderEntry;
pub use settings::{Config, ExecutorConfig, FeaturesConfig, RepairConfig};
