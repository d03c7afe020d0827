// Mender - run a Python script, repair it with a local model when it fails
// Library exports

pub mod agent;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod prompts;
pub mod providers;
pub mod repair;
pub mod workspace;
