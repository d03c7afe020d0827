// Project-wide constants
//
// Import via `use crate::config::constants::*;`.

/// Interpreter used to run scripts when none is configured.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Wall-clock limit for a single script run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Prefix for scratch files written by the executor.
pub const SCRATCH_PREFIX: &str = "mender-";

/// Fix attempts per repair before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Upper bound accepted by config validation.
pub const MAX_ATTEMPTS_LIMIT: u32 = 20;

/// Default Ollama endpoint (what `ollama serve` binds to).
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Small code model that runs on a laptop CPU.
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5-coder:1.5b";

/// Base URL used for the OpenAI-compatible provider when none is given.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Per-request HTTP timeout for completion calls. Local models can be slow.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Directory under $HOME holding config.toml and metrics/.
pub const CONFIG_DIR_NAME: &str = ".mender";
