// Command-line arguments

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mender")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a Python script, and when it fails, ask a local model for a fix that actually runs")]
#[command(after_help = "Examples:
  mender --fix script.py          # Fix errors in a file
  mender --analyze script.py      # Analyze code quality
  mender --create \"web scraper\"   # Create new code
  mender --interactive            # Start interactive mode
  mender --code \"print(x)\"        # Debug inline code")]
pub struct Cli {
    /// Fix errors in a Python file
    #[arg(short, long, value_name = "FILE", group = "mode")]
    pub fix: Option<PathBuf>,

    /// Analyze a Python file for issues
    #[arg(short, long, value_name = "FILE", group = "mode")]
    pub analyze: Option<PathBuf>,

    /// Create new Python code from a description
    #[arg(short, long, value_name = "DESCRIPTION", group = "mode")]
    pub create: Option<String>,

    /// Debug inline Python code
    #[arg(long, value_name = "CODE", group = "mode")]
    pub code: Option<String>,

    /// Start interactive mode
    #[arg(short, long, group = "mode")]
    pub interactive: bool,

    /// Model to use (overrides config and MENDER_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Apply fixes without asking
    #[arg(long)]
    pub auto_apply: bool,

    /// Where to save code made with --create
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Fix attempts before giving up
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Seconds a script may run before it is killed
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Debug logging to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// What the invocation asks for
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Fix(PathBuf),
    Analyze(PathBuf),
    Create(String),
    Inline(String),
    Interactive,
    /// No mode flag: print help, then go interactive
    Default,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if let Some(path) = &self.fix {
            Mode::Fix(path.clone())
        } else if let Some(path) = &self.analyze {
            Mode::Analyze(path.clone())
        } else if let Some(description) = &self.create {
            Mode::Create(description.clone())
        } else if let Some(code) = &self.code {
            Mode::Inline(code.clone())
        } else if self.interactive {
            Mode::Interactive
        } else {
            Mode::Default
        }
    }

    /// Apply flag overrides on top of the loaded configuration
    pub fn apply_to(&self, config: &mut crate::config::Config) {
        if let Some(model) = &self.model {
            config.provider.set_model(model.clone());
        }
        if self.auto_apply {
            config.features.auto_apply = true;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.repair.max_attempts = max_attempts;
        }
        if let Some(timeout) = self.timeout {
            config.executor.timeout_seconds = timeout;
        }
        if self.verbose {
            config.features.debug_logging = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fix_mode_with_short_flag() {
        let cli = Cli::parse_from(["mender", "-f", "script.py", "--auto-apply"]);
        assert_eq!(cli.mode(), Mode::Fix(PathBuf::from("script.py")));
        assert!(cli.auto_apply);
    }

    #[test]
    fn test_no_flags_is_default_mode() {
        let cli = Cli::parse_from(["mender"]);
        assert_eq!(cli.mode(), Mode::Default);
    }

    #[test]
    fn test_modes_are_exclusive() {
        let result = Cli::try_parse_from(["mender", "--fix", "a.py", "--analyze", "b.py"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let cli = Cli::parse_from([
            "mender",
            "--code",
            "print(x)",
            "-m",
            "codellama:7b",
            "--max-attempts",
            "5",
            "--timeout",
            "2",
        ]);
        let mut config = Config::new(PathBuf::from("/tmp/mender-test"));
        cli.apply_to(&mut config);

        assert_eq!(cli.mode(), Mode::Inline("print(x)".into()));
        assert_eq!(config.provider.model(), "codellama:7b");
        assert_eq!(config.repair.max_attempts, 5);
        assert_eq!(config.executor.timeout_seconds, 2);
        assert!(!config.features.auto_apply);
    }
}
