// Interactive command parsing

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Fix(PathBuf),
    Analyze(PathBuf),
    Create(String),
    Explain(PathBuf),
    List(PathBuf),
    Stats,
    Help,
    Quit,
}

/// Why a line could not be turned into a command
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Empty,
    MissingArgument(&'static str),
    Unknown(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "empty command"),
            ParseError::MissingArgument(usage) => write!(f, "usage: {}", usage),
            ParseError::Unknown(word) => write!(f, "unknown command '{}' (type 'help')", word),
        }
    }
}

impl Command {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseError::Empty);
        }

        let (word, rest) = match input.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (input, ""),
        };

        let arg = |usage: &'static str| {
            if rest.is_empty() {
                Err(ParseError::MissingArgument(usage))
            } else {
                Ok(rest)
            }
        };

        match word.to_ascii_lowercase().as_str() {
            "fix" => Ok(Command::Fix(PathBuf::from(arg("fix <file>")?))),
            "analyze" | "analyse" => Ok(Command::Analyze(PathBuf::from(arg("analyze <file>")?))),
            "create" => Ok(Command::Create(arg("create <description>")?.to_string())),
            "explain" => Ok(Command::Explain(PathBuf::from(arg("explain <file>")?))),
            "ls" => Ok(Command::List(PathBuf::from(if rest.is_empty() { "." } else { rest }))),
            "stats" => Ok(Command::Stats),
            "help" | "?" => Ok(Command::Help),
            "exit" | "quit" | "q" => Ok(Command::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

pub fn format_help() -> String {
    r#"Commands:
  fix <file>       - Fix errors in a file
  analyze <file>   - Analyze code quality
  create <desc>    - Create new code
  explain <file>   - Run a file and explain its error
  ls [dir]         - List Python files
  stats            - Show today's repair statistics
  help             - Show this help
  exit             - Exit (also: quit, q)"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_commands() {
        assert_eq!(Command::parse("fix app.py"), Ok(Command::Fix("app.py".into())));
        assert_eq!(
            Command::parse("  ANALYZE   src/main.py "),
            Ok(Command::Analyze("src/main.py".into()))
        );
        assert_eq!(
            Command::parse("explain broken.py"),
            Ok(Command::Explain("broken.py".into()))
        );
    }

    #[test]
    fn test_create_keeps_whole_description() {
        assert_eq!(
            Command::parse("create a csv to json converter"),
            Ok(Command::Create("a csv to json converter".into()))
        );
    }

    #[test]
    fn test_ls_defaults_to_current_dir() {
        assert_eq!(Command::parse("ls"), Ok(Command::List(".".into())));
        assert_eq!(Command::parse("ls tests"), Ok(Command::List("tests".into())));
    }

    #[test]
    fn test_quit_aliases() {
        for word in ["exit", "quit", "q", "Q"] {
            assert_eq!(Command::parse(word), Ok(Command::Quit));
        }
    }

    #[test]
    fn test_errors() {
        assert_eq!(Command::parse("   "), Err(ParseError::Empty));
        assert_eq!(
            Command::parse("fix"),
            Err(ParseError::MissingArgument("fix <file>"))
        );
        assert!(matches!(Command::parse("frobnicate x"), Err(ParseError::Unknown(w)) if w == "frobnicate"));
    }
}
