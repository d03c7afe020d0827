// Error classifier - turns captured stderr into a structured record
//
// Structured exceptions don't survive the process boundary, so this is a text
// heuristic: the last "Kind: message" line wins, and the first "line N" found
// anywhere supplies the location.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind reported for empty stderr
pub const NO_ERROR: &str = "NoError";

/// Kind reported when no line looks like an error marker
pub const UNKNOWN: &str = "Unknown";

/// Substrings that mark a classification line
const ERROR_MARKERS: [&str; 3] = ["Error", "Exception", "Warning"];

/// Traceback lines kept when quoting stderr back to the model
const TRACEBACK_TAIL_LINES: usize = 10;

static LINE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bline\s+(\d+)").expect("line-number pattern is valid"));

/// Structured view of a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// e.g. "NameError", "ZeroDivisionError", "Unknown"
    pub kind: String,
    pub message: String,
    /// First "line N" mentioned anywhere in the text
    pub source_line: Option<u32>,
}

impl ErrorRecord {
    pub fn no_error() -> Self {
        Self {
            kind: NO_ERROR.to_string(),
            message: String::new(),
            source_line: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind != NO_ERROR
    }

    pub fn is_unknown(&self) -> bool {
        self.kind == UNKNOWN
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)?;
        } else {
            write!(f, "{}: {}", self.kind, self.message)?;
        }
        if let Some(line) = self.source_line {
            write!(f, " (line {})", line)?;
        }
        Ok(())
    }
}

/// Classify captured stderr. Pure and deterministic.
pub fn classify(stderr: &str) -> ErrorRecord {
    if stderr.is_empty() {
        return ErrorRecord::no_error();
    }

    let (kind, message) = match find_classification_line(stderr) {
        Some(line) => split_marker_line(line),
        None => (UNKNOWN.to_string(), stderr.to_string()),
    };

    ErrorRecord {
        kind,
        message,
        source_line: find_source_line(stderr),
    }
}

/// Last line (scanning backward) with a colon and an error marker
fn find_classification_line(text: &str) -> Option<&str> {
    text.lines()
        .rev()
        .find(|line| line.contains(':') && ERROR_MARKERS.iter().any(|m| line.contains(m)))
}

fn split_marker_line(line: &str) -> (String, String) {
    match line.split_once(':') {
        Some((kind, message)) => (kind.trim().to_string(), message.trim().to_string()),
        None => (line.trim().to_string(), String::new()),
    }
}

/// First "line N" in forward order. May point at an outer frame rather than
/// the frame that raised.
fn find_source_line(text: &str) -> Option<u32> {
    text.lines().find_map(|line| {
        LINE_NUMBER
            .captures_iter(line)
            .find_map(|caps| caps.get(1).and_then(|m| m.as_str().parse().ok()))
    })
}

/// Keep only the tail of a long traceback (the most relevant frames).
pub fn trim_traceback(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let start = lines.len().saturating_sub(TRACEBACK_TAIL_LINES);
    lines[start..].join("\n")
}
