// Console rendering
//
// Formatting lives in functions that return Strings so it can be tested; the
// print_* helpers just write them out.

use crossterm::style::Stylize;
use std::io::{self, BufRead, Write};

use crate::classifier::ErrorRecord;
use crate::executor::ExecutionResult;
use crate::metrics::MetricsSummary;
use crate::repair::{RepairEvent, RepairFailure, RepairOutcome};

const RULE_WIDTH: usize = 60;

pub fn banner() -> String {
    format!(
        "{}\n{}\n",
        format!("mender {}", env!("CARGO_PKG_VERSION")).cyan().bold(),
        "Runs your Python, and fixes it when it breaks".dark_grey()
    )
}

fn rule() -> String {
    "─".repeat(RULE_WIDTH).dark_grey().to_string()
}

/// Code with a title bar and right-aligned line numbers
pub fn code_panel(title: &str, code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let width = lines.len().to_string().len().max(3);

    let mut output = format!("{} {}\n{}\n", "▸".cyan().bold(), title.bold(), rule());
    for (i, line) in lines.iter().enumerate() {
        output.push_str(&format!(
            "{} │ {}\n",
            format!("{:>width$}", i + 1, width = width).dark_grey(),
            line
        ));
    }
    output.push_str(&rule());
    output.push('\n');
    output
}

pub fn error_panel(record: &ErrorRecord) -> String {
    let line = record
        .source_line
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!(
        "{} Error detected\n  {} {}\n  {} {}\n  {} {}\n",
        "✗".red().bold(),
        "Type:".red(),
        record.kind,
        "Message:".red(),
        record.message.lines().next().unwrap_or(""),
        "Line:".red(),
        line
    )
}

/// Largest LCS table `diff_lines` will build for the changed region
const MAX_DIFF_CELLS: usize = 1_000_000;

/// Line diff of original vs fixed. Unchanged leading and trailing lines are
/// matched directly and the LCS runs on what's left; if that region is still
/// too big it is shown as a block replacement.
pub fn diff_lines(original: &str, fixed: &str) -> Vec<DiffLine> {
    let a: Vec<&str> = original.lines().collect();
    let b: Vec<&str> = fixed.lines().collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let mut out: Vec<DiffLine> = a[..prefix].iter().map(|l| DiffLine::Same(l.to_string())).collect();
    let (mid_a, mid_b) = (&a[prefix..a.len() - suffix], &b[prefix..b.len() - suffix]);

    let cells = (mid_a.len() + 1).saturating_mul(mid_b.len() + 1);
    if cells <= MAX_DIFF_CELLS {
        lcs_diff(mid_a, mid_b, &mut out);
    } else {
        out.extend(mid_a.iter().map(|l| DiffLine::Removed(l.to_string())));
        out.extend(mid_b.iter().map(|l| DiffLine::Added(l.to_string())));
    }

    out.extend(a[a.len() - suffix..].iter().map(|l| DiffLine::Same(l.to_string())));
    out
}

fn lcs_diff(a: &[&str], b: &[&str], out: &mut Vec<DiffLine>) {
    // lcs[i][j] = LCS length of a[i..] and b[j..]
    let mut lcs = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(DiffLine::Same(a[i].to_string()));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            out.push(DiffLine::Removed(a[i].to_string()));
            i += 1;
        } else {
            out.push(DiffLine::Added(b[j].to_string()));
            j += 1;
        }
    }
    out.extend(a[i..].iter().map(|l| DiffLine::Removed(l.to_string())));
    out.extend(b[j..].iter().map(|l| DiffLine::Added(l.to_string())));
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Same(String),
    Removed(String),
    Added(String),
}

pub fn diff_panel(original: &str, fixed: &str) -> String {
    let diff = diff_lines(original, fixed);
    let added = diff.iter().filter(|l| matches!(l, DiffLine::Added(_))).count();
    let removed = diff.iter().filter(|l| matches!(l, DiffLine::Removed(_))).count();

    let mut output = format!(
        "{} Changes (+{} -{})\n{}\n",
        "▸".cyan().bold(),
        added,
        removed,
        rule()
    );
    for line in diff {
        let rendered = match line {
            DiffLine::Same(l) => format!("  {}", l).dark_grey().to_string(),
            DiffLine::Removed(l) => format!("- {}", l).red().to_string(),
            DiffLine::Added(l) => format!("+ {}", l).green().to_string(),
        };
        output.push_str(&rendered);
        output.push('\n');
    }
    output.push_str(&rule());
    output.push('\n');
    output
}

/// One-line progress message for a loop event, if it deserves one
pub fn event_line(event: &RepairEvent) -> Option<String> {
    match event {
        RepairEvent::ExecutingOriginal => Some(format!("{} Running script...", "▸".cyan())),
        RepairEvent::OriginalSucceeded => None,
        RepairEvent::ErrorDetected { record } => Some(error_panel(record)),
        RepairEvent::RequestingFix { .. } => None,
        RepairEvent::VerifyingCandidate { attempt } => {
            Some(format!("{} Testing fix (attempt {})...", "▸".cyan(), attempt))
        }
        RepairEvent::AttemptFinished { attempt, result } => {
            if attempt.verified {
                Some(format!("{} Fix verified", "✓".green().bold()))
            } else {
                let reason = crate::classifier::classify(&result.stderr);
                Some(format!(
                    "{} Fix didn't work: {}",
                    "⚠".yellow().bold(),
                    reason.to_string().yellow()
                ))
            }
        }
        RepairEvent::EmptyCandidate { attempt } => Some(format!(
            "{} Attempt {}: the model returned no code",
            "⚠".yellow().bold(),
            attempt
        )),
    }
}

/// Closing summary for a repair outcome
pub fn outcome_summary(outcome: &RepairOutcome) -> String {
    if !outcome.had_error {
        return format!("{} No errors found! Code runs successfully.", "✓".green().bold());
    }

    if outcome.verified {
        let plural = if outcome.attempts == 1 { "" } else { "s" };
        return format!(
            "{} Fixed and verified in {} attempt{}",
            "✓".green().bold(),
            outcome.attempts,
            plural
        );
    }

    let reason = outcome.explanation.as_deref().unwrap_or("no fix found");
    match outcome.failure {
        Some(RepairFailure::Service) => format!(
            "{} Model request failed after {} attempt(s)\n  {}\n  {}",
            "✗".red().bold(),
            outcome.attempts,
            reason,
            "Is Ollama running? Try: ollama serve".dark_grey()
        ),
        Some(RepairFailure::SpawnFailure) => format!(
            "{} Could not run the script\n  {}",
            "✗".red().bold(),
            reason
        ),
        Some(RepairFailure::Exhausted) | None => format!("{} {}", "✗".red().bold(), reason),
    }
}

pub fn run_output(result: &ExecutionResult) -> String {
    let mut output = String::new();
    if !result.stdout.trim().is_empty() {
        output.push_str(&format!("{}\n{}\n", "Output:".bold(), result.stdout.trim_end()));
    }
    if !result.succeeded && !result.stderr.trim().is_empty() {
        output.push_str(&format!("{}\n", result.stderr.trim_end().red()));
    }
    output
}

pub fn stats(summary: &MetricsSummary) -> String {
    let pct = |n: usize| {
        if summary.total > 0 {
            (n as f64 / summary.total as f64) * 100.0
        } else {
            0.0
        }
    };

    let mut output = format!(
        "Repairs today:\n\
        Total runs: {}\n\
        Clean: {} ({:.1}%)\n\
        Fixed: {} ({:.1}%)\n\
        Not fixed: {} ({:.1}%)\n\
        Avg attempts per fix: {:.1}\n\
        Avg duration: {}ms\n",
        summary.total,
        summary.clean,
        pct(summary.clean),
        summary.fixed,
        pct(summary.fixed),
        summary.failed,
        pct(summary.failed),
        summary.avg_attempts,
        summary.avg_duration_ms
    );

    if !summary.top_error_kinds.is_empty() {
        output.push_str("\nMost common errors:\n");
        for (i, (kind, count)) in summary.top_error_kinds.iter().enumerate() {
            output.push_str(&format!("  {}. {} ({})\n", i + 1, kind, count));
        }
    }

    output
}

pub fn model_missing_hint(model: &str) -> String {
    format!(
        "{} Model '{}' not available. Pull it first:\n  {}",
        "⚠".yellow().bold(),
        model,
        format!("ollama pull {}", model).cyan()
    )
}

pub fn print_error(message: impl std::fmt::Display) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

pub fn print_info(message: impl std::fmt::Display) {
    println!("{}", message.to_string().cyan());
}

/// Ask a yes/no question on stdin. Anything but y/yes (or EOF) is "no".
pub fn confirm(question: &str) -> io::Result<bool> {
    print!("{} (y/n): ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> String {
        // Strip ANSI escapes for assertions
        let re = regex::Regex::new(r"\x1b\[[0-9;]*m").unwrap();
        re.replace_all(s, "").into_owned()
    }

    #[test]
    fn test_code_panel_numbers_lines() {
        let panel = plain(&code_panel("Fixed Code", "a = 1\nprint(a)"));
        assert!(panel.contains("Fixed Code"));
        assert!(panel.contains("  1 │ a = 1"));
        assert!(panel.contains("  2 │ print(a)"));
    }

    #[test]
    fn test_diff_lines_single_change() {
        let diff = diff_lines("import os\nprint(x)\n", "import os\nprint('ok')\n");
        assert_eq!(
            diff,
            vec![
                DiffLine::Same("import os".into()),
                DiffLine::Removed("print(x)".into()),
                DiffLine::Added("print('ok')".into()),
            ]
        );
    }

    #[test]
    fn test_diff_lines_insertion() {
        let diff = diff_lines("a\nc", "a\nb\nc");
        assert_eq!(diff[1], DiffLine::Added("b".into()));
        assert_eq!(diff.len(), 3);
    }

    #[test]
    fn test_diff_lines_long_file_with_one_change() {
        let original: String = (0..10_000).map(|i| format!("x{} = {}\n", i, i)).collect();
        let fixed = original.replace("x5000 = 5000\n", "x5000 = 'five thousand'\n");

        let diff = diff_lines(&original, &fixed);
        assert_eq!(diff.len(), 10_001);
        assert_eq!(diff[5000], DiffLine::Removed("x5000 = 5000".into()));
        assert_eq!(diff[5001], DiffLine::Added("x5000 = 'five thousand'".into()));
        assert_eq!(diff.iter().filter(|l| matches!(l, DiffLine::Same(_))).count(), 9_999);
    }

    #[test]
    fn test_diff_lines_large_rewrite_falls_back_to_block() {
        let original: String = (0..2_000).map(|i| format!("old_{}\n", i)).collect();
        let fixed: String = (0..2_000).map(|i| format!("new_{}\n", i)).collect();
        let original = format!("header\n{}footer\n", original);
        let fixed = format!("header\n{}footer\n", fixed);

        let diff = diff_lines(&original, &fixed);
        assert_eq!(diff.len(), 4_002);
        assert_eq!(diff[0], DiffLine::Same("header".into()));
        assert!(diff[1..2_001].iter().all(|l| matches!(l, DiffLine::Removed(_))));
        assert!(diff[2_001..4_001].iter().all(|l| matches!(l, DiffLine::Added(_))));
        assert_eq!(diff[4_001], DiffLine::Same("footer".into()));
    }

    #[test]
    fn test_outcome_summary_variants() {
        let run = ExecutionResult::exited(Some(1), String::new(), "NameError: x".into());
        let mut outcome = RepairOutcome {
            had_error: true,
            original_source: "print(x)".into(),
            original_run: run,
            final_source: None,
            error_record: None,
            explanation: Some("connection refused".into()),
            verified: false,
            attempts: 1,
            failure: Some(RepairFailure::Service),
            last_candidate: None,
        };
        assert!(plain(&outcome_summary(&outcome)).contains("Model request failed"));

        outcome.failure = None;
        outcome.explanation = None;
        outcome.verified = true;
        outcome.final_source = Some("print(1)".into());
        assert!(plain(&outcome_summary(&outcome)).contains("Fixed and verified in 1 attempt"));
    }

    #[test]
    fn test_error_panel_unknown_line() {
        let record = ErrorRecord {
            kind: "Unknown".into(),
            message: "segfault".into(),
            source_line: None,
        };
        let panel = plain(&error_panel(&record));
        assert!(panel.contains("Type: Unknown"));
        assert!(panel.contains("Line: unknown"));
    }

    #[test]
    fn test_stats_lists_error_kinds() {
        let summary = MetricsSummary {
            total: 2,
            fixed: 1,
            failed: 1,
            clean: 0,
            avg_attempts: 2.0,
            avg_duration_ms: 1500,
            top_error_kinds: vec![("NameError".into(), 2)],
        };
        let text = stats(&summary);
        assert!(text.contains("Fixed: 1 (50.0%)"));
        assert!(text.contains("1. NameError (2)"));
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
    }
}
