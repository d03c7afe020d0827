// Console front end for the debug agent
//
// Shared by the one-shot flags and the interactive loop: each method runs one
// agent operation and prints its progress and result.

use anyhow::Result;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use crate::agent::DebugAgent;
use crate::repair::{ProgressObserver, RepairEvent};

use super::render;
use super::spinner::Spinner;

pub struct Session {
    agent: DebugAgent,
    spinner: Spinner,
    auto_apply: bool,
}

/// Observer that drives the spinner while the model is working and prints
/// a line for everything else.
pub fn console_observer(spinner: Spinner) -> ProgressObserver {
    Arc::new(move |event: &RepairEvent| match event {
        RepairEvent::RequestingFix {
            attempt,
            max_attempts,
        } => {
            let message = if *attempt == 1 {
                "AI is analyzing and fixing...".to_string()
            } else {
                format!("Retrying fix ({}/{})...", attempt, max_attempts)
            };
            spinner.start(message);
        }
        other => {
            spinner.stop();
            if let Some(line) = render::event_line(other) {
                println!("{}", line);
            }
        }
    })
}

impl Session {
    pub fn new(agent: DebugAgent, auto_apply: bool) -> Self {
        let spinner = Spinner::new();
        let agent = agent.with_observer(console_observer(spinner.clone()));
        Self {
            agent,
            spinner,
            auto_apply,
        }
    }

    pub fn agent(&self) -> &DebugAgent {
        &self.agent
    }

    /// Warn (don't fail) when the backend doesn't have the model
    pub async fn check_model(&self) {
        self.spinner.start("Checking model...");
        let available = self.agent.check_model().await;
        self.spinner.stop();
        if !available {
            println!("{}", render::model_missing_hint(self.agent.provider().model()));
        }
    }

    /// Returns true when the file runs clean or a fix was applied
    pub async fn fix(&self, path: &Path) -> Result<bool> {
        render::print_info(format!("\n🔍 Analyzing file: {}\n", path.display()));

        let report = self.agent.fix_file(path).await;
        self.spinner.stop();
        let report = report?;
        let outcome = &report.outcome;

        println!("{}", render::outcome_summary(outcome));

        if !outcome.had_error {
            return Ok(true);
        }

        let Some(fixed) = report.fixed_source() else {
            if let Some(candidate) = &outcome.last_candidate {
                println!("\n{}", render::code_panel("Last attempted fix (not applied)", candidate));
            }
            return Ok(false);
        };

        println!("\n{}", render::diff_panel(&outcome.original_source, fixed));

        if self.auto_apply || render::confirm("💾 Apply this fix to the file?")? {
            if let Some(backup) = self.agent.apply_fix(&report)? {
                println!("Created backup: {}", backup.display());
            }
            println!("✓ File fixed successfully!");
            Ok(true)
        } else {
            println!("Fix not applied");
            Ok(false)
        }
    }

    pub async fn analyze(&self, path: &Path) -> Result<()> {
        let code = self.agent.workspace().read_source(path)?;
        render::print_info("\n🔍 Analyzing code...\n");

        self.spinner.start("Thinking...");
        let printer = self.delta_printer();
        let analysis = self.agent.analyze(&code, printer).await;
        self.spinner.stop();

        analysis?;
        println!();
        Ok(())
    }

    pub async fn explain(&self, path: &Path) -> Result<()> {
        render::print_info("\n📚 Explaining error...\n");
        self.spinner.start("Running script...");
        let printer = self.delta_printer();
        let explanation = self.agent.explain_file(path, printer).await;
        self.spinner.stop();

        match explanation? {
            Some(_) => println!(),
            None => println!("✓ {} runs without errors, nothing to explain", path.display()),
        }
        Ok(())
    }

    /// Returns true when code was generated (working or not)
    pub async fn create(&self, description: &str, output: Option<&Path>) -> Result<bool> {
        render::print_info(format!("\n🤖 Creating code for: {}\n", description));

        self.spinner.start("Generating code...");
        let report = self.agent.create(description).await;
        self.spinner.stop();
        let report = report?;

        println!("{}", render::code_panel("Generated Code", &report.code));

        if !report.works() {
            println!("⚠ Generated code has errors:");
            println!("{}", render::run_output(&report.run));
            return Ok(true);
        }

        println!("✓ Code works!");

        if let Some(output) = output {
            let exists = self.agent.workspace().exists(output);
            let overwrite = exists
                && render::confirm(&format!("File already exists: {}. Overwrite?", output.display()))?;
            if !exists || overwrite {
                let saved = self.agent.save_created(output, &report.code, overwrite)?;
                println!("✓ Saved to: {}", saved.display());
            }
        }

        Ok(true)
    }

    /// Returns true when the code runs clean or a fix was verified
    pub async fn inline(&self, code: &str) -> bool {
        render::print_info("\n🔍 Debugging inline code...\n");

        let outcome = self.agent.debug_inline(code).await;
        self.spinner.stop();

        if !outcome.had_error {
            println!("✓ Code runs successfully");
            print!("{}", render::run_output(&outcome.original_run));
            return true;
        }

        println!("{}", render::outcome_summary(&outcome));
        match outcome.fixed_source() {
            Some(fixed) => {
                println!("\n🔧 Suggested Fix:");
                println!("{}", render::code_panel("Fixed Code", fixed));
                true
            }
            None => false,
        }
    }

    pub fn list(&self, dir: &Path) -> Result<()> {
        let files = self.agent.workspace().list_python_files(dir)?;
        if files.is_empty() {
            println!("No Python files found in {}", dir.display());
        }
        for file in files {
            match self.agent.workspace().file_info(&file) {
                Ok(info) => println!(
                    "  {:<40} {:>5} lines {:>8} bytes  {}",
                    file.display().to_string(),
                    info.lines,
                    info.size,
                    info.modified
                        .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default()
                ),
                Err(_) => println!("  {}", file.display()),
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> Result<()> {
        match self.agent.metrics() {
            Some(metrics) => println!("{}", render::stats(&metrics.today_summary()?)),
            None => println!("Metrics are disabled (features.metrics_enabled = false)"),
        }
        Ok(())
    }

    /// Prints streamed text as it arrives, stopping the spinner on the
    /// first delta
    fn delta_printer(&self) -> impl FnMut(&str) {
        let spinner = self.spinner.clone();
        let mut first = true;
        move |delta: &str| {
            if first {
                spinner.stop();
                first = false;
            }
            print!("{}", delta);
            let _ = io::stdout().flush();
        }
    }
}
