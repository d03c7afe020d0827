// Interactive session
//
// Line editing and history come from rustyline. Ctrl-C at the prompt ends
// the session with the interrupt exit code; Ctrl-D ends it normally.

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

use super::commands::{format_help, Command, ParseError};
use super::render;
use super::session::Session;
use super::{EXIT_INTERRUPTED, EXIT_OK};

const PROMPT: &str = "💬 You: ";
const HISTORY_FILE: &str = "history.txt";

pub struct Repl {
    session: Session,
    history_path: Option<PathBuf>,
}

impl Repl {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            history_path: None,
        }
    }

    /// Persist line history under `dir`
    pub fn with_history_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.history_path = Some(dir.into().join(HISTORY_FILE));
        self
    }

    /// Run until exit. Returns the process exit code.
    pub async fn run(&mut self) -> Result<i32> {
        let mut editor = DefaultEditor::new().context("Failed to initialize line editor")?;
        if let Some(path) = &self.history_path {
            // Missing history on first run is expected
            let _ = editor.load_history(path);
        }

        println!("{}", format_help());

        let code = loop {
            match editor.readline(&format!("\n{}", PROMPT.cyan())) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = editor.add_history_entry(line);

                    match Command::parse(line) {
                        Ok(Command::Quit) => {
                            println!("{}", "👋 Goodbye!".cyan());
                            break EXIT_OK;
                        }
                        Ok(command) => {
                            if let Err(e) = self.dispatch(command).await {
                                render::print_error(format!("{:#}", e));
                            }
                        }
                        Err(ParseError::Empty) => {}
                        Err(e) => render::print_error(e),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("\n{}", "⚠ Interrupted by user".yellow());
                    break EXIT_INTERRUPTED;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "👋 Goodbye!".cyan());
                    break EXIT_OK;
                }
                Err(e) => {
                    self.save_history(&mut editor);
                    return Err(e).context("Failed to read input");
                }
            }
        };

        self.save_history(&mut editor);
        Ok(code)
    }

    async fn dispatch(&self, command: Command) -> Result<()> {
        match command {
            Command::Fix(path) => {
                self.session.fix(&path).await?;
            }
            Command::Analyze(path) => self.session.analyze(&path).await?,
            Command::Create(description) => {
                self.session.create(&description, None).await?;
            }
            Command::Explain(path) => self.session.explain(&path).await?,
            Command::List(dir) => self.session.list(&dir)?,
            Command::Stats => self.session.stats()?,
            Command::Help => println!("{}", format_help()),
            Command::Quit => {}
        }
        Ok(())
    }

    fn save_history(&self, editor: &mut DefaultEditor) {
        if let Some(path) = &self.history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Err(e) = editor.save_history(path) {
                tracing::debug!("Could not save history: {}", e);
            }
        }
    }
}
