// Spinner shown while waiting on the model

use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

/// Start/stop spinner that can be shared with a progress observer.
///
/// Draws to stderr, and only when stderr is a terminal.
#[derive(Clone, Default)]
pub struct Spinner {
    current: Arc<Mutex<Option<ProgressBar>>>,
}

impl Spinner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, message: impl Into<String>) {
        self.stop();

        let bar = if std::io::stderr().is_terminal() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]") {
            bar.set_style(style);
        }
        bar.set_message(message.into());
        bar.enable_steady_tick(TICK);

        if let Ok(mut current) = self.current.lock() {
            *current = Some(bar);
        }
    }

    pub fn stop(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(bar) = current.take() {
                bar.finish_and_clear();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.current.lock().map(|c| c.is_some()).unwrap_or(false)
    }
}
