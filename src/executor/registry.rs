// Children currently running, so an interrupt can take them down
//
// The Ctrl-C handler exits the process without unwinding, which skips
// kill_on_drop and scratch-file drops. Every run registers its process group
// and scratch path here for the handler to clean up first.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::debug;

static GLOBAL: Lazy<RunRegistry> = Lazy::new(RunRegistry::default);

/// Process groups and scratch files of in-flight executions
#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    runs: Arc<Mutex<HashMap<u32, Option<PathBuf>>>>,
}

impl RunRegistry {
    /// Registry used by executors unless told otherwise
    pub fn global() -> &'static RunRegistry {
        &GLOBAL
    }

    pub fn len(&self) -> usize {
        self.runs.lock().map(|runs| runs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scratch files of the runs in flight
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        self.runs
            .lock()
            .map(|runs| runs.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Kill every registered process group and delete its scratch file.
    /// Returns how many runs were stopped.
    pub fn interrupt_all(&self) -> usize {
        // A panicked holder still leaves usable data behind
        let mut runs = match self.runs.lock() {
            Ok(runs) => runs,
            Err(poisoned) => poisoned.into_inner(),
        };
        let count = runs.len();
        for (pid, scratch) in runs.drain() {
            kill_process_group(Some(pid));
            if let Some(path) = scratch {
                let _ = std::fs::remove_file(&path);
            }
        }
        count
    }

    /// Track a spawned child until the returned guard is dropped. If the
    /// guard goes away before `finish`, the group is killed.
    pub(crate) fn track(&self, pid: Option<u32>, scratch: Option<PathBuf>) -> ActiveRun {
        if let (Some(pid), Ok(mut runs)) = (pid, self.runs.lock()) {
            runs.insert(pid, scratch);
        }
        ActiveRun {
            registry: self.clone(),
            pid,
            finished: false,
        }
    }
}

pub(crate) struct ActiveRun {
    registry: RunRegistry,
    pid: Option<u32>,
    finished: bool,
}

impl ActiveRun {
    /// The child was reaped (or its group already killed)
    pub(crate) fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for ActiveRun {
    fn drop(&mut self) {
        let Some(pid) = self.pid else { return };
        if let Ok(mut runs) = self.registry.runs.lock() {
            runs.remove(&pid);
        }
        if !self.finished {
            debug!(pid, "Execution abandoned, killing process group");
            kill_process_group(Some(pid));
        }
    }
}

/// Kill a child's whole process group. The direct child is also covered by
/// `kill_on_drop`; this catches anything it forked.
#[cfg(unix)]
pub(crate) fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = pid {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            debug!(pid, "killpg failed (group may already be gone): {}", e);
        }
    }
}

#[cfg(not(unix))]
pub(crate) fn kill_process_group(_pid: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    // Above any pid_max, so killpg only ever reports ESRCH
    const NO_SUCH_PID: u32 = 2_000_000_000;

    #[test]
    fn test_guard_unregisters_on_drop() {
        let registry = RunRegistry::default();
        let run = registry.track(Some(NO_SUCH_PID), Some(PathBuf::from("/nonexistent/mender-x.py")));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.scratch_files(), vec![PathBuf::from("/nonexistent/mender-x.py")]);
        run.finish();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_interrupt_all_removes_scratch_files() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("mender-abc.py");
        std::fs::write(&scratch, "while True: pass\n").unwrap();

        let registry = RunRegistry::default();
        let run = registry.track(Some(NO_SUCH_PID), Some(scratch.clone()));

        assert_eq!(registry.interrupt_all(), 1);
        assert!(!scratch.exists());
        assert!(registry.is_empty());
        run.finish();
    }
}
