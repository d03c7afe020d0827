// Repair loop - the part of mender that makes decisions

mod events;
mod loop_runner;
mod types;

pub use events::{ProgressObserver, RepairEvent};
pub use loop_runner::RepairLoop;
pub use types::{RepairAttempt, RepairFailure, RepairOutcome};
