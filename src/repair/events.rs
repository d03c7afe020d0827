// Progress events emitted by the repair loop
//
// The loop itself prints nothing; callers that want progress pass an observer.

use std::sync::Arc;

use super::types::RepairAttempt;
use crate::classifier::ErrorRecord;
use crate::executor::ExecutionResult;

#[derive(Debug, Clone)]
pub enum RepairEvent {
    /// Running the original source
    ExecutingOriginal,
    /// Original ran clean; no model call will be made
    OriginalSucceeded,
    /// Original failed and was classified
    ErrorDetected { record: ErrorRecord },
    /// About to ask the model for attempt `attempt` of `max_attempts`
    RequestingFix { attempt: u32, max_attempts: u32 },
    /// Candidate extracted from the reply, about to run it
    VerifyingCandidate { attempt: u32 },
    /// Candidate ran; `attempt.verified` says whether it passed
    AttemptFinished {
        attempt: RepairAttempt,
        result: ExecutionResult,
    },
    /// Reply contained no usable code
    EmptyCandidate { attempt: u32 },
}

/// Callback receiving loop progress
pub type ProgressObserver = Arc<dyn Fn(&RepairEvent) + Send + Sync>;
