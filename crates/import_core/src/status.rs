use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a remote import job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Working,
    Success,
    Error,
}

impl JobStatus {
    /// `success` and `error` have no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }

    /// Whether a job observed in `self` may next be observed in `next`.
    ///
    /// Order is queued < working < terminal. Observing the same non-terminal
    /// status twice is allowed (the poller sees it on every tick).
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() >= self.rank()
    }

    fn rank(self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Working => 1,
            JobStatus::Success | JobStatus::Error => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Working => "working",
            JobStatus::Success => "success",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
