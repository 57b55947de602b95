use std::fmt;
use std::time::Duration;

use import_core::JobId;

/// Failures of the client itself. A job that the queue reports as `error` is
/// not one of these; it settles as `Ok(ImportJobResult::Error { .. })`.
///
/// `Clone` so a single settlement can be handed to every caller sharing it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    /// A required endpoint is missing or unparsable. Raised before any IO.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Job creation was not accepted with `202 {jobId}`.
    #[error("{message}")]
    Submission {
        status: Option<u16>,
        message: String,
    },
    /// A status request failed or returned a non-OK response. Ends polling.
    #[error("polling job {job_id} failed: {message}")]
    PollingTransport {
        job_id: JobId,
        status: Option<u16>,
        message: String,
    },
    #[error("import job {job_id} did not finish within {} ms", .timeout.as_millis())]
    Timeout { job_id: JobId, timeout: Duration },
    #[error("{}", cancelled_message(.job_id.as_deref()))]
    Cancelled { job_id: Option<JobId> },
    /// The shared import task ended without producing an outcome.
    #[error("import operation aborted: {0}")]
    Aborted(String),
}

fn cancelled_message(job_id: Option<&str>) -> String {
    match job_id {
        Some(job_id) => format!("import job {job_id} was cancelled"),
        None => "import was cancelled before the job was accepted".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    Submission,
    PollingTransport,
    Timeout,
    Cancelled,
    Aborted,
}

impl ImportError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ImportError::Configuration(_) => FailureKind::Configuration,
            ImportError::Submission { .. } => FailureKind::Submission,
            ImportError::PollingTransport { .. } => FailureKind::PollingTransport,
            ImportError::Timeout { .. } => FailureKind::Timeout,
            ImportError::Cancelled { .. } => FailureKind::Cancelled,
            ImportError::Aborted(_) => FailureKind::Aborted,
        }
    }

    /// HTTP status of the response that caused the failure, when there was one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ImportError::Submission { status, .. }
            | ImportError::PollingTransport { status, .. } => *status,
            _ => None,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Configuration => write!(f, "configuration"),
            FailureKind::Submission => write!(f, "submission"),
            FailureKind::PollingTransport => write!(f, "polling transport"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Aborted => write!(f, "aborted"),
        }
    }
}
