//! Import client: job submission, status polling and single-flight orchestration.
mod error;
mod http;
mod orchestrator;
mod poll;
mod registry;
mod settings;
mod submit;

pub use error::{FailureKind, ImportError};
pub use orchestrator::{ImportFlight, ImportOrchestrator, ImportOutcome, ImportRegistry};
pub use poll::{IgnoreStatus, JobPoller, PollTask, StatusSink};
pub use registry::{Flight, FlightAborted, SingleFlightRegistry};
pub use settings::{
    ClientSettings, PollOptions, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, ENV_JOB_ENDPOINT,
    ENV_POLL_INTERVAL_MS, ENV_POLL_TIMEOUT_MS, ENV_REQUEST_TIMEOUT_MS, ENV_STATUS_ENDPOINT,
};
pub use submit::{JobSubmitter, SubmittedJob};

pub use import_core::{ImportJob, ImportJobResult, ImportPhase, JobId, JobStatus, LogicalRequestKey};
