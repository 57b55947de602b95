//! Import core: pure job data model, request keys and the operation state machine.
mod job;
mod key;
mod phase;
mod status;

pub use job::{ImportJob, ImportJobResult, JobId};
pub use key::LogicalRequestKey;
pub use phase::{ImportEvent, ImportPhase, InvalidTransition};
pub use status::JobStatus;
