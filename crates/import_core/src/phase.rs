use crate::{JobId, JobStatus};

/// Phase of one orchestrated import operation.
///
/// `idle -> submitting -> polling -> {succeeded | domain_errored | transport_failed | timed_out | cancelled}`.
/// Everything to the right of `polling` is terminal for the operation instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImportPhase {
    #[default]
    Idle,
    Submitting,
    Polling {
        job_id: JobId,
        last_status: Option<JobStatus>,
    },
    Succeeded,
    DomainErrored,
    TransportFailed,
    TimedOut,
    Cancelled,
}

/// Inputs driving [`ImportPhase::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    SubmitStarted,
    JobAccepted { job_id: JobId },
    StatusObserved { status: JobStatus },
    TransportFailed,
    TimedOut,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event {event:?} is not valid in phase {from:?}")]
pub struct InvalidTransition {
    pub from: ImportPhase,
    pub event: ImportEvent,
}

impl ImportPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            ImportPhase::Idle | ImportPhase::Submitting | ImportPhase::Polling { .. }
        )
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            ImportPhase::Polling { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    /// Pure transition function: applies one event and returns the next phase.
    pub fn advance(self, event: ImportEvent) -> Result<ImportPhase, InvalidTransition> {
        let next = match (&self, &event) {
            (ImportPhase::Idle, ImportEvent::SubmitStarted) => Some(ImportPhase::Submitting),
            (ImportPhase::Submitting, ImportEvent::JobAccepted { job_id }) => {
                Some(ImportPhase::Polling {
                    job_id: job_id.clone(),
                    last_status: None,
                })
            }
            (ImportPhase::Polling { job_id, .. }, ImportEvent::StatusObserved { status }) => {
                Some(match status {
                    JobStatus::Success => ImportPhase::Succeeded,
                    JobStatus::Error => ImportPhase::DomainErrored,
                    // Regressions are recorded as-is; the queue owns the record.
                    JobStatus::Queued | JobStatus::Working => ImportPhase::Polling {
                        job_id: job_id.clone(),
                        last_status: Some(*status),
                    },
                })
            }
            (
                ImportPhase::Submitting | ImportPhase::Polling { .. },
                ImportEvent::TransportFailed,
            ) => Some(ImportPhase::TransportFailed),
            (ImportPhase::Polling { .. }, ImportEvent::TimedOut) => Some(ImportPhase::TimedOut),
            (
                ImportPhase::Submitting | ImportPhase::Polling { .. },
                ImportEvent::Cancelled,
            ) => Some(ImportPhase::Cancelled),
            _ => None,
        };

        next.ok_or(InvalidTransition { from: self, event })
    }
}
