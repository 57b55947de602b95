use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use import_core::{ImportEvent, ImportJob, ImportJobResult, ImportPhase, LogicalRequestKey};
use import_logging::{import_debug, import_info, import_warn};
use tokio_util::sync::CancellationToken;

use crate::http::build_client;
use crate::{
    ClientSettings, ImportError, JobPoller, JobSubmitter, PollOptions, SingleFlightRegistry,
    StatusSink,
};

/// Settled outcome shared by every caller of one logical import.
pub type ImportOutcome = Result<ImportJobResult, ImportError>;

/// Registry type owned by an [`ImportOrchestrator`].
pub type ImportRegistry = SingleFlightRegistry<LogicalRequestKey, ImportOutcome, ImportFlight>;

/// Per-operation state shared by every caller of one logical import: the
/// status subscribers, the cancellation token and the current phase.
#[derive(Clone, Default)]
pub struct ImportFlight {
    subscribers: Arc<Mutex<Subscribers>>,
    phase: Arc<Mutex<ImportPhase>>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Subscribers {
    sinks: Vec<Arc<dyn StatusSink>>,
    latest: Option<ImportJob>,
}

impl ImportFlight {
    /// Adds a subscriber. A late joiner first receives the latest status seen so far.
    fn subscribe(&self, sink: Arc<dyn StatusSink>) {
        let mut subscribers = lock(&self.subscribers);
        if let Some(latest) = subscribers.latest.as_ref() {
            sink.on_status(latest);
        }
        subscribers.sinks.push(sink);
    }

    fn advance(&self, event: ImportEvent) {
        let mut phase = lock(&self.phase);
        let current = std::mem::take(&mut *phase);
        *phase = match current.advance(event) {
            Ok(next) => next,
            Err(err) => {
                import_warn!("Ignoring import phase change: {}", err);
                err.from
            }
        };
    }

    fn phase(&self) -> ImportPhase {
        lock(&self.phase).clone()
    }
}

impl StatusSink for ImportFlight {
    fn on_status(&self, job: &ImportJob) {
        self.advance(ImportEvent::StatusObserved { status: job.status });
        let mut subscribers = lock(&self.subscribers);
        subscribers.latest = Some(job.clone());
        for sink in &subscribers.sinks {
            sink.on_status(job);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs submit-then-poll as one deduplicated operation per logical request.
///
/// While an import for a `(url, user_id)` pair is outstanding, further calls for
/// the same pair join it: one job is created, one polling loop runs, and every
/// caller receives the same outcome. Once it settles, the next call starts a new job.
///
/// Status callbacks run while internal locks are held and must not call back
/// into the orchestrator.
#[derive(Clone)]
pub struct ImportOrchestrator {
    submitter: JobSubmitter,
    poller: JobPoller,
    registry: ImportRegistry,
    poll_options: PollOptions,
}

impl ImportOrchestrator {
    pub fn new(settings: ClientSettings) -> Result<Self, ImportError> {
        Self::with_registry(settings, ImportRegistry::new())
    }

    /// Builds an orchestrator over an existing registry. Orchestrators sharing a
    /// registry also share deduplication.
    pub fn with_registry(
        settings: ClientSettings,
        registry: ImportRegistry,
    ) -> Result<Self, ImportError> {
        let client = build_client(&settings)?;
        let poll_options = settings.poll;
        let settings = Arc::new(settings);
        Ok(Self {
            submitter: JobSubmitter::with_client(client.clone(), Arc::clone(&settings)),
            poller: JobPoller::with_client(client, settings),
            registry,
            poll_options,
        })
    }

    pub fn submitter(&self) -> &JobSubmitter {
        &self.submitter
    }

    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    pub fn registry(&self) -> &ImportRegistry {
        &self.registry
    }

    /// Submits an import and polls it to completion, sharing the operation with
    /// any concurrent call for the same logical request.
    ///
    /// A job that the queue reports as failed resolves to
    /// `Ok(ImportJobResult::Error { .. })`.
    pub async fn import_property(
        &self,
        url: &str,
        user_id: &str,
        on_status_update: impl StatusSink + 'static,
    ) -> ImportOutcome {
        let key = LogicalRequestKey::new(url, user_id);
        let sink: Arc<dyn StatusSink> = Arc::new(on_status_update);

        let submitter = self.submitter.clone();
        let poller = self.poller.clone();
        let options = self.poll_options;
        let url = url.to_string();
        let user_id = user_id.to_string();

        let flight = self.registry.run_exclusive_with(
            key.clone(),
            |flight| flight.subscribe(sink),
            move |flight| run_import(submitter, poller, url, user_id, options, flight),
        );

        if flight.is_leader() {
            import_info!("Starting import key={}", key);
        } else {
            import_debug!("Joining in-flight import key={}", key);
        }

        match flight.wait().await {
            Ok(outcome) => outcome,
            Err(aborted) => Err(ImportError::Aborted(aborted.0)),
        }
    }

    /// Cancels the in-flight import for the pair. Every caller sharing it settles
    /// with [`ImportError::Cancelled`]. Returns `false` when nothing was running.
    pub fn cancel(&self, url: &str, user_id: &str) -> bool {
        let key = LogicalRequestKey::new(url, user_id);
        match self.registry.attachment(&key) {
            Some(flight) => {
                import_info!("Cancelling import key={}", key);
                flight.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Phase of the in-flight import for the pair, `None` when idle.
    pub fn phase(&self, url: &str, user_id: &str) -> Option<ImportPhase> {
        self.registry
            .attachment(&LogicalRequestKey::new(url, user_id))
            .map(|flight| flight.phase())
    }

    /// Number of logical imports currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.registry.len()
    }
}

async fn run_import(
    submitter: JobSubmitter,
    poller: JobPoller,
    url: String,
    user_id: String,
    options: PollOptions,
    flight: ImportFlight,
) -> ImportOutcome {
    flight.advance(ImportEvent::SubmitStarted);

    let submitted = tokio::select! {
        biased;
        _ = flight.cancel.cancelled() => {
            flight.advance(ImportEvent::Cancelled);
            return Err(ImportError::Cancelled { job_id: None });
        }
        submitted = submitter.submit(&url, &user_id) => submitted,
    };
    let submitted = match submitted {
        Ok(submitted) => submitted,
        Err(err) => {
            flight.advance(ImportEvent::TransportFailed);
            return Err(err);
        }
    };

    flight.advance(ImportEvent::JobAccepted {
        job_id: submitted.job_id.clone(),
    });

    let outcome = poller
        .poll_until(&submitted.job_id, &flight, options, &flight.cancel)
        .await;

    // Terminal statuses already moved the phase through the status sink.
    if let Err(err) = &outcome {
        flight.advance(match err {
            ImportError::Timeout { .. } => ImportEvent::TimedOut,
            ImportError::Cancelled { .. } => ImportEvent::Cancelled,
            _ => ImportEvent::TransportFailed,
        });
    }
    outcome
}
