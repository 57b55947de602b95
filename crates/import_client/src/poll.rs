use std::sync::Arc;

use import_core::{ImportJob, ImportJobResult, JobId, JobStatus};
use import_logging::{import_debug, import_info, import_warn};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::http::{build_client, describe_transport_error, error_message};
use crate::{ClientSettings, ImportError, PollOptions};

/// Receives every decoded status record, in order, while a poll is running.
///
/// Called synchronously from the polling loop; implementations should return quickly.
pub trait StatusSink: Send + Sync {
    fn on_status(&self, job: &ImportJob);
}

impl<F> StatusSink for F
where
    F: Fn(&ImportJob) + Send + Sync,
{
    fn on_status(&self, job: &ImportJob) {
        self(job)
    }
}

/// Sink for callers that only care about the settled outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreStatus;

impl StatusSink for IgnoreStatus {
    fn on_status(&self, _job: &ImportJob) {}
}

/// Fetches job status at a fixed interval until the job settles, the deadline
/// passes or the poll is cancelled.
#[derive(Debug, Clone)]
pub struct JobPoller {
    client: reqwest::Client,
    settings: Arc<ClientSettings>,
}

impl JobPoller {
    pub fn new(settings: ClientSettings) -> Result<Self, ImportError> {
        let client = build_client(&settings)?;
        Ok(Self::with_client(client, Arc::new(settings)))
    }

    pub fn with_client(client: reqwest::Client, settings: Arc<ClientSettings>) -> Self {
        Self { client, settings }
    }

    pub async fn poll(
        &self,
        job_id: &str,
        sink: &dyn StatusSink,
        options: PollOptions,
    ) -> Result<ImportJobResult, ImportError> {
        self.poll_until(job_id, sink, options, &CancellationToken::new())
            .await
    }

    /// Polls until a terminal status, a transport failure, the deadline or `cancel`.
    ///
    /// The first request goes out immediately. The deadline is measured from this
    /// call; once it or `cancel` fires, the sink is never called again.
    pub async fn poll_until(
        &self,
        job_id: &str,
        sink: &dyn StatusSink,
        options: PollOptions,
        cancel: &CancellationToken,
    ) -> Result<ImportJobResult, ImportError> {
        let url = self.settings.status_url(job_id)?;
        let deadline = Instant::now() + options.timeout;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                import_warn!("Polling cancelled job_id={}", job_id);
                Err(ImportError::Cancelled { job_id: Some(job_id.to_string()) })
            }
            _ = tokio::time::sleep_until(deadline) => {
                import_warn!(
                    "Polling timed out job_id={} timeout_ms={}",
                    job_id,
                    options.timeout.as_millis()
                );
                Err(ImportError::Timeout { job_id: job_id.to_string(), timeout: options.timeout })
            }
            outcome = self.run_loop(&url, job_id, sink, options, cancel) => outcome,
        }
    }

    /// Spawns the polling loop and returns a handle that can cancel it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        &self,
        job_id: impl Into<JobId>,
        sink: Arc<dyn StatusSink>,
        options: PollOptions,
    ) -> PollTask {
        let job_id = job_id.into();
        let cancel = CancellationToken::new();
        let poller = self.clone();
        let task_job_id = job_id.clone();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            poller
                .poll_until(&task_job_id, sink.as_ref(), options, &task_cancel)
                .await
        });
        PollTask {
            job_id,
            cancel,
            handle,
        }
    }

    async fn run_loop(
        &self,
        url: &Url,
        job_id: &str,
        sink: &dyn StatusSink,
        options: PollOptions,
        cancel: &CancellationToken,
    ) -> Result<ImportJobResult, ImportError> {
        let mut previous: Option<JobStatus> = None;
        loop {
            let job = self.fetch_status(url, job_id).await?;

            if let Some(previous) = previous {
                if !previous.can_transition_to(job.status) {
                    import_warn!(
                        "Job {} reported {} after {}; reporting as observed",
                        job_id,
                        job.status,
                        previous
                    );
                }
            }
            previous = Some(job.status);

            import_debug!("Job {} status={}", job_id, job.status);
            sink.on_status(&job);

            if let Some(result) = job.terminal_result() {
                import_info!("Job {} settled status={}", job_id, job.status);
                return Ok(result);
            }

            if cancel.is_cancelled() {
                return Err(ImportError::Cancelled {
                    job_id: Some(job_id.to_string()),
                });
            }
            tokio::time::sleep(options.interval).await;
        }
    }

    async fn fetch_status(&self, url: &Url, job_id: &str) -> Result<ImportJob, ImportError> {
        let transport_error = |status: Option<u16>, message: String| ImportError::PollingTransport {
            job_id: job_id.to_string(),
            status,
            message,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| transport_error(None, describe_transport_error(&err)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| transport_error(Some(status.as_u16()), describe_transport_error(&err)))?;

        if !status.is_success() {
            let message = error_message(status.as_u16(), &text);
            import_warn!(
                "Status request failed job_id={} status={} message={}",
                job_id,
                status.as_u16(),
                message
            );
            return Err(transport_error(Some(status.as_u16()), message));
        }

        let mut job = serde_json::from_str::<ImportJob>(&text).map_err(|err| {
            transport_error(
                Some(status.as_u16()),
                format!("invalid status payload: {err}"),
            )
        })?;
        if job.job_id.is_empty() {
            job.job_id = job_id.to_string();
        }
        Ok(job)
    }
}

/// A running polling loop.
///
/// Dropping the task does not stop it; call [`PollTask::cancel`].
#[derive(Debug)]
pub struct PollTask {
    job_id: JobId,
    cancel: CancellationToken,
    handle: JoinHandle<Result<ImportJobResult, ImportError>>,
}

impl PollTask {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Stops the loop. Takes effect before the next request is scheduled, and
    /// interrupts a sleep or a request already in progress.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn wait(self) -> Result<ImportJobResult, ImportError> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => Err(ImportError::Aborted(err.to_string())),
        }
    }
}
