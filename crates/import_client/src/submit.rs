use std::sync::Arc;

use import_core::{JobId, LogicalRequestKey};
use import_logging::{import_debug, import_info, import_warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::http::{build_client, describe_transport_error, error_message};
use crate::{ClientSettings, ImportError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateJobRequest<'a> {
    text: &'a str,
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AcceptResponse {
    job_id: Option<String>,
}

/// A job the queue accepted for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedJob {
    pub job_id: JobId,
    pub key: LogicalRequestKey,
}

/// Issues the "create job" request. One network attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct JobSubmitter {
    client: reqwest::Client,
    settings: Arc<ClientSettings>,
}

impl JobSubmitter {
    pub fn new(settings: ClientSettings) -> Result<Self, ImportError> {
        let client = build_client(&settings)?;
        Ok(Self::with_client(client, Arc::new(settings)))
    }

    pub fn with_client(client: reqwest::Client, settings: Arc<ClientSettings>) -> Self {
        Self { client, settings }
    }

    /// `POST {text: url, userId}` to the job endpoint; only `202 {jobId}` is success.
    pub async fn submit(&self, url: &str, user_id: &str) -> Result<SubmittedJob, ImportError> {
        let endpoint = self.settings.job_url()?;
        let key = LogicalRequestKey::new(url, user_id);

        let body = serde_json::to_vec(&CreateJobRequest { text: url, user_id }).map_err(|err| {
            ImportError::Submission {
                status: None,
                message: format!("failed to encode job request: {err}"),
            }
        })?;

        import_debug!("Submitting import job key={} endpoint={}", key, endpoint);
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| ImportError::Submission {
                status: None,
                message: describe_transport_error(&err),
            })?;

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                import_warn!("Could not read job creation response body: {}", err);
                String::new()
            }
        };

        if status != StatusCode::ACCEPTED {
            let message = error_message(status.as_u16(), &text);
            import_warn!(
                "Job creation rejected key={} status={} message={}",
                key,
                status.as_u16(),
                message
            );
            return Err(ImportError::Submission {
                status: Some(status.as_u16()),
                message,
            });
        }

        let job_id = serde_json::from_str::<AcceptResponse>(&text)
            .ok()
            .and_then(|accepted| accepted.job_id)
            .filter(|job_id| !job_id.trim().is_empty())
            .ok_or_else(|| ImportError::Submission {
                status: Some(status.as_u16()),
                message: "accept response missing jobId".to_string(),
            })?;

        import_info!("Import job accepted job_id={} key={}", job_id, key);
        Ok(SubmittedJob { job_id, key })
    }
}
