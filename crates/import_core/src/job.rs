use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::JobStatus;

/// Opaque, server-assigned job identifier.
pub type JobId = String;

/// One status record for a remote job, as returned by the status endpoint.
///
/// Records are owned by the remote queue; this side only reads them. Decoding
/// is lenient about everything except `status`: the body may omit `jobId`,
/// `error` may be any JSON value and `retryAfterSeconds` any number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    /// Empty when the body did not repeat it.
    #[serde(default)]
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(
        default,
        deserialize_with = "error_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
    #[serde(
        default,
        deserialize_with = "whole_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub retry_after_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ImportJob {
    /// Builds the settled outcome for a terminal record, `None` while the job is still running.
    pub fn terminal_result(&self) -> Option<ImportJobResult> {
        match self.status {
            JobStatus::Queued | JobStatus::Working => None,
            JobStatus::Success => Some(ImportJobResult::Success {
                result: self.result.clone().unwrap_or(Value::Null),
            }),
            JobStatus::Error => Some(ImportJobResult::Error {
                error: self.error.clone().unwrap_or_default(),
                retry_after_seconds: self.retry_after_seconds,
            }),
        }
    }
}

/// Non-string `error` values keep their JSON text.
fn error_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

/// Fractional seconds round up, negatives clamp to zero, anything else is dropped.
fn whole_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let seconds = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => match number.as_u64() {
            Some(whole) => return Ok(Some(whole)),
            None => number.as_f64(),
        },
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(seconds
        .filter(|seconds| seconds.is_finite())
        .map(|seconds| seconds.max(0.0).ceil() as u64))
}

/// Settled outcome of an import.
///
/// A remote `error` is a value here, not an `Err`: the caller owns retry policy
/// and can use `retry_after_seconds` for backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ImportJobResult {
    Success {
        result: Value,
    },
    Error {
        error: String,
        #[serde(
            rename = "retryAfterSeconds",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        retry_after_seconds: Option<u64>,
    },
}

impl ImportJobResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ImportJobResult::Success { .. })
    }

    pub fn status(&self) -> JobStatus {
        match self {
            ImportJobResult::Success { .. } => JobStatus::Success,
            ImportJobResult::Error { .. } => JobStatus::Error,
        }
    }
}
