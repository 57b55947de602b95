use std::time::Duration;

use import_logging::import_warn;
use url::Url;

use crate::ImportError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(120_000);

pub const ENV_JOB_ENDPOINT: &str = "IMPORT_JOB_ENDPOINT";
pub const ENV_STATUS_ENDPOINT: &str = "IMPORT_STATUS_ENDPOINT";
pub const ENV_POLL_INTERVAL_MS: &str = "IMPORT_POLL_INTERVAL_MS";
pub const ENV_POLL_TIMEOUT_MS: &str = "IMPORT_POLL_TIMEOUT_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "IMPORT_REQUEST_TIMEOUT_MS";

/// Tick interval and overall deadline for one polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// `POST` target for job creation.
    pub job_endpoint: Option<String>,
    /// `GET ?id=` target for job status. Falls back to `job_endpoint` when unset.
    pub status_endpoint: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub poll: PollOptions,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            job_endpoint: None,
            status_endpoint: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            poll: PollOptions::default(),
        }
    }
}

impl ClientSettings {
    pub fn with_endpoints(
        job_endpoint: impl Into<String>,
        status_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            job_endpoint: Some(job_endpoint.into()),
            status_endpoint: Some(status_endpoint.into()),
            ..Self::default()
        }
    }

    /// Defaults overridden by the `IMPORT_*` environment variables.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_overrides(|name| std::env::var(name).ok());
        settings
    }

    /// Applies overrides from a variable lookup. Empty values are treated as unset;
    /// malformed numbers are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(endpoint) = lookup(ENV_JOB_ENDPOINT) {
            self.job_endpoint = Some(endpoint);
        }
        if let Some(endpoint) = lookup(ENV_STATUS_ENDPOINT) {
            self.status_endpoint = Some(endpoint);
        }
        let millis = |name: &str| lookup(name).and_then(|value| parse_millis(name, &value));
        if let Some(interval) = millis(ENV_POLL_INTERVAL_MS) {
            self.poll.interval = interval;
        }
        if let Some(timeout) = millis(ENV_POLL_TIMEOUT_MS) {
            self.poll.timeout = timeout;
        }
        if let Some(timeout) = millis(ENV_REQUEST_TIMEOUT_MS) {
            self.request_timeout = timeout;
        }
    }

    pub(crate) fn job_url(&self) -> Result<Url, ImportError> {
        let endpoint = non_empty(self.job_endpoint.as_deref()).ok_or_else(|| {
            ImportError::Configuration(format!(
                "job endpoint is not configured (set {ENV_JOB_ENDPOINT})"
            ))
        })?;
        parse_endpoint("job", endpoint)
    }

    pub(crate) fn status_url(&self, job_id: &str) -> Result<Url, ImportError> {
        let endpoint = non_empty(self.status_endpoint.as_deref())
            .or_else(|| non_empty(self.job_endpoint.as_deref()))
            .ok_or_else(|| {
                ImportError::Configuration(format!(
                    "status endpoint is not configured (set {ENV_STATUS_ENDPOINT} or {ENV_JOB_ENDPOINT})"
                ))
            })?;
        let mut url = parse_endpoint("status", endpoint)?;
        url.query_pairs_mut().append_pair("id", job_id);
        Ok(url)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_endpoint(which: &str, endpoint: &str) -> Result<Url, ImportError> {
    Url::parse(endpoint).map_err(|err| {
        ImportError::Configuration(format!("invalid {which} endpoint {endpoint:?}: {err}"))
    })
}

fn parse_millis(name: &str, value: &str) -> Option<Duration> {
    match value.parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(err) => {
            import_warn!("Ignoring {}={:?}: {}", name, value, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_budget() {
        let settings = ClientSettings::default();
        assert_eq!(settings.poll.interval, Duration::from_millis(2000));
        assert_eq!(settings.poll.timeout, Duration::from_millis(120_000));
        assert!(settings.job_endpoint.is_none());
    }

    #[test]
    fn overrides_apply_and_bad_numbers_are_ignored() {
        let mut settings = ClientSettings::default();
        settings.apply_overrides(lookup_from(&[
            (ENV_JOB_ENDPOINT, " https://jobs.example.com/create "),
            (ENV_STATUS_ENDPOINT, ""),
            (ENV_POLL_INTERVAL_MS, "250"),
            (ENV_POLL_TIMEOUT_MS, "soon"),
        ]));

        assert_eq!(
            settings.job_endpoint.as_deref(),
            Some("https://jobs.example.com/create")
        );
        assert!(settings.status_endpoint.is_none());
        assert_eq!(settings.poll.interval, Duration::from_millis(250));
        assert_eq!(settings.poll.timeout, DEFAULT_POLL_TIMEOUT);
    }

    #[test]
    fn missing_job_endpoint_is_configuration_error() {
        let err = ClientSettings::default().job_url().unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }

    #[test]
    fn status_url_appends_encoded_id() {
        let settings = ClientSettings::with_endpoints(
            "https://q.example.com/jobs",
            "https://q.example.com/status?v=2",
        );
        let url = settings.status_url("a b&c").unwrap();
        assert_eq!(url.as_str(), "https://q.example.com/status?v=2&id=a+b%26c");
    }

    #[test]
    fn status_url_falls_back_to_job_endpoint() {
        let settings = ClientSettings {
            job_endpoint: Some("https://q.example.com/jobs".to_string()),
            ..ClientSettings::default()
        };
        let url = settings.status_url("j1").unwrap();
        assert_eq!(url.as_str(), "https://q.example.com/jobs?id=j1");
    }

    #[test]
    fn invalid_endpoint_is_configuration_error() {
        let settings = ClientSettings::with_endpoints("not a url", "also not");
        assert!(matches!(
            settings.job_url(),
            Err(ImportError::Configuration(_))
        ));
    }
}
