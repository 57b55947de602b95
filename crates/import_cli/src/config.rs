//! Settings resolution for the CLI.
//!
//! Layers, lowest precedence first: built-in defaults, the RON file passed
//! with `--config`, the `IMPORT_*` environment variables, command-line flags.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use import_client::ClientSettings;
use import_logging::import_info;
use serde::{Deserialize, Serialize};

use crate::args::Cli;

/// Contents of a settings file. Every field is optional.
///
/// ```ron
/// (
///     job_endpoint: Some("https://imports.example.com/jobs"),
///     poll_interval_ms: Some(1000),
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub job_endpoint: Option<String>,
    pub status_endpoint: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub poll_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {path:?}"))?;
        let config = ron::from_str(&content)
            .with_context(|| format!("failed to parse settings file {path:?}"))?;
        import_info!("Loaded settings from {:?}", path);
        Ok(config)
    }

    fn apply(&self, settings: &mut ClientSettings) {
        if let Some(endpoint) = &self.job_endpoint {
            settings.job_endpoint = Some(endpoint.clone());
        }
        if let Some(endpoint) = &self.status_endpoint {
            settings.status_endpoint = Some(endpoint.clone());
        }
        if let Some(ms) = self.poll_interval_ms {
            settings.poll.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.poll_timeout_ms {
            settings.poll.timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = self.request_timeout_ms {
            settings.request_timeout = Duration::from_millis(ms);
        }
    }
}

pub fn resolve_settings(
    cli: &Cli,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    if let Some(path) = &cli.config {
        FileConfig::load(path)?.apply(&mut settings);
    }
    settings.apply_overrides(env);

    if let Some(endpoint) = &cli.job_endpoint {
        settings.job_endpoint = Some(endpoint.clone());
    }
    if let Some(endpoint) = &cli.status_endpoint {
        settings.status_endpoint = Some(endpoint.clone());
    }
    if let Some(ms) = cli.interval_ms {
        settings.poll.interval = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.timeout_ms {
        settings.poll.timeout = Duration::from_millis(ms);
    }

    if settings.job_endpoint.is_none() {
        anyhow::bail!(
            "no job endpoint configured: pass --job-endpoint, set {} or add job_endpoint to a --config file",
            import_client::ENV_JOB_ENDPOINT
        );
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec!["property-import", "--url", "https://x", "--user", "u"];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn settings_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn file_config_parses_partial_ron() {
        let file = settings_file(r#"(job_endpoint: Some("http://file/jobs"), poll_interval_ms: Some(500))"#);

        let config = FileConfig::load(file.path()).unwrap();

        assert_eq!(
            config,
            FileConfig {
                job_endpoint: Some("http://file/jobs".to_string()),
                poll_interval_ms: Some(500),
                ..FileConfig::default()
            }
        );
    }

    #[test]
    fn env_overrides_file_and_flags_override_env() {
        let file = settings_file(
            r#"(
                job_endpoint: Some("http://file/jobs"),
                status_endpoint: Some("http://file/status"),
                poll_interval_ms: Some(500),
                poll_timeout_ms: Some(9000),
            )"#,
        );
        let path = file.path().to_string_lossy().to_string();
        let cli = cli(&["--config", &path, "--interval-ms", "50"]);
        let env = |name: &str| match name {
            "IMPORT_JOB_ENDPOINT" => Some("http://env/jobs".to_string()),
            "IMPORT_POLL_INTERVAL_MS" => Some("700".to_string()),
            _ => None,
        };

        let settings = resolve_settings(&cli, env).unwrap();

        assert_eq!(settings.job_endpoint.as_deref(), Some("http://env/jobs"));
        assert_eq!(settings.status_endpoint.as_deref(), Some("http://file/status"));
        assert_eq!(settings.poll.interval, Duration::from_millis(50));
        assert_eq!(settings.poll.timeout, Duration::from_millis(9000));
    }

    #[test]
    fn missing_job_endpoint_is_rejected() {
        let err = resolve_settings(&cli(&[]), no_env).unwrap_err();
        assert!(err.to_string().contains("no job endpoint configured"));
    }

    #[test]
    fn unreadable_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.ron");
        let path = missing.to_string_lossy().to_string();

        assert!(resolve_settings(&cli(&["--config", &path]), no_env).is_err());
    }

    #[test]
    fn flags_alone_are_enough() {
        let settings =
            resolve_settings(&cli(&["--job-endpoint", "http://flag/jobs"]), no_env).unwrap();

        assert_eq!(settings.job_endpoint.as_deref(), Some("http://flag/jobs"));
        assert_eq!(settings.status_endpoint, None);
        assert_eq!(settings.poll, import_client::PollOptions::default());
    }
}
