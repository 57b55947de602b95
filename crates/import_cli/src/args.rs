use std::path::PathBuf;

use clap::Parser;

/// property-import - submit a listing import and wait for its result
#[derive(Parser, Debug)]
#[command(name = "property-import")]
#[command(version)]
#[command(about = "Submit a property import job and poll it until it settles", long_about = None)]
pub struct Cli {
    /// Listing URL to import
    #[arg(short = 'u', long = "url")]
    pub url: String,

    /// User the import is submitted for
    #[arg(long = "user")]
    pub user: String,

    /// Job creation endpoint (overrides config file and IMPORT_JOB_ENDPOINT)
    #[arg(long = "job-endpoint")]
    pub job_endpoint: Option<String>,

    /// Job status endpoint (defaults to the job endpoint)
    #[arg(long = "status-endpoint")]
    pub status_endpoint: Option<String>,

    /// Milliseconds between status requests
    #[arg(long = "interval-ms")]
    pub interval_ms: Option<u64>,

    /// Milliseconds before polling gives up
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// RON settings file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Write the import result JSON here instead of stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}
