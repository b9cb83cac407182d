use crate::provider::{
    DEFAULT_BATCH_INTERVAL_MS, DEFAULT_CSE_ENDPOINT, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS, MAX_BATCH_SIZE,
};
use chrono::NaiveDate;
use serde::Deserialize;

/// Main configuration structure for Term-Sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub campaign: CampaignConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    pub output: OutputConfig,
}

/// Campaign scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignConfig {
    /// Number of terms searched per calendar day
    #[serde(rename = "daily-length")]
    pub daily_length: usize,

    /// Number of results requested per term
    #[serde(rename = "results-per-term")]
    pub results_per_term: u32,

    /// Local hour of day at which each daily job starts
    #[serde(rename = "start-hour")]
    pub start_hour: u32,

    /// Minutes to sleep before re-reading the clock when the start hour is missed
    #[serde(rename = "recheck-interval-minutes")]
    pub recheck_interval_minutes: u32,

    /// First calendar day of the campaign (defaults to today)
    #[serde(rename = "start-date", default)]
    pub start_date: Option<NaiveDate>,
}

/// Search provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Custom Search JSON API endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API key (may also be given on the command line)
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Custom search engine identifier (may also be given on the command line)
    #[serde(rename = "cse-id", default)]
    pub cse_id: Option<String>,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,
}

/// Pacing and retry configuration
///
/// All durations are in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct PacingConfig {
    /// Maximum number of terms bundled in one batched request
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between two sub-batches
    #[serde(rename = "batch-interval-ms", default = "default_batch_interval")]
    pub batch_interval_ms: u64,

    /// Delay before the first resubmission after a transient fault
    #[serde(rename = "retry-initial-delay-ms", default = "default_retry_delay")]
    pub retry_initial_delay_ms: u64,

    /// Upper bound for the exponential backoff delay
    #[serde(rename = "retry-max-delay-ms", default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,

    /// Total submission attempts per sub-batch before giving up
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_interval_ms: default_batch_interval(),
            retry_initial_delay_ms: default_retry_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory receiving a copy of the finished database
    #[serde(rename = "backup-dir", default)]
    pub backup_dir: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_CSE_ENDPOINT.to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_batch_interval() -> u64 {
    DEFAULT_BATCH_INTERVAL_MS
}

fn default_retry_delay() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_retry_max_delay() -> u64 {
    DEFAULT_RETRY_MAX_DELAY_MS
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
