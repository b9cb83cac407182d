//! Term-Sweep: a patient keyword-search campaign runner
//!
//! This crate runs multi-day search campaigns against a quota-limited search API,
//! storing every raw response in SQLite and extracting normalized URL records
//! from the stored payloads once the campaign is over.

pub mod campaign;
pub mod config;
pub mod input;
pub mod output;
pub mod provider;
pub mod storage;

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for Term-Sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many search terms for one day: {count} (max {max})")]
    Length { count: usize, max: usize },

    #[error("Provider error: {0}")]
    Provider(#[from] provider::ProviderError),

    #[error(
        "Sub-batch {batch} of {day} needs operator attention after {attempts} attempts: {last_error}"
    )]
    RetriesExhausted {
        day: NaiveDate,
        batch: usize,
        attempts: u32,
        last_error: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing credential: {0} must be provided as a non-empty string")]
    MissingCredential(&'static str),
}

/// Result type alias for Term-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use campaign::{BatchSearchExecutor, Campaign, SearchTerm, TermScheduler, WaitGate};
pub use config::Config;
pub use provider::{CseClient, Credentials, SearchProvider};
pub use storage::{ResponseStatus, SqliteStorage, Storage};
