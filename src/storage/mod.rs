//! Storage module for persisting campaign data
//!
//! This module handles all database operations for a campaign, including:
//! - SQLite database initialization and schema management
//! - Append-only response rows, one per searched term
//! - Derived URL records extracted from successful responses
//! - Sub-batch completion checkpoints for safe restarts
//! - Campaign run tracking

mod extract;
mod schema;
mod sqlite;
mod traits;

pub use extract::{
    extract_url_fields, ExtractedUrls, NOTE_NO_RESULTS, NOTE_UNEXPECTED, URL_SEPARATOR,
};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use serde_json::Value;

/// Outcome of one per-term query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    Success,
    Failure,
}

impl ResponseStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// A response row about to be written
#[derive(Debug, Clone, PartialEq)]
pub struct NewResponse {
    pub term_id: i64,
    pub term: String,
    pub status: ResponseStatus,
    pub payload: Option<Value>,
    pub error_message: Option<String>,
}

impl NewResponse {
    pub fn success(term_id: i64, term: impl Into<String>, payload: Value) -> Self {
        Self {
            term_id,
            term: term.into(),
            status: ResponseStatus::Success,
            payload: Some(payload),
            error_message: None,
        }
    }

    pub fn failure(term_id: i64, term: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            term_id,
            term: term.into(),
            status: ResponseStatus::Failure,
            payload: None,
            error_message: Some(message.into()),
        }
    }
}

/// A persisted response row
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub time: String,
    pub term_id: i64,
    pub term: String,
    pub status: ResponseStatus,
    /// Raw JSON text as returned by the provider
    pub response: Option<String>,
    pub exception: Option<String>,
}

/// A derived URL row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub time: String,
    pub term_id: i64,
    pub term: String,
    pub corrected_term: Option<String>,
    pub urls: Option<String>,
    pub notes: Option<String>,
}

/// Marker written when a sub-batch of a day has been committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCheckpoint {
    pub day: String,
    pub batch_index: usize,
    pub first_id: i64,
    pub last_id: i64,
    pub term_count: usize,
    pub completed_at: String,
}

/// Represents a campaign run
#[derive(Debug, Clone)]
pub struct CampaignRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: CampaignStatus,
}

/// Status of a campaign run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStatus {
    Running,
    Completed,
    Failed,
}

impl CampaignStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
