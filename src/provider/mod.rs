//! Search provider module
//!
//! This module defines the seam between the campaign and the external search API:
//! - Provider ceilings (daily quota, batch size, result count)
//! - The `SearchProvider` trait for batched submissions
//! - Credentials and per-query request/response types
//! - A reqwest-based Google Custom Search client

mod cse;
mod payload;

pub use cse::{build_http_client, CseClient};
pub use payload::{SearchItem, SearchPayload, Spelling};

use crate::ConfigError;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Maximum number of queries the provider accepts per day
pub const MAX_DAILY_SEARCHES: usize = 10_000;

/// Maximum number of queries bundled in one batched request
pub const MAX_BATCH_SIZE: usize = 100;

/// Maximum number of results the provider returns per query
pub const MAX_RESULTS_PER_QUERY: u32 = 10;

/// Default pause between sub-batches (provider response-rate ceiling)
pub const DEFAULT_BATCH_INTERVAL_MS: u64 = 100_000;

/// Default delay before resubmitting after a transient fault
pub const DEFAULT_RETRY_DELAY_MS: u64 = 60_000;

/// Default ceiling for the exponential retry delay
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 960_000;

/// Default number of submission attempts per sub-batch
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Default Custom Search JSON API endpoint
pub const DEFAULT_CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Errors affecting a whole batched submission
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Connectivity fault; the same batch may be resubmitted
    #[error("transient connectivity fault: {0}")]
    Transient(String),

    /// The batch cannot succeed as submitted
    #[error("fatal provider fault: {0}")]
    Fatal(String),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// API credentials for one campaign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    cse_id: String,
}

impl Credentials {
    /// Builds credentials, rejecting absent or blank values
    ///
    /// # Example
    ///
    /// ```
    /// use term_sweep::provider::Credentials;
    ///
    /// assert!(Credentials::new(Some("key"), Some("engine")).is_ok());
    /// assert!(Credentials::new(None, Some("engine")).is_err());
    /// ```
    pub fn new(api_key: Option<&str>, cse_id: Option<&str>) -> Result<Self, ConfigError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingCredential("api_key"))?;
        let cse_id = cse_id
            .filter(|c| !c.trim().is_empty())
            .ok_or(ConfigError::MissingCredential("cse_id"))?;

        Ok(Self {
            api_key: api_key.to_string(),
            cse_id: cse_id.to_string(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn cse_id(&self) -> &str {
        &self.cse_id
    }
}

/// One query inside a batched submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchQuery {
    /// Sequential id, unique within the submission (0-based)
    pub request_id: usize,

    /// Query text
    pub text: String,

    /// Number of results requested
    pub result_count: u32,

    /// Custom search engine (collection) identifier
    pub collection_id: String,
}

/// Outcome of one query inside an otherwise successful batched call
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    pub request_id: usize,
    pub outcome: std::result::Result<Value, String>,
}

impl QueryResponse {
    pub fn success(request_id: usize, payload: Value) -> Self {
        Self {
            request_id,
            outcome: Ok(payload),
        }
    }

    pub fn failure(request_id: usize, message: impl Into<String>) -> Self {
        Self {
            request_id,
            outcome: Err(message.into()),
        }
    }
}

/// A search backend able to run many independent queries as one logical call
///
/// Implementations report per-query faults inside the returned vector and reserve
/// `Err` for faults that affect the whole submission.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn execute_batch(
        &self,
        credentials: &Credentials,
        queries: &[BatchQuery],
    ) -> std::result::Result<Vec<QueryResponse>, ProviderError>;
}
