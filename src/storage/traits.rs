//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{
    BatchCheckpoint, CampaignRecord, CampaignStatus, NewResponse, ResponseRecord,
    ResponseStatus, UrlRecord,
};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage is closed")]
    Closed,

    #[error("Invalid response row: {0}")]
    InvalidRow(String),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writes are buffered in a pending transaction until `save` is called.
pub trait Storage {
    // ===== Table Lifecycle =====

    /// Creates the responses table if it does not exist yet
    fn create_response_table(&mut self) -> StorageResult<()>;

    /// Creates the urls table if it does not exist yet
    fn create_urls_table(&mut self) -> StorageResult<()>;

    /// Commits all pending writes
    fn save(&mut self) -> StorageResult<()>;

    /// Discards all pending writes
    fn rollback(&mut self) -> StorageResult<()>;

    /// Releases the underlying handle; later calls fail with `StorageError::Closed`
    fn close(&mut self) -> StorageResult<()>;

    // ===== Responses =====

    /// Validates and appends one response row, stamped with the current time
    fn write_response_row(&mut self, row: &NewResponse) -> StorageResult<()>;

    /// Gets all response rows in insertion order
    fn responses(&self) -> StorageResult<Vec<ResponseRecord>>;

    /// Counts response rows with the given status
    fn count_responses(&self, status: ResponseStatus) -> StorageResult<u64>;

    // ===== URL Extraction =====

    /// Derives URL records from every successful response and commits them
    ///
    /// # Returns
    ///
    /// The number of URL records inserted
    fn response_to_urls(&mut self) -> StorageResult<usize>;

    /// Gets all URL records in insertion order
    fn url_records(&self) -> StorageResult<Vec<UrlRecord>>;

    /// Counts URL records
    fn count_url_records(&self) -> StorageResult<u64>;

    /// Counts URL records carrying a note
    fn count_notes(&self) -> StorageResult<u64>;

    // ===== Sub-batch Checkpoints =====

    /// Records that a sub-batch was completed (part of the pending transaction)
    fn mark_batch_complete(
        &mut self,
        day: NaiveDate,
        batch_index: usize,
        first_id: i64,
        last_id: i64,
        term_count: usize,
    ) -> StorageResult<()>;

    /// Checks whether a sub-batch of a day was already completed
    fn is_batch_complete(&self, day: NaiveDate, batch_index: usize) -> StorageResult<bool>;

    /// Gets all completed sub-batches of a day
    fn completed_batches(&self, day: NaiveDate) -> StorageResult<Vec<BatchCheckpoint>>;

    // ===== Campaign Runs =====

    /// Creates a new campaign run
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_campaign(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Sets the final status and finish timestamp of a run
    fn finish_campaign(&mut self, campaign_id: i64, status: CampaignStatus)
        -> StorageResult<()>;

    /// Gets a run by ID
    fn get_campaign(&self, campaign_id: i64) -> StorageResult<CampaignRecord>;

    /// Gets the most recent run
    fn latest_campaign(&self) -> StorageResult<Option<CampaignRecord>>;
}
