//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::extract::extract_url_fields;
use crate::storage::schema::{initialize_schema, RESPONSES_TABLE_SQL, URLS_TABLE_SQL};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    BatchCheckpoint, CampaignRecord, CampaignStatus, NewResponse, ResponseRecord,
    ResponseStatus, UrlRecord,
};
use crate::SweepError;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
///
/// Writes open a transaction lazily; `save` commits it. Dropping or closing the
/// storage with a pending transaction rolls it back.
pub struct SqliteStorage {
    conn: Option<Connection>,
}

impl SqliteStorage {
    /// Opens or creates a database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SweepError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SweepError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn: Some(conn) })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SweepError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::Closed)
    }

    /// Opens the pending transaction if none is active
    fn begin_pending(&self) -> StorageResult<&Connection> {
        let conn = self.conn()?;
        if conn.is_autocommit() {
            conn.execute_batch("BEGIN")?;
        }
        Ok(conn)
    }
}

/// Checks the five logical fields of a response row
fn validate_row(row: &NewResponse) -> StorageResult<()> {
    if row.term_id < 0 {
        return Err(StorageError::InvalidRow(format!(
            "term id must be non-negative, got {}",
            row.term_id
        )));
    }

    match (row.status, &row.payload, &row.error_message) {
        (ResponseStatus::Success, Some(_), None) => Ok(()),
        (ResponseStatus::Failure, None, Some(message)) if !message.is_empty() => Ok(()),
        (ResponseStatus::Success, _, _) => Err(StorageError::InvalidRow(format!(
            "success row for id {} needs a payload and no error message",
            row.term_id
        ))),
        (ResponseStatus::Failure, _, _) => Err(StorageError::InvalidRow(format!(
            "failure row for id {} needs an error message and no payload",
            row.term_id
        ))),
    }
}

fn read_response(row: &rusqlite::Row<'_>) -> rusqlite::Result<ResponseRecord> {
    Ok(ResponseRecord {
        time: row.get(0)?,
        term_id: row.get(1)?,
        term: row.get(2)?,
        status: ResponseStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(ResponseStatus::Failure),
        response: row.get(4)?,
        exception: row.get(5)?,
    })
}

fn read_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<CampaignRecord> {
    Ok(CampaignRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: CampaignStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(CampaignStatus::Running),
    })
}

impl Storage for SqliteStorage {
    // ===== Table Lifecycle =====

    fn create_response_table(&mut self) -> StorageResult<()> {
        self.conn()?.execute_batch(RESPONSES_TABLE_SQL)?;
        self.save()
    }

    fn create_urls_table(&mut self) -> StorageResult<()> {
        self.conn()?.execute_batch(URLS_TABLE_SQL)?;
        self.save()
    }

    fn save(&mut self) -> StorageResult<()> {
        let conn = self.conn()?;
        if !conn.is_autocommit() {
            conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        let conn = self.conn()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        let conn = self.conn.take().ok_or(StorageError::Closed)?;
        if !conn.is_autocommit() {
            tracing::warn!("Closing storage with uncommitted writes; they will be discarded");
        }
        conn.close().map_err(|(_, e)| StorageError::Sqlite(e))
    }

    // ===== Responses =====

    fn write_response_row(&mut self, row: &NewResponse) -> StorageResult<()> {
        validate_row(row)?;

        let response = row
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        self.begin_pending()?.execute(
            "INSERT INTO responses (time, id, term, status, response, exception)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                now,
                row.term_id,
                row.term,
                row.status.to_db_string(),
                response,
                row.error_message
            ],
        )?;
        Ok(())
    }

    fn responses(&self) -> StorageResult<Vec<ResponseRecord>> {
        let mut stmt = self.conn()?.prepare(
            "SELECT time, id, term, status, response, exception FROM responses ORDER BY rowid",
        )?;

        let rows = stmt
            .query_map([], read_response)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn count_responses(&self, status: ResponseStatus) -> StorageResult<u64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM responses WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== URL Extraction =====

    fn response_to_urls(&mut self) -> StorageResult<usize> {
        let successes: Vec<(String, i64, String, Option<String>)> = {
            let mut stmt = self.conn()?.prepare(
                "SELECT time, id, term, response FROM responses WHERE status = ?1 ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map(params![ResponseStatus::Success.to_db_string()], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut derived = Vec::with_capacity(successes.len());
        for (time, term_id, term, response) in successes {
            let Some(raw) = response else {
                tracing::warn!("Success row for term {} has no payload, skipping", term_id);
                continue;
            };
            match extract_url_fields(&raw) {
                Ok(fields) => derived.push(UrlRecord {
                    time,
                    term_id,
                    term,
                    corrected_term: fields.corrected_term,
                    urls: fields.urls,
                    notes: fields.note,
                }),
                Err(e) => {
                    tracing::warn!("Unparseable payload for term {}: {}", term_id, e);
                }
            }
        }

        {
            let conn = self.begin_pending()?;
            let mut stmt = conn.prepare(
                "INSERT INTO urls (time, id, term, correctedTerm, urls, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for record in &derived {
                stmt.execute(params![
                    record.time,
                    record.term_id,
                    record.term,
                    record.corrected_term,
                    record.urls,
                    record.notes
                ])?;
            }
        }
        self.save()?;

        Ok(derived.len())
    }

    fn url_records(&self) -> StorageResult<Vec<UrlRecord>> {
        let mut stmt = self.conn()?.prepare(
            "SELECT time, id, term, correctedTerm, urls, notes FROM urls ORDER BY rowid",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(UrlRecord {
                    time: row.get(0)?,
                    term_id: row.get(1)?,
                    term: row.get(2)?,
                    corrected_term: row.get(3)?,
                    urls: row.get(4)?,
                    notes: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn count_url_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_notes(&self) -> StorageResult<u64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM urls WHERE notes IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Sub-batch Checkpoints =====

    fn mark_batch_complete(
        &mut self,
        day: NaiveDate,
        batch_index: usize,
        first_id: i64,
        last_id: i64,
        term_count: usize,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.begin_pending()?.execute(
            "INSERT OR REPLACE INTO batch_checkpoints
             (day, batch_index, first_id, last_id, term_count, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                day.format("%Y-%m-%d").to_string(),
                batch_index as i64,
                first_id,
                last_id,
                term_count as i64,
                now
            ],
        )?;
        Ok(())
    }

    fn is_batch_complete(&self, day: NaiveDate, batch_index: usize) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT 1 FROM batch_checkpoints WHERE day = ?1 AND batch_index = ?2",
                params![day.format("%Y-%m-%d").to_string(), batch_index as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn completed_batches(&self, day: NaiveDate) -> StorageResult<Vec<BatchCheckpoint>> {
        let mut stmt = self.conn()?.prepare(
            "SELECT day, batch_index, first_id, last_id, term_count, completed_at
             FROM batch_checkpoints WHERE day = ?1 ORDER BY batch_index",
        )?;

        let checkpoints = stmt
            .query_map(params![day.format("%Y-%m-%d").to_string()], |row| {
                Ok(BatchCheckpoint {
                    day: row.get(0)?,
                    batch_index: row.get::<_, i64>(1)? as usize,
                    first_id: row.get(2)?,
                    last_id: row.get(3)?,
                    term_count: row.get::<_, i64>(4)? as usize,
                    completed_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(checkpoints)
    }

    // ===== Campaign Runs =====

    fn create_campaign(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO campaigns (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, CampaignStatus::Running.to_db_string()],
        )?;
        let id = conn.last_insert_rowid();
        self.save()?;
        Ok(id)
    }

    fn finish_campaign(
        &mut self,
        campaign_id: i64,
        status: CampaignStatus,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn()?.execute(
            "UPDATE campaigns SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, campaign_id],
        )?;
        if updated == 0 {
            return Err(StorageError::CampaignNotFound(campaign_id));
        }
        self.save()
    }

    fn get_campaign(&self, campaign_id: i64) -> StorageResult<CampaignRecord> {
        self.conn()?
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM campaigns WHERE id = ?1",
                params![campaign_id],
                read_campaign,
            )
            .optional()?
            .ok_or(StorageError::CampaignNotFound(campaign_id))
    }

    fn latest_campaign(&self) -> StorageResult<Option<CampaignRecord>> {
        let campaign = self
            .conn()?
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM campaigns ORDER BY id DESC LIMIT 1",
                [],
                read_campaign,
            )
            .optional()?;
        Ok(campaign)
    }
}
