//! Daily batch executor
//!
//! This module runs one day's chunk against the search provider:
//! - Splitting the chunk into sub-batches within the per-call ceiling
//! - Bounded exponential backoff on transient connectivity faults
//! - Recording every per-term outcome, success or failure
//! - Committing each sub-batch together with its completion checkpoint
//! - Pausing between sub-batches to respect the provider's response rate

use crate::campaign::{CampaignEvent, EventSink, SearchTerm, TracingSink};
use crate::config::PacingConfig;
use crate::provider::{
    BatchQuery, Credentials, ProviderError, QueryResponse, SearchProvider,
    DEFAULT_BATCH_INTERVAL_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_RETRY_MAX_DELAY_MS, MAX_BATCH_SIZE, MAX_DAILY_SEARCHES, MAX_RESULTS_PER_QUERY,
};
use crate::storage::{NewResponse, Storage};
use crate::{Result, SweepError};
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Bounded exponential backoff for transient faults
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total submission attempts per sub-batch, including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): doubles each time, capped at `max_delay`
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
        }
    }
}

/// Sub-batch sizing and timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    pub batch_size: usize,
    pub batch_interval: Duration,
    pub retry: RetryPolicy,
}

impl Pacing {
    pub fn from_config(config: &PacingConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            batch_interval: Duration::from_millis(config.batch_interval_ms),
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
                max_delay: Duration::from_millis(config.retry_max_delay_ms),
            },
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            batch_interval: Duration::from_millis(DEFAULT_BATCH_INTERVAL_MS),
            retry: RetryPolicy::default(),
        }
    }
}

/// Summary of one day's execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    pub day: NaiveDate,
    pub batches_total: usize,
    pub batches_submitted: usize,
    pub batches_skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub retries: u32,
}

/// Executes one day's chunk of terms
pub struct BatchSearchExecutor<'a, S: Storage> {
    terms: &'a [SearchTerm],
    store: &'a mut S,
    day: NaiveDate,
    pacing: Pacing,
    events: Arc<dyn EventSink>,
}

impl<'a, S: Storage> BatchSearchExecutor<'a, S> {
    /// Creates an executor for the chunk scheduled on `day`
    ///
    /// # Returns
    ///
    /// * `Err(SweepError::Length)` - The chunk exceeds the provider's daily quota
    pub fn new(terms: &'a [SearchTerm], store: &'a mut S, day: NaiveDate) -> Result<Self> {
        if terms.len() > MAX_DAILY_SEARCHES {
            return Err(SweepError::Length {
                count: terms.len(),
                max: MAX_DAILY_SEARCHES,
            });
        }

        Ok(Self {
            terms,
            store,
            day,
            pacing: Pacing::default(),
            events: Arc::new(TracingSink),
        })
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Searches every term of the chunk
    ///
    /// Sub-batches already checkpointed for this day are skipped. Each submitted
    /// sub-batch is committed with its checkpoint before the next one starts.
    ///
    /// # Arguments
    ///
    /// * `provider` - The search backend
    /// * `n_results` - Results requested per term (1-10)
    /// * `credentials` - Validated API key and engine id
    pub async fn search<P>(
        &mut self,
        provider: &P,
        n_results: u32,
        credentials: &Credentials,
    ) -> Result<DayReport>
    where
        P: SearchProvider + ?Sized,
    {
        if n_results < 1 || n_results > MAX_RESULTS_PER_QUERY {
            return Err(SweepError::Validation(format!(
                "n_results must be between 1 and {}, got {}",
                MAX_RESULTS_PER_QUERY, n_results
            )));
        }

        if self.pacing.batch_size < 1 || self.pacing.batch_size > MAX_BATCH_SIZE {
            return Err(SweepError::Validation(format!(
                "batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, self.pacing.batch_size
            )));
        }

        let batches: Vec<&[SearchTerm]> = self.terms.chunks(self.pacing.batch_size).collect();
        let mut report = DayReport {
            day: self.day,
            batches_total: batches.len(),
            batches_submitted: 0,
            batches_skipped: 0,
            succeeded: 0,
            failed: 0,
            retries: 0,
        };

        self.events.record(&CampaignEvent::DayStarted {
            day: self.day,
            terms: self.terms.len(),
            batches: batches.len(),
        });

        for (index, batch) in batches.iter().enumerate() {
            if self.store.is_batch_complete(self.day, index)? {
                report.batches_skipped += 1;
                self.events.record(&CampaignEvent::BatchSkipped {
                    day: self.day,
                    batch: index,
                });
                continue;
            }

            if report.batches_submitted > 0 && !self.pacing.batch_interval.is_zero() {
                tokio::time::sleep(self.pacing.batch_interval).await;
            }

            let queries: Vec<BatchQuery> = batch
                .iter()
                .enumerate()
                .map(|(request_id, term)| BatchQuery {
                    request_id,
                    text: term.text.clone(),
                    result_count: n_results,
                    collection_id: credentials.cse_id().to_string(),
                })
                .collect();

            let responses = self
                .submit_with_retry(provider, credentials, index, batches.len(), &queries, &mut report)
                .await?;

            let rows = match_outcomes(batch, responses);
            let failed = rows.iter().filter(|row| row.payload.is_none()).count();
            let succeeded = rows.len() - failed;

            if let Err(e) = self.commit_batch(batch, index, &rows) {
                // Rows of a sub-batch are only kept together with its checkpoint
                if let Err(rollback_err) = self.store.rollback() {
                    tracing::error!(
                        "Failed to discard sub-batch {} of {}: {}",
                        index,
                        self.day,
                        rollback_err
                    );
                }
                return Err(e);
            }

            report.batches_submitted += 1;
            report.succeeded += succeeded;
            report.failed += failed;

            self.events.record(&CampaignEvent::BatchCompleted {
                day: self.day,
                batch: index,
                succeeded,
                failed,
            });
        }

        self.events
            .record(&CampaignEvent::DayCompleted(report.clone()));

        Ok(report)
    }

    /// Writes a sub-batch's rows and checkpoint, then commits them
    fn commit_batch(
        &mut self,
        batch: &[SearchTerm],
        index: usize,
        rows: &[NewResponse],
    ) -> Result<()> {
        for row in rows {
            self.store.write_response_row(row)?;
        }
        if let (Some(first), Some(last)) = (batch.first(), batch.last()) {
            self.store
                .mark_batch_complete(self.day, index, first.id, last.id, batch.len())?;
        }
        self.store.save()?;
        Ok(())
    }

    /// Submits one sub-batch until it succeeds or the retry policy gives up
    ///
    /// Nothing is recorded for a failed attempt, so a resubmission cannot
    /// duplicate rows.
    async fn submit_with_retry<P>(
        &self,
        provider: &P,
        credentials: &Credentials,
        index: usize,
        batches: usize,
        queries: &[BatchQuery],
        report: &mut DayReport,
    ) -> Result<Vec<QueryResponse>>
    where
        P: SearchProvider + ?Sized,
    {
        let max_attempts = self.pacing.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            self.events.record(&CampaignEvent::BatchSubmitted {
                day: self.day,
                batch: index,
                batches,
                size: queries.len(),
                attempt,
            });

            match provider.execute_batch(credentials, queries).await {
                Ok(responses) => return Ok(responses),
                Err(ProviderError::Transient(error)) if attempt < max_attempts => {
                    let delay = self.pacing.retry.delay_for(attempt);
                    self.events.record(&CampaignEvent::BatchRetrying {
                        day: self.day,
                        batch: index,
                        attempt,
                        delay,
                        error,
                    });
                    report.retries += 1;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(ProviderError::Transient(error)) => {
                    self.events.record(&CampaignEvent::NeedsAttention {
                        day: self.day,
                        batch: index,
                        attempts: attempt,
                        error: error.clone(),
                    });
                    return Err(SweepError::RetriesExhausted {
                        day: self.day,
                        batch: index,
                        attempts: attempt,
                        last_error: error,
                    });
                }
                Err(fatal) => return Err(fatal.into()),
            }
        }
    }
}

/// Pairs provider outcomes with the sub-batch's terms, in submission order
///
/// A term without an outcome is recorded as a failure; unknown or repeated request
/// ids are dropped.
fn match_outcomes(batch: &[SearchTerm], responses: Vec<QueryResponse>) -> Vec<NewResponse> {
    let mut outcomes: Vec<Option<std::result::Result<Value, String>>> = vec![None; batch.len()];

    for response in responses {
        match outcomes.get_mut(response.request_id) {
            Some(slot) if slot.is_none() => *slot = Some(response.outcome),
            Some(_) => tracing::warn!(
                "Duplicate outcome for request {}, keeping the first",
                response.request_id
            ),
            None => tracing::warn!(
                "Outcome for unknown request {} ignored",
                response.request_id
            ),
        }
    }

    batch
        .iter()
        .zip(outcomes)
        .enumerate()
        .map(|(request_id, (term, outcome))| match outcome {
            Some(Ok(payload)) => NewResponse::success(term.id, term.text.clone(), payload),
            Some(Err(message)) if !message.is_empty() => {
                NewResponse::failure(term.id, term.text.clone(), message)
            }
            Some(Err(_)) => NewResponse::failure(term.id, term.text.clone(), "unknown error"),
            None => NewResponse::failure(
                term.id,
                term.text.clone(),
                format!("no response returned for request {}", request_id),
            ),
        })
        .collect()
}
