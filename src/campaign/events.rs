//! Campaign lifecycle events
//!
//! The campaign reports progress through an injected `EventSink` rather than
//! writing to the console itself.

use crate::campaign::DayReport;
use chrono::NaiveDate;
use std::sync::Mutex;
use std::time::Duration;

/// Structured lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub enum CampaignEvent {
    CampaignStarted {
        campaign_id: i64,
        terms: usize,
        days: usize,
        last_day: Option<NaiveDate>,
    },
    WaitingForDay {
        day: NaiveDate,
    },
    DayStarted {
        day: NaiveDate,
        terms: usize,
        batches: usize,
    },
    BatchSubmitted {
        day: NaiveDate,
        batch: usize,
        batches: usize,
        size: usize,
        attempt: u32,
    },
    BatchRetrying {
        day: NaiveDate,
        batch: usize,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    BatchCompleted {
        day: NaiveDate,
        batch: usize,
        succeeded: usize,
        failed: usize,
    },
    BatchSkipped {
        day: NaiveDate,
        batch: usize,
    },
    /// Retries are exhausted; the campaign stops here
    NeedsAttention {
        day: NaiveDate,
        batch: usize,
        attempts: u32,
        error: String,
    },
    DayCompleted(DayReport),
    ExtractionCompleted {
        url_records: usize,
    },
    CampaignCompleted {
        campaign_id: i64,
    },
    CampaignFailed {
        campaign_id: i64,
        error: String,
    },
}

/// Receives lifecycle events
pub trait EventSink: Send + Sync {
    fn record(&self, event: &CampaignEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &CampaignEvent) {
        match event {
            CampaignEvent::CampaignStarted {
                campaign_id,
                terms,
                days,
                last_day,
            } => {
                tracing::info!(
                    campaign_id,
                    terms,
                    days,
                    "Campaign started, will finish on {}",
                    last_day
                        .map(|d| d.format("%d %b %Y").to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
            CampaignEvent::WaitingForDay { day } => {
                tracing::info!("Waiting to start job scheduled on {}", day);
            }
            CampaignEvent::DayStarted {
                day,
                terms,
                batches,
            } => {
                tracing::info!(%day, terms, batches, "Starting daily job");
            }
            CampaignEvent::BatchSubmitted {
                day,
                batch,
                batches,
                size,
                attempt,
            } => {
                tracing::info!(
                    %day,
                    size,
                    attempt,
                    "Sub-batch {} out of {}",
                    batch + 1,
                    batches
                );
            }
            CampaignEvent::BatchRetrying {
                day,
                batch,
                attempt,
                delay,
                error,
            } => {
                tracing::warn!(
                    %day,
                    batch,
                    attempt,
                    "Transient fault ({}), retrying in {:?}",
                    error,
                    delay
                );
            }
            CampaignEvent::BatchCompleted {
                day,
                batch,
                succeeded,
                failed,
            } => {
                tracing::debug!(%day, batch, succeeded, failed, "Sub-batch saved");
            }
            CampaignEvent::BatchSkipped { day, batch } => {
                tracing::info!(%day, batch, "Sub-batch already completed, skipping");
            }
            CampaignEvent::NeedsAttention {
                day,
                batch,
                attempts,
                error,
            } => {
                tracing::error!(
                    %day,
                    batch,
                    attempts,
                    "Sub-batch needs operator attention: {}",
                    error
                );
            }
            CampaignEvent::DayCompleted(report) => {
                tracing::info!(
                    day = %report.day,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    retries = report.retries,
                    "Data retrieval completed"
                );
            }
            CampaignEvent::ExtractionCompleted { url_records } => {
                tracing::info!(url_records, "Extraction of URLs and corrected queries done");
            }
            CampaignEvent::CampaignCompleted { campaign_id } => {
                tracing::info!(campaign_id, "Campaign completed");
            }
            CampaignEvent::CampaignFailed { campaign_id, error } => {
                tracing::error!(campaign_id, "Campaign failed: {}", error);
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<CampaignEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<CampaignEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &CampaignEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
