//! Statistics generation from the campaign database
//!
//! This module provides functionality for extracting and displaying
//! campaign statistics from the storage layer.

use crate::storage::{CampaignRecord, ResponseStatus, Storage};
use crate::SweepError;

/// Campaign statistics summary
#[derive(Debug, Clone)]
pub struct CampaignStatistics {
    /// Response rows with a payload
    pub succeeded: u64,

    /// Response rows with an error message
    pub failed: u64,

    /// Rows in the urls table
    pub url_records: u64,

    /// URL records carrying a note instead of links
    pub notes: u64,

    /// Most recent campaign run, if any
    pub latest_campaign: Option<CampaignRecord>,
}

impl CampaignStatistics {
    pub fn total_responses(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Share of responses that succeeded, in percent
    pub fn success_rate(&self) -> f64 {
        let total = self.total_responses();
        if total > 0 {
            (self.succeeded as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Loads statistics from storage
///
/// Both data tables must exist.
pub fn load_statistics(storage: &dyn Storage) -> Result<CampaignStatistics, SweepError> {
    Ok(CampaignStatistics {
        succeeded: storage.count_responses(ResponseStatus::Success)?,
        failed: storage.count_responses(ResponseStatus::Failure)?,
        url_records: storage.count_url_records()?,
        notes: storage.count_notes()?,
        latest_campaign: storage.latest_campaign()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CampaignStatistics) {
    println!("=== Campaign Statistics ===\n");

    println!("Responses:");
    println!("  Total: {}", stats.total_responses());
    println!("  Succeeded: {}", stats.succeeded);
    println!("  Failed: {}", stats.failed);
    println!("  Success rate: {:.1}%", stats.success_rate());
    println!();

    println!("URL Records:");
    println!("  Total: {}", stats.url_records);
    println!("  With notes: {}", stats.notes);
    println!();

    match &stats.latest_campaign {
        Some(run) => {
            println!("Latest Campaign:");
            println!("  ID: {}", run.id);
            println!("  Status: {}", run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
        }
        None => println!("No campaign runs recorded"),
    }
}
