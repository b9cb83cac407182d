//! Campaign module for running search terms against the provider
//!
//! This module contains the core campaign logic, including:
//! - Partitioning the term universe into daily chunks and a calendar
//! - Waiting for the daily start hour
//! - Executing one day's chunk in paced sub-batches with bounded retry
//! - Orchestrating the whole campaign and the final URL extraction

mod events;
mod executor;
mod gate;
mod orchestrator;
mod scheduler;

pub use events::{CampaignEvent, EventSink, MemorySink, TracingSink};
pub use executor::{BatchSearchExecutor, DayReport, Pacing, RetryPolicy};
pub use gate::{time_until_hour, Clock, DailyTrigger, ImmediateTrigger, SystemClock, WaitGate};
pub use orchestrator::{backup_database, Campaign, CampaignReport};
pub use scheduler::TermScheduler;

/// A search term with its absolute position in the universe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    pub id: i64,
    pub text: String,
}

impl SearchTerm {
    pub fn new(id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Mints ids for an ordered universe from each term's position
    ///
    /// # Example
    ///
    /// ```
    /// use term_sweep::campaign::SearchTerm;
    ///
    /// let terms = SearchTerm::universe(vec!["a".to_string(), "b".to_string()]);
    /// assert_eq!(terms[1].id, 1);
    /// ```
    pub fn universe(texts: Vec<String>) -> Vec<SearchTerm> {
        texts
            .into_iter()
            .enumerate()
            .map(|(position, text)| SearchTerm::new(position as i64, text))
            .collect()
    }
}
