//! Term scheduler for splitting the universe into daily chunks
//!
//! This module handles:
//! - Slicing the ordered universe into consecutive runs of at most `daily_length`
//! - Computing the execution calendar, one day per run
//! - Looking up the chunk scheduled for a given date

use crate::campaign::SearchTerm;
use crate::provider::MAX_DAILY_SEARCHES;
use crate::{Result, SweepError};
use chrono::{Days, Local, NaiveDate};

/// Date key format used by `daily_task`
const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Partitions a term universe over a calendar of execution dates
///
/// Chunks are disjoint, consecutive and in universe order; chunk `i` is scheduled on
/// `epoch + i` days.
#[derive(Debug, Clone)]
pub struct TermScheduler {
    terms: Vec<SearchTerm>,
    daily_length: usize,
    calendar: Vec<NaiveDate>,
}

impl TermScheduler {
    /// Creates a scheduler over raw term texts, minting ids from their positions
    ///
    /// # Arguments
    ///
    /// * `universe` - Ordered term texts (duplicates allowed)
    /// * `daily_length` - Maximum number of terms per day
    /// * `start_date` - First calendar day; defaults to today (local time)
    ///
    /// # Example
    ///
    /// ```
    /// use term_sweep::campaign::TermScheduler;
    ///
    /// let universe = (0..25).map(|i| format!("term {}", i)).collect();
    /// let scheduler = TermScheduler::new(universe, 10, None).unwrap();
    /// assert_eq!(scheduler.calendar().len(), 3);
    /// ```
    pub fn new(
        universe: Vec<String>,
        daily_length: usize,
        start_date: Option<NaiveDate>,
    ) -> Result<Self> {
        Self::from_terms(SearchTerm::universe(universe), daily_length, start_date)
    }

    /// Creates a scheduler over terms whose ids were minted by the caller
    pub fn from_terms(
        terms: Vec<SearchTerm>,
        daily_length: usize,
        start_date: Option<NaiveDate>,
    ) -> Result<Self> {
        if daily_length < 1 || daily_length > MAX_DAILY_SEARCHES {
            return Err(SweepError::Validation(format!(
                "daily_length must be between 1 and {}, got {}",
                MAX_DAILY_SEARCHES, daily_length
            )));
        }

        if let Some(term) = terms.iter().find(|t| t.id < 0) {
            return Err(SweepError::Validation(format!(
                "term ids must be non-negative, got {:?}",
                term
            )));
        }

        let epoch = start_date.unwrap_or_else(|| Local::now().date_naive());
        let days_required = terms.len().div_ceil(daily_length);

        let calendar = (0..days_required)
            .map(|offset| {
                epoch
                    .checked_add_days(Days::new(offset as u64))
                    .ok_or_else(|| {
                        SweepError::Validation(format!(
                            "calendar overflows the date range after {} days",
                            offset
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            terms,
            daily_length,
            calendar,
        })
    }

    /// Returns the terms scheduled for a `YYYY-MM-DD` date key
    ///
    /// # Returns
    ///
    /// * `Ok(&[SearchTerm])` - The day's chunk, in universe order
    /// * `Err(SweepError::NotFound)` - The key is malformed or outside the calendar
    pub fn daily_task(&self, date_key: &str) -> Result<&[SearchTerm]> {
        let day = NaiveDate::parse_from_str(date_key, DATE_KEY_FORMAT).map_err(|_| {
            SweepError::NotFound(format!("'{}' is not a scheduled date", date_key))
        })?;
        self.daily_task_for(day)
    }

    /// Returns the terms scheduled for a date
    pub fn daily_task_for(&self, day: NaiveDate) -> Result<&[SearchTerm]> {
        let index = self
            .calendar
            .iter()
            .position(|d| *d == day)
            .ok_or_else(|| SweepError::NotFound(format!("{} is not a scheduled date", day)))?;

        let start = index * self.daily_length;
        let end = (start + self.daily_length).min(self.terms.len());
        Ok(&self.terms[start..end])
    }

    /// All execution dates, in order
    pub fn calendar(&self) -> &[NaiveDate] {
        &self.calendar
    }

    /// The date the campaign finishes on
    pub fn last_day(&self) -> Option<NaiveDate> {
        self.calendar.last().copied()
    }

    pub fn days_required(&self) -> usize {
        self.calendar.len()
    }

    pub fn daily_length(&self) -> usize {
        self.daily_length
    }

    /// Number of terms in the universe
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
