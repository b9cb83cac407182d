//! Output module for reporting campaign results
//!
//! This module handles printing statistics gathered from the campaign database.

pub mod stats;

pub use stats::{load_statistics, print_statistics, CampaignStatistics};
