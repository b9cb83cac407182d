//! Configuration module for Term-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use term_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("campaign.toml")).unwrap();
//! println!("Terms per day: {}", config.campaign.daily_length);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CampaignConfig, Config, OutputConfig, PacingConfig, ProviderConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
