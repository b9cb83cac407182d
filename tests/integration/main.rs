//! Integration tests for Term-Sweep

mod campaign_tests;
mod provider_tests;
mod support;
