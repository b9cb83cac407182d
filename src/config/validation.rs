use crate::config::types::{CampaignConfig, Config, OutputConfig, PacingConfig, ProviderConfig};
use crate::provider::{MAX_BATCH_SIZE, MAX_DAILY_SEARCHES, MAX_RESULTS_PER_QUERY};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_campaign_config(&config.campaign)?;
    validate_provider_config(&config.provider)?;
    validate_pacing_config(&config.pacing)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates campaign scheduling configuration
fn validate_campaign_config(config: &CampaignConfig) -> Result<(), ConfigError> {
    if config.daily_length < 1 || config.daily_length > MAX_DAILY_SEARCHES {
        return Err(ConfigError::Validation(format!(
            "daily_length must be between 1 and {}, got {}",
            MAX_DAILY_SEARCHES, config.daily_length
        )));
    }

    if config.results_per_term < 1 || config.results_per_term > MAX_RESULTS_PER_QUERY {
        return Err(ConfigError::Validation(format!(
            "results_per_term must be between 1 and {}, got {}",
            MAX_RESULTS_PER_QUERY, config.results_per_term
        )));
    }

    if config.start_hour > 23 {
        return Err(ConfigError::Validation(format!(
            "start_hour must be between 0 and 23, got {}",
            config.start_hour
        )));
    }

    if config.recheck_interval_minutes < 1 || config.recheck_interval_minutes > 60 {
        return Err(ConfigError::Validation(format!(
            "recheck_interval_minutes must be between 1 and 60, got {}",
            config.recheck_interval_minutes
        )));
    }

    Ok(())
}

/// Validates provider configuration
///
/// Credentials are optional here because they may be supplied on the command line;
/// when present they must not be blank.
fn validate_provider_config(config: &ProviderConfig) -> Result<(), ConfigError> {
    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint: {}", e)))?;

    if endpoint.scheme() != "https" && endpoint.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' must use HTTP or HTTPS",
            config.endpoint
        )));
    }

    if matches!(&config.api_key, Some(key) if key.trim().is_empty()) {
        return Err(ConfigError::MissingCredential("api_key"));
    }

    if matches!(&config.cse_id, Some(id) if id.trim().is_empty()) {
        return Err(ConfigError::MissingCredential("cse_id"));
    }

    if config.request_timeout < 1 {
        return Err(ConfigError::Validation(
            "request_timeout must be >= 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates pacing and retry configuration
fn validate_pacing_config(config: &PacingConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.retry_max_delay_ms < config.retry_initial_delay_ms {
        return Err(ConfigError::Validation(format!(
            "retry_max_delay_ms ({}) must be >= retry_initial_delay_ms ({})",
            config.retry_max_delay_ms, config.retry_initial_delay_ms
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.backup_dir, Some(dir) if dir.is_empty()) {
        return Err(ConfigError::Validation(
            "backup_dir cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}
