//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, FerrogramConfig, LogOutput, LoggingConfig, PollingConfig};

/// Validates the entire configuration.
///
/// An empty token is accepted here; it is only required once the runtime
/// builds an HTTP client.
pub fn validate_config(config: &FerrogramConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_polling_config(&config.polling)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    validate_url(&bot.api_url)?;

    if bot.token.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation("Bot token cannot contain whitespace"));
    }

    if bot.request_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "Request timeout must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_polling_config(polling: &PollingConfig) -> ConfigResult<()> {
    if !(1..=100).contains(&polling.limit) {
        return Err(ConfigError::validation(format!(
            "Polling limit must be between 1 and 100, got {}",
            polling.limit
        )));
    }

    if polling.retry_delay_secs == 0 {
        return Err(ConfigError::validation(
            "Retry delay must be greater than 0",
        ));
    }

    Ok(())
}

/// The request timeout has to outlive a long poll.
pub fn validate_timeouts(config: &FerrogramConfig) -> ConfigResult<()> {
    if config.bot.request_timeout_secs <= config.polling.timeout_secs {
        return Err(ConfigError::validation(format!(
            "Request timeout ({}s) must exceed the polling timeout ({}s)",
            config.bot.request_timeout_secs, config.polling.timeout_secs
        )));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

fn validate_url(url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing_field("bot.api_url"));
    }

    let valid_schemes = ["http://", "https://"];
    if !valid_schemes.iter().any(|s| url.starts_with(s)) {
        return Err(ConfigError::invalid_url(
            url,
            format!("URL must start with one of: {:?}", valid_schemes),
        ));
    }

    if url.ends_with('/') {
        return Err(ConfigError::invalid_url(url, "URL must not end with '/'"));
    }

    Ok(())
}
