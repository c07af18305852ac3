//! Configuration schema definitions.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FerrogramConfig {
    /// Bot API credentials and endpoint.
    #[serde(default)]
    pub bot: BotConfig,

    /// Long-polling behaviour.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Bot API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Token issued by @BotFather. Usually supplied as `FERROGRAM_BOT__TOKEN`.
    #[serde(default)]
    pub token: String,

    /// Base URL of the Bot API server.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Timeout of a single API request in seconds. Must exceed the polling
    /// timeout, otherwise long polls are cut short.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BotConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

// =============================================================================
// Polling
// =============================================================================

/// How fetched updates are handed to the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One task per update; updates may be handled out of order.
    #[default]
    Concurrent,
    /// Updates are handled one after another in fetch order.
    Sequential,
}

/// Long-polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds the server holds a `getUpdates` call open.
    #[serde(default = "default_poll_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum updates per batch (1-100).
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Update kinds to receive; empty means the server default.
    #[serde(default)]
    pub allowed_updates: Vec<String>,

    #[serde(default)]
    pub mode: DispatchMode,

    /// Pause after a failed fetch, in seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_poll_timeout_secs(),
            limit: default_limit(),
            allowed_updates: Vec::new(),
            mode: DispatchMode::default(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl PollingConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn default_poll_timeout_secs() -> u64 {
    30
}

fn default_limit() -> u32 {
    100
}

fn default_retry_delay_secs() -> u64 {
    3
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `Full` without it.
    Json,
}

/// Where log lines are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Rotation of the log file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base level, overridden by `RUST_LOG` when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log file for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Per-target levels, e.g. `ferrogram_framework = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FerrogramConfig::default();
        assert_eq!(config.bot.api_url, "https://api.telegram.org");
        assert_eq!(config.polling.timeout_secs, 30);
        assert_eq!(config.polling.limit, 100);
        assert_eq!(config.polling.retry_delay(), Duration::from_secs(3));
        assert_eq!(config.polling.mode, DispatchMode::Concurrent);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: FerrogramConfig = serde_json::from_value(serde_json::json!({
            "bot": { "token": "123:abc" },
            "polling": { "mode": "sequential" },
            "logging": { "level": "debug", "filters": { "ferrogram_core": "trace" } }
        }))
        .unwrap();

        assert_eq!(config.bot.token, "123:abc");
        assert_eq!(config.bot.request_timeout_secs, 60);
        assert_eq!(config.polling.mode, DispatchMode::Sequential);
        assert_eq!(config.polling.limit, 100);
        assert_eq!(config.logging.level.to_tracing_level(), tracing::Level::DEBUG);
        assert_eq!(config.logging.filters["ferrogram_core"], LogLevel::Trace);
    }
}
