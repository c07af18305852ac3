//! Configuration module for the Ferrogram runtime.
//!
//! This module provides layered configuration loading (defaults, TOML files,
//! `FERROGRAM_*` environment variables) and validation for the bot
//! credentials, long polling and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, DispatchMode, FerrogramConfig, LogFormat, LogLevel, LogOutput, LogRotation,
    LoggingConfig, PollingConfig, SpanEventConfig,
};
pub use validation::{validate_config, validate_timeouts};
