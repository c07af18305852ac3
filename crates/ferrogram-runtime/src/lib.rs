//! Ferrogram Runtime - everything between the process and the dispatcher.
//!
//! This crate provides:
//! - Layered configuration (`FerrogramConfig`, `ConfigLoader`)
//! - Logging setup (`LoggingBuilder`, `init_from_config`)
//! - The long-polling driver (`Poller`)
//! - Runtime orchestration with graceful shutdown (`FerrogramRuntime`)
//! - An HTTPS `BotApi` client (`HttpBotApi`, feature `http-client`)
//!
//! ```ignore
//! use ferrogram_framework::{Dispatcher, on_command};
//! use ferrogram_runtime::FerrogramRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ferrogram.toml and FERROGRAM_* variables, installs logging
//!     let runtime = FerrogramRuntime::load()?;
//!
//!     let dispatcher = Dispatcher::new().with(on_command("start").handler(start));
//!
//!     // Polls until Ctrl+C
//!     runtime.run(dispatcher).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `toml-config` (default): read `ferrogram.toml` files
//! - `json-log`: JSON log output
//! - `http-client`: `HttpBotApi` over `reqwest`

pub mod config;
pub mod error;
#[cfg(feature = "http-client")]
pub mod http;
pub mod logging;
pub mod polling;
pub mod runtime;

// Re-exports
pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, DispatchMode, FerrogramConfig,
    LoggingConfig, PollingConfig,
};
pub use error::{RuntimeError, RuntimeResult};
#[cfg(feature = "http-client")]
pub use http::HttpBotApi;
pub use logging::{LoggingBuilder, SpanEvents, init_from_config};
pub use polling::{PollStats, Poller};
pub use runtime::{FerrogramRuntime, RuntimeBuilder};

pub use tokio_util::sync::CancellationToken;

// Re-export tracing for use by bot code
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and the `instrument` attribute.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
