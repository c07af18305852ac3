//! Runtime entry point.
//!
//! [`FerrogramRuntime`] ties configuration, logging and long polling
//! together:
//!
//! ```rust,ignore
//! use ferrogram_runtime::FerrogramRuntime;
//!
//! let runtime = FerrogramRuntime::builder()
//!     .config_file("config/ferrogram.toml")
//!     .profile("production")
//!     .build()?;
//!
//! // With the `http-client` feature:
//! runtime.run(dispatcher).await?;
//!
//! // Or with any `BotApi` implementation:
//! runtime.run_with(bot, dispatcher).await?;
//! ```

use std::future::Future;
use std::path::Path;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ConfigLoader, FerrogramConfig, validate_config, validate_timeouts};
use crate::error::RuntimeResult;
use crate::logging;
use crate::polling::{PollStats, Poller};
use ferrogram_core::BoxedBot;
use ferrogram_framework::Dispatcher;

/// Validated configuration plus an installed logger.
#[derive(Debug, Clone)]
pub struct FerrogramRuntime {
    config: FerrogramConfig,
}

impl FerrogramRuntime {
    /// Loads configuration from the default locations.
    pub fn load() -> RuntimeResult<Self> {
        Self::builder().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Validates `config` and initializes logging from it.
    pub fn from_config(config: FerrogramConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging);

        if let Err(err) = validate_timeouts(&config) {
            warn!(error = %err, "Long polls may be cut short by the request timeout");
        }

        info!(
            log_level = %config.logging.level,
            polling_mode = ?config.polling.mode,
            "Runtime initialized from configuration"
        );

        Ok(Self { config })
    }

    pub fn config(&self) -> &FerrogramConfig {
        &self.config
    }

    /// A poller configured from `polling`.
    pub fn poller(&self, bot: BoxedBot, dispatcher: Dispatcher) -> Poller {
        Poller::new(bot, dispatcher, self.config.polling.clone())
    }

    /// Polls until `shutdown` completes, then drains in-flight dispatches.
    pub async fn run_until<F>(
        &self,
        bot: BoxedBot,
        dispatcher: Dispatcher,
        shutdown: F,
    ) -> PollStats
    where
        F: Future<Output = ()>,
    {
        let token = CancellationToken::new();
        let run = self.poller(bot, dispatcher).run(token.clone());
        tokio::pin!(run);

        tokio::select! {
            stats = &mut run => return stats,
            () = shutdown => info!("Shutdown requested"),
        }
        token.cancel();
        run.await
    }

    /// Polls with `bot` until Ctrl+C or SIGTERM.
    pub async fn run_with(
        &self,
        bot: BoxedBot,
        dispatcher: Dispatcher,
    ) -> RuntimeResult<PollStats> {
        info!("Ferrogram is now running. Press Ctrl+C to stop.");

        let mut signal: RuntimeResult<()> = Ok(());
        let stats = self
            .run_until(bot, dispatcher, async {
                signal = wait_for_shutdown().await;
            })
            .await;
        signal.map(|()| stats)
    }

    /// An HTTP Bot API client for the configured token.
    #[cfg(feature = "http-client")]
    pub fn http_bot(&self) -> RuntimeResult<BoxedBot> {
        let api = crate::http::HttpBotApi::from_config(&self.config.bot)?;
        Ok(std::sync::Arc::new(api))
    }

    /// Polls over HTTP until Ctrl+C or SIGTERM.
    #[cfg(feature = "http-client")]
    pub async fn run(&self, dispatcher: Dispatcher) -> RuntimeResult<PollStats> {
        let bot = self.http_bot()?;
        self.run_with(bot, dispatcher).await
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
pub(crate) async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder loading the configuration for a [`FerrogramRuntime`].
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges configuration values programmatically.
    pub fn merge(mut self, config: FerrogramConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> RuntimeResult<FerrogramRuntime> {
        let config = self.config_loader.load()?;
        FerrogramRuntime::from_config(config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, DispatchMode};
    use crate::error::RuntimeError;
    use async_trait::async_trait;
    use ferrogram_core::{ApiResult, BotApi};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every long poll with an empty batch after one second.
    #[derive(Default)]
    struct IdleBot {
        polls: AtomicUsize,
    }

    #[async_trait]
    impl BotApi for IdleBot {
        async fn call(&self, _method: &str, _params: Value) -> ApiResult<Value> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(json!([]))
        }
    }

    fn quiet_builder() -> RuntimeBuilder {
        FerrogramRuntime::builder()
            .search_path("/nonexistent/ferrogram")
            .without_env()
    }

    #[test]
    fn test_build_with_merged_config() {
        let mut config = FerrogramConfig::default();
        config.polling.mode = DispatchMode::Sequential;

        let runtime = quiet_builder().merge(config).build().unwrap();
        assert_eq!(runtime.config().polling.mode, DispatchMode::Sequential);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = FerrogramConfig::default();
        config.polling.limit = 500;

        let err = FerrogramRuntime::from_config(config).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Config(ConfigError::ValidationError { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_stops_polling() {
        let runtime = quiet_builder().build().unwrap();
        let bot = Arc::new(IdleBot::default());

        let stats = runtime
            .run_until(
                bot.clone(),
                Dispatcher::new(),
                tokio::time::sleep(Duration::from_millis(3500)),
            )
            .await;

        assert_eq!(stats, PollStats::default());
        assert_eq!(bot.polls.load(Ordering::SeqCst), 4);
    }
}
