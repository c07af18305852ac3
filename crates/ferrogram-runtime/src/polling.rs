//! Long-polling driver.
//!
//! The [`Poller`] repeatedly calls `getUpdates`, advances the offset past
//! every update it receives and hands each update to a [`Dispatcher`].
//!
//! ```rust,ignore
//! use ferrogram_runtime::Poller;
//! use tokio_util::sync::CancellationToken;
//!
//! let shutdown = CancellationToken::new();
//! let poller = Poller::new(bot, dispatcher, config.polling.clone());
//! let stats = poller.run(shutdown.child_token()).await;
//! ```

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::{DispatchMode, PollingConfig};
use crate::error::RuntimeResult;
use crate::runtime::wait_for_shutdown;
use ferrogram_core::{BotApiExt, BoxedBot, GetUpdates, Update};
use ferrogram_framework::Dispatcher;

/// Counters collected over one [`Poller::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Updates received from the API.
    pub received: u64,
    /// Updates for which a route ran.
    pub handled: u64,
    /// Failed `getUpdates` calls.
    pub fetch_errors: u64,
}

/// Fetches updates and feeds them to a dispatcher until cancelled.
pub struct Poller {
    bot: BoxedBot,
    dispatcher: Dispatcher,
    config: PollingConfig,
    offset: Option<i64>,
}

impl Poller {
    pub fn new(bot: BoxedBot, dispatcher: Dispatcher, config: PollingConfig) -> Self {
        Self {
            bot,
            dispatcher,
            config,
            offset: None,
        }
    }

    /// Starts from `offset` instead of the oldest unconfirmed update.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// The offset the next `getUpdates` call will send.
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    fn request(&self) -> GetUpdates {
        GetUpdates {
            offset: self.offset,
            limit: Some(self.config.limit),
            timeout: Some(self.config.timeout_secs),
            allowed_updates: self.config.allowed_updates.clone(),
        }
    }

    fn advance(&mut self, update: &Update) {
        let next = update.update_id + 1;
        self.offset = Some(self.offset.map_or(next, |offset| offset.max(next)));
    }

    /// Polls until `shutdown` is cancelled.
    ///
    /// A pending `getUpdates` call is abandoned on cancellation. In
    /// concurrent mode, dispatches already spawned are awaited before
    /// returning.
    pub async fn run(mut self, shutdown: CancellationToken) -> PollStats {
        let mut stats = PollStats::default();
        let mut tasks = JoinSet::new();
        let retry_delay = self.config.retry_delay();

        info!(
            mode = ?self.config.mode,
            timeout_secs = self.config.timeout_secs,
            limit = self.config.limit,
            "Long polling started"
        );

        loop {
            let request = self.request();
            let fetched = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                result = self.bot.get_updates(&request) => result,
            };

            let updates = match fetched {
                Ok(updates) => updates,
                Err(err) => {
                    stats.fetch_errors += 1;
                    warn!(
                        error = %err,
                        retry_in = ?retry_delay,
                        "Failed to fetch updates"
                    );
                    tokio::select! {
                        biased;
                        () = shutdown.cancelled() => break,
                        () = tokio::time::sleep(retry_delay) => continue,
                    }
                }
            };

            trace!(count = updates.len(), offset = ?self.offset, "Fetched updates");
            for update in updates {
                stats.received += 1;
                self.advance(&update);

                match self.config.mode {
                    DispatchMode::Concurrent => {
                        let dispatcher = self.dispatcher.clone();
                        let bot = Arc::clone(&self.bot);
                        tasks.spawn(async move { dispatcher.dispatch(update, bot).await });
                    }
                    DispatchMode::Sequential => {
                        let bot = Arc::clone(&self.bot);
                        if self.dispatcher.dispatch(update, bot).await {
                            stats.handled += 1;
                        }
                    }
                }
            }

            while let Some(joined) = tasks.try_join_next() {
                record(&mut stats, joined);
            }
        }

        if !tasks.is_empty() {
            debug!(pending = tasks.len(), "Waiting for in-flight dispatches");
        }
        while let Some(joined) = tasks.join_next().await {
            record(&mut stats, joined);
        }

        info!(
            received = stats.received,
            handled = stats.handled,
            fetch_errors = stats.fetch_errors,
            "Long polling stopped"
        );
        stats
    }

    /// Polls until Ctrl+C or SIGTERM.
    pub async fn run_until_ctrl_c(self) -> RuntimeResult<PollStats> {
        let shutdown = CancellationToken::new();
        let run = self.run(shutdown.clone());
        tokio::pin!(run);

        let signal = tokio::select! {
            stats = &mut run => return Ok(stats),
            signal = wait_for_shutdown() => signal,
        };
        shutdown.cancel();
        let stats = run.await;
        signal.map(|()| stats)
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("dispatcher", &self.dispatcher)
            .field("config", &self.config)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

fn record(stats: &mut PollStats, joined: Result<bool, tokio::task::JoinError>) {
    match joined {
        Ok(true) => stats.handled += 1,
        Ok(false) => {}
        Err(err) => error!(error = %err, "Dispatch task panicked"),
    }
}
