//! # Ferrogram
//!
//! A type-safe dispatch framework for Telegram bots.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐     ┌────────────┐     ┌─────────┐     ┌──────────────┐     ┌──────────────┐
//! │  Poller  │────▶│ Dispatcher │────▶│ Filters │────▶│ State filter │────▶│ Middlewares  │──▶ handler
//! │(runtime) │     │ (in order) │     └─────────┘     └──────────────┘     └──────────────┘
//! └──────────┘     └────────────┘                                                │ error
//!                                                                                ▼
//!                                                                         Error pipeline
//! ```
//!
//! - **Routes** pair an update filter and an optional state filter with a
//!   handler; the first route whose filters pass handles the update
//! - **Handlers** are async functions taking extractors (Axum-style)
//! - **Middlewares** wrap a route's handler and may short-circuit it
//! - **State** is a per-user label plus a JSON data bag kept in a
//!   pluggable `StateStorage`
//! - **Callback data** is packed into and parsed from inline button
//!   payloads by `#[derive(CallbackData)]` types
//! - **Errors** returned by handlers run through filtered error handlers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrogram::prelude::*;
//!
//! #[derive(Debug, Clone, Default, CallbackData)]
//! #[callback(prefix = "vote", crate = "ferrogram::core")]
//! pub struct Vote {
//!     pub choice: String,
//! }
//!
//! async fn start(bot: BoxedBot, update: UpdateRef) -> HandlerResult {
//!     if let Some(chat) = update.chat() {
//!         bot.send_message(chat.id, "Hi!").await?;
//!     }
//!     Ok(())
//! }
//!
//! async fn vote(Callback(vote): Callback<Vote>) -> HandlerResult {
//!     tracing::info!(choice = %vote.choice, "Vote received");
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = FerrogramRuntime::load()?;
//!
//!     let mut dispatcher = Dispatcher::new()
//!         .with(on_command("start").handler(start))
//!         .with(on_callback(Vote::default()).handler(vote));
//!     dispatcher.on_bot_blocked(|_ctx, _err| async { Ok(()) });
//!
//!     runtime.run(dispatcher).await?;
//!     Ok(())
//! }
//! ```
//!
//! Derived callback types name the core crate through `crate = "..."` when
//! only `ferrogram` is a dependency.
//!
//! ## Features
//!
//! - `toml-config` (default): `ferrogram.toml` configuration files
//! - `json-log`: JSON log output
//! - `http-client`: the `reqwest`-backed `HttpBotApi` and `FerrogramRuntime::run`

pub use ferrogram_core as core;
pub use ferrogram_framework as framework;
pub use ferrogram_macros as macros;
pub use ferrogram_runtime as runtime;

/// Commonly used items for writing bots.
///
/// ```rust,ignore
/// use ferrogram::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use ferrogram_runtime::{FerrogramConfig, FerrogramRuntime, Poller};

    // Dispatch
    pub use ferrogram_framework::{
        DefinitionFilterExt, Dispatcher, ErrorFilter, Filter, HandlerGroup, HandlerResult,
        Middleware, Next, Route, middleware_fn,
    };

    // Route constructors
    pub use ferrogram_framework::routing::*;

    // Extractors
    pub use ferrogram_framework::{
        Callback, CurrentState, DispatchContext, FromContext, StateData, UpdateRef, UserState,
    };

    // Bot API
    pub use ferrogram_core::{ApiError, BotApi, BotApiExt, BoxedBot, Update, UpdateKind};

    // Callback data
    pub use ferrogram_core::{
        CallbackDefinition, CallbackPayload, callback_button, pack_callback, parse_callback,
    };
    /// Derives `CallbackPayload`.
    ///
    /// Generated code names `::ferrogram_core`. A bot that depends only on
    /// `ferrogram` points it at the re-export instead:
    ///
    /// ```rust,ignore
    /// #[derive(Debug, Clone, Default, CallbackData)]
    /// #[callback(prefix = "vote", crate = "ferrogram::core")]
    /// pub struct Vote {
    ///     pub choice: String,
    /// }
    /// ```
    pub use ferrogram_macros::CallbackData;

    // Per-user state
    pub use ferrogram_core::{MemoryStorage, State, StateFilter, StateGroup, StateManager};
}
