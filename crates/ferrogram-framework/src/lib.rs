//! # Ferrogram Framework
//!
//! Routing and dispatch for Telegram bots.
//!
//! This layer provides:
//! - Update filters and their combinators
//! - Routes pairing filters and state filters with a handler
//! - Axum-style handlers with async extractors
//! - Continuation-style middleware chains
//! - Handler groups sharing a filter and middlewares
//! - The dispatcher and its error pipeline
//!
//! Everything here builds on the update model, callback codec and state
//! storage of `ferrogram-core`; fetching updates is left to the runtime.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod error_pipeline;
pub mod extractor;
pub mod filter;
pub mod group;
pub mod handler;
pub mod middleware;
pub mod route;
pub mod routing;

pub use context::DispatchContext;
pub use dispatcher::Dispatcher;
pub use error::{BoxError, ExtractError, ExtractResult, HandlerResult};
pub use error_pipeline::{ErrorFilter, ErrorHandler, ErrorHandlers, error_handler_fn};
pub use extractor::{Callback, CurrentState, FromContext, StateData, UpdateRef, UserState};
pub use filter::{DefinitionFilterExt, Filter};
pub use group::HandlerGroup;
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, HandlerFn, into_handler};
pub use middleware::{Middleware, MiddlewareChain, Next, middleware_fn};
pub use route::{Route, RouteBuilder};
pub use routing::{
    on, on_audio, on_callback, on_callback_data, on_callback_prefix, on_callback_query,
    on_channel_post, on_command, on_contact, on_document, on_edited_message, on_inline_query,
    on_location, on_message, on_photo, on_sticker, on_text, on_video, on_voice,
};
