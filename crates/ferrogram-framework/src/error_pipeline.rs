//! Post-processing of handler failures.
//!
//! When a handler returns an error, the dispatcher hands it to
//! [`ErrorHandlers::process`]. Registered handlers are tried in order; the
//! first one whose [`ErrorFilter`] accepts the error (or which has no
//! filter) consumes it and its result becomes the outcome. Without a match
//! the fallback runs, and without a fallback the original error is returned.
//!
//! ```rust,ignore
//! dispatcher
//!     .on_rate_limit(|ctx, err| async move {
//!         warn!(%err, "Slow down");
//!         Ok(())
//!     })
//!     .on_bot_blocked(|ctx, _err| async move {
//!         ctx.set_state(None).await?;
//!         Ok(())
//!     });
//! ```

use std::error::Error;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use ferrogram_core::ApiError;
use ferrogram_core::error::codes;

use crate::context::DispatchContext;
use crate::error::{BoxError, HandlerResult};
use crate::handler::BoxFuture;

/// A cloneable predicate over a handler error.
#[derive(Clone)]
pub struct ErrorFilter(Arc<dyn Fn(&(dyn Error + Send + Sync + 'static)) -> bool + Send + Sync>);

impl ErrorFilter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&(dyn Error + Send + Sync + 'static)) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn check(&self, err: &(dyn Error + Send + Sync + 'static)) -> bool {
        (self.0)(err)
    }

    /// Matches an [`ApiError`] anywhere in the error's source chain.
    pub fn api(pred: impl Fn(&ApiError) -> bool + Send + Sync + 'static) -> Self {
        Self::new(move |err| find_api_error(err).is_some_and(&pred))
    }
}

impl std::fmt::Debug for ErrorFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ErrorFilter(..)")
    }
}

/// Locates an [`ApiError`] in `err` or its sources.
pub fn find_api_error<'a>(err: &'a (dyn Error + Send + Sync + 'static)) -> Option<&'a ApiError> {
    if let Some(api) = err.downcast_ref::<ApiError>() {
        return Some(api);
    }
    let mut source = err.source();
    while let Some(err) = source {
        if let Some(api) = err.downcast_ref::<ApiError>() {
            return Some(api);
        }
        source = err.source();
    }
    None
}

/// A type-erased error handler.
pub type ErrorHandler =
    Arc<dyn Fn(Arc<DispatchContext>, BoxError) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Wraps an async closure into an [`ErrorHandler`].
pub fn error_handler_fn<F, Fut>(f: F) -> ErrorHandler
where
    F: Fn(Arc<DispatchContext>, BoxError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(
        move |ctx: Arc<DispatchContext>, err: BoxError| -> BoxFuture<'static, HandlerResult> {
            f(ctx, err).boxed()
        },
    )
}

/// Ordered error handlers plus an optional fallback.
#[derive(Clone, Default)]
pub struct ErrorHandlers {
    handlers: Vec<(Option<ErrorFilter>, ErrorHandler)>,
    fallback: Option<ErrorHandler>,
}

impl ErrorHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler. `None` accepts every error.
    pub fn add(&mut self, filter: Option<ErrorFilter>, handler: ErrorHandler) {
        self.handlers.push((filter, handler));
    }

    /// Replaces the handler used when nothing else matches.
    pub fn set_fallback(&mut self, handler: ErrorHandler) {
        self.fallback = Some(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty() && self.fallback.is_none()
    }

    /// Runs the first matching handler, else the fallback, else returns
    /// `err` unchanged.
    pub async fn process(&self, ctx: Arc<DispatchContext>, err: BoxError) -> HandlerResult {
        let matched = self
            .handlers
            .iter()
            .position(|(filter, _)| filter.as_ref().is_none_or(|f| f.check(&*err)));

        if let Some(index) = matched {
            debug!(index, "Error handler matched");
            return (self.handlers[index].1)(ctx, err).await;
        }
        match &self.fallback {
            Some(fallback) => {
                debug!("Running fallback error handler");
                fallback(ctx, err).await
            }
            None => Err(err),
        }
    }
}

impl std::fmt::Debug for ErrorHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandlers")
            .field("handler_count", &self.handlers.len())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

// ============================================================================
// Filter builders
// ============================================================================

/// Errors reported by the remote Bot API.
pub fn api_error() -> ErrorFilter {
    ErrorFilter::api(|e| e.code().is_some())
}

/// Remote errors with the given code.
pub fn error_code(code: i32) -> ErrorFilter {
    ErrorFilter::api(move |e| e.code() == Some(code))
}

pub fn rate_limit() -> ErrorFilter {
    error_code(codes::TOO_MANY_REQUESTS)
}

pub fn bad_request() -> ErrorFilter {
    error_code(codes::BAD_REQUEST)
}

pub fn unauthorized() -> ErrorFilter {
    error_code(codes::UNAUTHORIZED)
}

pub fn forbidden() -> ErrorFilter {
    error_code(codes::FORBIDDEN)
}

pub fn not_found() -> ErrorFilter {
    error_code(codes::NOT_FOUND)
}

pub fn conflict() -> ErrorFilter {
    error_code(codes::CONFLICT)
}

/// Remote errors with a 5xx code.
pub fn server_error() -> ErrorFilter {
    ErrorFilter::api(ApiError::is_server_error)
}

/// Every error, including ones not coming from the API.
pub fn all_errors() -> ErrorFilter {
    ErrorFilter::new(|_| true)
}

pub fn message_text_empty() -> ErrorFilter {
    ErrorFilter::api(ApiError::is_message_text_empty)
}

pub fn message_too_long() -> ErrorFilter {
    ErrorFilter::api(ApiError::is_message_too_long)
}

pub fn chat_not_found() -> ErrorFilter {
    ErrorFilter::api(ApiError::is_chat_not_found)
}

pub fn message_not_found() -> ErrorFilter {
    ErrorFilter::api(ApiError::is_message_not_found)
}

pub fn message_cant_be_edited() -> ErrorFilter {
    ErrorFilter::api(ApiError::is_message_cant_be_edited)
}

pub fn message_cant_be_deleted() -> ErrorFilter {
    ErrorFilter::api(ApiError::is_message_cant_be_deleted)
}

pub fn bot_blocked() -> ErrorFilter {
    ErrorFilter::api(ApiError::is_bot_blocked)
}

pub fn bot_kicked() -> ErrorFilter {
    ErrorFilter::api(ApiError::is_bot_kicked)
}

pub fn invalid_file_id() -> ErrorFilter {
    ErrorFilter::api(ApiError::is_invalid_file_id)
}

pub fn button_data_invalid() -> ErrorFilter {
    ErrorFilter::api(ApiError::is_button_data_invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::{null_bot, text_update};
    use crate::error::ExtractError;
    use ferrogram_core::StateManager;
    use parking_lot::Mutex;

    fn ctx() -> Arc<DispatchContext> {
        Arc::new(DispatchContext::new(
            Arc::new(text_update(1, "hi")),
            null_bot(),
            StateManager::default(),
        ))
    }

    fn recording(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> ErrorHandler {
        let log = Arc::clone(log);
        error_handler_fn(move |_ctx, _err| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(name);
                Ok(())
            }
        })
    }

    fn remote(code: i32, description: &str) -> BoxError {
        Box::new(ApiError::remote(code, description))
    }

    #[test]
    fn test_filters() {
        let blocked = remote(403, "Forbidden: bot was blocked by the user");
        assert!(api_error().check(&*blocked));
        assert!(forbidden().check(&*blocked));
        assert!(bot_blocked().check(&*blocked));
        assert!(!bot_kicked().check(&*blocked));
        assert!(!rate_limit().check(&*blocked));

        let busy = remote(502, "Bad Gateway");
        assert!(server_error().check(&*busy));
        assert!(error_code(502).check(&*busy));

        let transport: BoxError = Box::new(ApiError::transport("reset"));
        assert!(!api_error().check(&*transport));

        let other: BoxError = Box::new(ExtractError::NoUser);
        assert!(!api_error().check(&*other));
        assert!(all_errors().check(&*other));
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = ErrorHandlers::new();
        handlers.add(Some(rate_limit()), recording(&log, "rate"));
        handlers.add(Some(forbidden()), recording(&log, "forbidden"));
        handlers.add(None, recording(&log, "any"));
        handlers.set_fallback(recording(&log, "fallback"));

        handlers.process(ctx(), remote(403, "Forbidden")).await.unwrap();
        handlers.process(ctx(), "plain".into()).await.unwrap();
        assert_eq!(*log.lock(), ["forbidden", "any"]);
    }

    #[tokio::test]
    async fn test_fallback_and_passthrough() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut handlers = ErrorHandlers::new();
        handlers.add(Some(bad_request()), recording(&log, "bad"));

        let err = handlers
            .process(ctx(), remote(429, "Too Many Requests"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Too Many Requests"));

        handlers.set_fallback(recording(&log, "fallback"));
        handlers
            .process(ctx(), remote(429, "Too Many Requests"))
            .await
            .unwrap();
        assert_eq!(*log.lock(), ["fallback"]);
    }

    #[tokio::test]
    async fn test_handler_result_is_returned() {
        let mut handlers = ErrorHandlers::new();
        handlers.add(
            None,
            error_handler_fn(|_ctx, err| async move { Err(format!("wrapped: {err}").into()) }),
        );
        let err = handlers.process(ctx(), "boom".into()).await.unwrap_err();
        assert_eq!(err.to_string(), "wrapped: boom");
    }
}
