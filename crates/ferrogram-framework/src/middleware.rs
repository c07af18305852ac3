//! Continuation-style middleware wrapping a route's handler.
//!
//! A middleware receives the context and a [`Next`]. Awaiting
//! [`Next::run`] runs the rest of the chain (the following middlewares and
//! finally the handler) to completion; returning without calling it stops
//! the chain.
//!
//! ```rust,ignore
//! let only_admins = middleware_fn(|ctx, next| async move {
//!     if ctx.user_key() == Some("42") {
//!         next.run().await;
//!     }
//! });
//! ```
//!
//! The result of a chain is the result of its handler, or `Ok(())` when a
//! middleware stopped the chain before the handler ran.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tracing::trace;

use crate::context::DispatchContext;
use crate::error::HandlerResult;
use crate::handler::{BoxFuture, BoxedHandler};

/// A type-erased middleware.
pub type Middleware =
    Arc<dyn Fn(Arc<DispatchContext>, Next) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure into a [`Middleware`].
pub fn middleware_fn<F, Fut>(f: F) -> Middleware
where
    F: Fn(Arc<DispatchContext>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx: Arc<DispatchContext>, next: Next| -> BoxFuture<'static, ()> {
        f(ctx, next).boxed()
    })
}

type Outcome = Arc<Mutex<Option<HandlerResult>>>;

/// The continuation handed to a middleware.
///
/// Consumed by [`run`](Self::run), so each link can continue at most once.
pub struct Next {
    ctx: Arc<DispatchContext>,
    middlewares: Arc<[Middleware]>,
    index: usize,
    handler: BoxedHandler,
    outcome: Outcome,
}

impl Next {
    /// Runs the next middleware, or the handler at the end of the list, and
    /// returns once everything downstream has finished.
    pub fn run(self) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            match self.middlewares.get(self.index).cloned() {
                Some(middleware) => {
                    trace!(index = self.index, "Running middleware");
                    let ctx = Arc::clone(&self.ctx);
                    let next = Next {
                        index: self.index + 1,
                        ..self
                    };
                    middleware(ctx, next).await;
                }
                None => {
                    let result = self.handler.call(Arc::clone(&self.ctx)).await;
                    *self.outcome.lock() = Some(result);
                }
            }
        })
    }

    /// The context of this dispatch.
    pub fn context(&self) -> &Arc<DispatchContext> {
        &self.ctx
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("remaining", &(self.middlewares.len() - self.index))
            .finish_non_exhaustive()
    }
}

/// An ordered list of middlewares around one handler.
#[derive(Clone)]
pub struct MiddlewareChain {
    middlewares: Arc<[Middleware]>,
    handler: BoxedHandler,
}

impl MiddlewareChain {
    pub fn new(handler: BoxedHandler, middlewares: impl IntoIterator<Item = Middleware>) -> Self {
        Self {
            middlewares: middlewares.into_iter().collect(),
            handler,
        }
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs the chain once.
    pub async fn execute(&self, ctx: Arc<DispatchContext>) -> HandlerResult {
        if self.middlewares.is_empty() {
            return self.handler.call(ctx).await;
        }

        let outcome: Outcome = Arc::new(Mutex::new(None));
        Next {
            ctx,
            middlewares: Arc::clone(&self.middlewares),
            index: 0,
            handler: Arc::clone(&self.handler),
            outcome: Arc::clone(&outcome),
        }
        .run()
        .await;

        let result = outcome.lock().take();
        result.unwrap_or(Ok(()))
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("middleware_count", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}
