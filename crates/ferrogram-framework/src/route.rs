//! Registration entries of the dispatcher.
//!
//! A [`Route`] pairs an update [`Filter`] and an optional [`StateFilter`]
//! with a middleware chain around one handler. Routes are assembled with a
//! [`RouteBuilder`], usually obtained from one of the `on_*` functions in
//! [`routing`](crate::routing):
//!
//! ```rust,ignore
//! dispatcher.add(
//!     on_text()
//!         .state(StateFilter::in_state(&ask_name))
//!         .middleware(log_middleware)
//!         .name("form.name")
//!         .handler(save_name),
//! );
//! ```

use std::sync::Arc;

use tracing::trace;

use ferrogram_core::{StateFilter, Update};

use crate::context::DispatchContext;
use crate::error::HandlerResult;
use crate::filter::Filter;
use crate::handler::{BoxedHandler, Handler, into_handler};
use crate::middleware::{Middleware, MiddlewareChain};

/// Internal data for a Route, shared between clones.
#[derive(Clone)]
struct RouteInner {
    filter: Filter,
    state_filter: Option<StateFilter>,
    middlewares: Vec<Middleware>,
    handler: BoxedHandler,
    chain: MiddlewareChain,
    name: Option<String>,
}

/// One registration entry. Cloning is cheap.
#[derive(Clone)]
pub struct Route {
    inner: Arc<RouteInner>,
}

impl Route {
    fn from_parts(
        filter: Filter,
        state_filter: Option<StateFilter>,
        middlewares: Vec<Middleware>,
        handler: BoxedHandler,
        name: Option<String>,
    ) -> Self {
        let chain = MiddlewareChain::new(Arc::clone(&handler), middlewares.iter().cloned());
        Self {
            inner: Arc::new(RouteInner {
                filter,
                state_filter,
                middlewares,
                handler,
                chain,
                name,
            }),
        }
    }

    /// Whether the update filter passes. The state filter is evaluated by
    /// the dispatcher, which owns the storage access.
    pub fn matches(&self, update: &Update) -> bool {
        let matched = self.inner.filter.check(update);
        if !matched {
            trace!(route = self.display_name(), "Route filter rejected update");
        }
        matched
    }

    pub fn state_filter(&self) -> Option<&StateFilter> {
        self.inner.state_filter.as_ref()
    }

    pub fn filter(&self) -> &Filter {
        &self.inner.filter
    }

    pub fn middlewares(&self) -> &[Middleware] {
        &self.inner.middlewares
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub(crate) fn display_name(&self) -> &str {
        self.name().unwrap_or("unnamed")
    }

    /// Runs the middleware chain and handler once.
    pub async fn execute(&self, ctx: Arc<DispatchContext>) -> HandlerResult {
        self.inner.chain.execute(ctx).await
    }

    /// This route with `filter` AND-ed in front of its own filter and
    /// `middlewares` placed before its own.
    pub(crate) fn nested(&self, filter: Option<&Filter>, middlewares: &[Middleware]) -> Route {
        let inner = &self.inner;
        let filter = match filter {
            Some(outer) => outer.clone().and(inner.filter.clone()),
            None => inner.filter.clone(),
        };
        let middlewares = middlewares
            .iter()
            .chain(&inner.middlewares)
            .cloned()
            .collect();
        Route::from_parts(
            filter,
            inner.state_filter.clone(),
            middlewares,
            Arc::clone(&inner.handler),
            inner.name.clone(),
        )
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.inner.name)
            .field("state_filter", &self.inner.state_filter)
            .field("middleware_count", &self.inner.middlewares.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// RouteBuilder
// ============================================================================

/// Collects the parts of a [`Route`] until a handler is attached.
#[derive(Clone)]
pub struct RouteBuilder {
    filter: Filter,
    state_filter: Option<StateFilter>,
    middlewares: Vec<Middleware>,
    name: Option<String>,
}

impl RouteBuilder {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            state_filter: None,
            middlewares: Vec::new(),
            name: None,
        }
    }

    /// Restricts the route to users whose state passes `filter`.
    pub fn state(mut self, filter: StateFilter) -> Self {
        self.state_filter = Some(filter);
        self
    }

    /// Appends a middleware. Middlewares run in the order they are added.
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Sets a name for this route (useful for debugging).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// AND-s another filter after the current one.
    pub fn and_filter(mut self, filter: Filter) -> Self {
        self.filter = self.filter.and(filter);
        self
    }

    /// Finishes the route with a handler.
    pub fn handler<F, T>(self, f: F) -> Route
    where
        F: Handler<T> + Send + Sync + 'static,
        T: 'static,
    {
        self.handler_boxed(into_handler(f))
    }

    /// Finishes the route with a pre-built boxed handler.
    pub fn handler_boxed(self, handler: BoxedHandler) -> Route {
        Route::from_parts(
            self.filter,
            self.state_filter,
            self.middlewares,
            handler,
            self.name,
        )
    }
}

impl std::fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("name", &self.name)
            .field("state_filter", &self.state_filter)
            .field("middleware_count", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}
