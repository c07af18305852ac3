//! Named groups of routes sharing a filter and middlewares.

use crate::filter::Filter;
use crate::middleware::Middleware;
use crate::route::Route;

/// A set of routes registered together.
///
/// The group's filter and middlewares are applied when a route is added:
/// the filter is AND-ed in front of the route's own filter and the group
/// middlewares run before the route's. Configure the group before adding
/// routes; later changes do not reach routes already added.
///
/// ```rust,ignore
/// let admin = HandlerGroup::new("admin")
///     .with_filter(filter::private_chat())
///     .use_middleware(require_admin)
///     .with(on_command("ban").handler(ban))
///     .with(on_command("stats").handler(stats));
///
/// dispatcher.register_group(admin);
/// ```
#[derive(Clone)]
pub struct HandlerGroup {
    name: String,
    filter: Option<Filter>,
    middlewares: Vec<Middleware>,
    routes: Vec<Route>,
}

impl HandlerGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: None,
            middlewares: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Sets the filter every later route must also pass.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Appends a middleware run before the middlewares of later routes.
    pub fn use_middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Adds a route, composed with the group's filter and middlewares.
    pub fn add(&mut self, route: Route) -> &mut Self {
        let route = route.nested(self.filter.as_ref(), &self.middlewares);
        self.routes.push(route);
        self
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, route: Route) -> Self {
        self.add(route);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}

impl std::fmt::Debug for HandlerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerGroup")
            .field("name", &self.name)
            .field("has_filter", &self.filter.is_some())
            .field("middleware_count", &self.middlewares.len())
            .field("routes", &self.routes)
            .finish()
    }
}
