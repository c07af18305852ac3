//! Update dispatcher for the Ferrogram framework.
//!
//! The [`Dispatcher`] owns the ordered route list, the state manager and the
//! error pipeline. For every update:
//!
//! 1. The sender's user key is resolved
//! 2. Routes are scanned in registration order; a route is skipped when its
//!    filter rejects the update
//! 3. When the route has a state filter and the update has a user, the
//!    user's state is read and checked; a storage failure skips the route
//! 4. The first route that passes runs its middleware chain and handler,
//!    and the scan stops
//! 5. A handler error goes through the [`ErrorHandlers`]
//!
//! ```rust,ignore
//! let mut dispatcher = Dispatcher::new();
//! dispatcher
//!     .add(on_command("start").handler(start))
//!     .add(on_text().state(StateFilter::in_state(&ask_name)).handler(save_name))
//!     .on_bot_blocked(forget_blocked_user);
//!
//! dispatcher.dispatch(update, bot).await;
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;
use tracing::{Instrument, Level, debug, error, span, trace, warn};

use ferrogram_core::{BoxedBot, StateManager, StateStorage, Update};

use crate::context::DispatchContext;
use crate::error::{BoxError, HandlerResult};
use crate::error_pipeline::{self, ErrorFilter, ErrorHandlers, error_handler_fn};
use crate::group::HandlerGroup;
use crate::handler::BoxFuture;
use crate::route::Route;

#[derive(Clone, Default)]
struct DispatcherInner {
    routes: Vec<Route>,
    states: StateManager,
    errors: ErrorHandlers,
}

/// Routes updates to the first matching handler.
///
/// Cloning is cheap and clones share their configuration until one of them
/// is modified. `Dispatcher` is `Send + Sync` and may dispatch concurrently.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    /// Creates an empty dispatcher backed by in-memory state storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty dispatcher using `states`.
    pub fn with_state_manager(states: StateManager) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                states,
                ..Default::default()
            }),
        }
    }

    /// Creates an empty dispatcher over a storage backend.
    pub fn with_storage(storage: impl StateStorage) -> Self {
        Self::with_state_manager(StateManager::new(storage))
    }

    fn inner_mut(&mut self) -> &mut DispatcherInner {
        Arc::make_mut(&mut self.inner)
    }

    pub fn state_manager(&self) -> &StateManager {
        &self.inner.states
    }

    /// Appends a route. Routes are tried in the order they are added.
    pub fn add(&mut self, route: Route) -> &mut Self {
        self.inner_mut().routes.push(route);
        self
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, route: Route) -> Self {
        self.add(route);
        self
    }

    /// Appends every route of `group`.
    pub fn register_group(&mut self, group: HandlerGroup) -> &mut Self {
        debug!(group = group.name(), routes = group.len(), "Registering handler group");
        self.inner_mut().routes.extend(group.into_routes());
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.inner.routes
    }

    pub fn route_count(&self) -> usize {
        self.inner.routes.len()
    }

    pub fn clear(&mut self) {
        self.inner_mut().routes.clear();
    }

    pub fn error_handlers(&self) -> &ErrorHandlers {
        &self.inner.errors
    }

    pub fn error_handlers_mut(&mut self) -> &mut ErrorHandlers {
        &mut self.inner_mut().errors
    }

    /// Dispatches one update.
    ///
    /// Returns `true` when a route's handler chain ran, whatever its result.
    pub async fn dispatch(&self, update: Update, bot: BoxedBot) -> bool {
        self.dispatch_shared(Arc::new(update), bot).await
    }

    /// Dispatches an update that is already shared.
    pub async fn dispatch_shared(&self, update: Arc<Update>, bot: BoxedBot) -> bool {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            update_id = update.update_id,
            kind = update.kind().as_str()
        );
        let ctx = Arc::new(DispatchContext::new(update, bot, self.inner.states.clone()));

        self.run_routes(ctx).instrument(span).await
    }

    async fn run_routes(&self, ctx: Arc<DispatchContext>) -> bool {
        for (index, route) in self.inner.routes.iter().enumerate() {
            if !route.matches(ctx.update()) {
                continue;
            }

            if let (Some(state_filter), Some(user)) = (route.state_filter(), ctx.user()) {
                let current = match user.get_state().await {
                    Ok(current) => current,
                    Err(err) => {
                        warn!(
                            route = route.display_name(),
                            user = user.key(),
                            error = %err,
                            "Failed to read user state, skipping route"
                        );
                        continue;
                    }
                };
                if !state_filter.check(current.as_ref()) {
                    trace!(
                        route = route.display_name(),
                        state = current.as_ref().map(|s| s.name()),
                        "State filter rejected update"
                    );
                    continue;
                }
            }

            debug!(route = route.display_name(), index, "Route matched");
            if let Err(err) = route.execute(Arc::clone(&ctx)).await {
                error!(route = route.display_name(), error = %err, "Handler failed");
                if let Err(err) = self.inner.errors.process(Arc::clone(&ctx), err).await {
                    error!(route = route.display_name(), error = %err, "Unhandled handler error");
                }
            }
            return true;
        }

        trace!("No route matched");
        false
    }

    // ─── Error handler registration ───────────────────────────────────────────

    /// Handles errors accepted by `filter`.
    pub fn on_error<F, Fut>(&mut self, filter: ErrorFilter, f: F) -> &mut Self
    where
        F: Fn(Arc<DispatchContext>, BoxError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.error_handlers_mut().add(Some(filter), error_handler_fn(f));
        self
    }

    /// Handles every error reaching this point of the pipeline.
    pub fn on_any_error<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Arc<DispatchContext>, BoxError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.error_handlers_mut().add(None, error_handler_fn(f));
        self
    }

    /// Handles errors no other handler accepted.
    pub fn set_fallback_error_handler<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Arc<DispatchContext>, BoxError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.error_handlers_mut().set_fallback(error_handler_fn(f));
        self
    }
}

macro_rules! on_error_kind {
    ($($(#[$meta:meta])* $name:ident => $filter:ident;)*) => {
        impl Dispatcher {
            $(
                $(#[$meta])*
                pub fn $name<F, Fut>(&mut self, f: F) -> &mut Self
                where
                    F: Fn(Arc<DispatchContext>, BoxError) -> Fut + Send + Sync + 'static,
                    Fut: Future<Output = HandlerResult> + Send + 'static,
                {
                    self.on_error(error_pipeline::$filter(), f)
                }
            )*
        }
    };
}

on_error_kind! {
    /// Any error reported by the remote Bot API.
    on_api_error => api_error;
    /// HTTP 429.
    on_rate_limit => rate_limit;
    on_bad_request => bad_request;
    on_unauthorized => unauthorized;
    on_forbidden => forbidden;
    on_not_found => not_found;
    on_conflict => conflict;
    on_server_error => server_error;
    on_message_text_empty => message_text_empty;
    on_message_too_long => message_too_long;
    on_chat_not_found => chat_not_found;
    on_message_not_found => message_not_found;
    on_message_cant_be_edited => message_cant_be_edited;
    on_message_cant_be_deleted => message_cant_be_deleted;
    /// The user blocked the bot or deleted their account.
    on_bot_blocked => bot_blocked;
    on_bot_kicked => bot_kicked;
    on_invalid_file_id => invalid_file_id;
    on_button_data_invalid => button_data_invalid;
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.inner.routes)
            .field("errors", &self.inner.errors)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// tower integration
// ============================================================================

/// Dispatch as a [`Service`], so tower layers (timeouts, concurrency limits)
/// can wrap it. The response is the result of [`Dispatcher::dispatch`].
impl Service<(Update, BoxedBot)> for Dispatcher {
    type Response = bool;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<bool, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, (update, bot): (Update, BoxedBot)) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { Ok(dispatcher.dispatch(update, bot).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::{callback_update, channel_update, null_bot, text_update};
    use crate::extractor::{Callback, UserState};
    use crate::filter;
    use crate::middleware::middleware_fn;
    use crate::routing::{on_callback, on_channel_post, on_command, on_message, on_text};
    use async_trait::async_trait;
    use ferrogram_core::{
        ApiError, DataMap, State, StateFilter, StorageError, StorageResult, UserContext,
    };
    use ferrogram_macros::CallbackData;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// A handler recording `name` into `log`.
    fn mark(
        log: &Log,
        name: &'static str,
    ) -> impl Fn() -> BoxFuture<'static, HandlerResult> + Clone + Send + Sync + 'static {
        let log = Arc::clone(log);
        move || {
            let log = Arc::clone(&log);
            Box::pin(async move {
                log.lock().push(name);
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let log = log();
        let dispatcher = Dispatcher::new()
            .with(on_command("start").handler(mark(&log, "start")))
            .with(on_message().handler(mark(&log, "message")))
            .with(on_text().handler(mark(&log, "text")));

        assert!(dispatcher.dispatch(text_update(1, "/start"), null_bot()).await);
        assert!(dispatcher.dispatch(text_update(1, "hello"), null_bot()).await);
        assert!(!dispatcher.dispatch(callback_update(1, "x"), null_bot()).await);
        assert_eq!(*log.lock(), ["start", "message"]);
    }

    #[tokio::test]
    async fn test_state_gating() {
        let asking = State::new("form.name");
        let log = log();
        let dispatcher = Dispatcher::new()
            .with(
                on_text()
                    .state(StateFilter::in_state(&asking))
                    .handler(mark(&log, "name")),
            )
            .with(on_text().handler(mark(&log, "idle")));

        dispatcher.dispatch(text_update(4, "Ann"), null_bot()).await;
        dispatcher
            .state_manager()
            .for_user(4_i64)
            .set_state(Some(&asking))
            .await
            .unwrap();
        dispatcher.dispatch(text_update(4, "Ann"), null_bot()).await;
        // another user is unaffected
        dispatcher.dispatch(text_update(5, "Bob"), null_bot()).await;

        assert_eq!(*log.lock(), ["idle", "name", "idle"]);
    }

    #[tokio::test]
    async fn test_keyless_update_skips_state_check() {
        let log = log();
        let dispatcher = Dispatcher::new().with(
            on_channel_post()
                .state(StateFilter::in_state(&State::new("never")))
                .handler(mark(&log, "post")),
        );

        assert!(dispatcher.dispatch(channel_update("news"), null_bot()).await);
        assert_eq!(*log.lock(), ["post"]);
    }

    struct BrokenStorage;

    #[async_trait]
    impl StateStorage for BrokenStorage {
        async fn get_context(&self, _key: &str) -> StorageResult<UserContext> {
            Err(StorageError::backend("down"))
        }
        async fn get_state(&self, _key: &str) -> StorageResult<String> {
            Err(StorageError::backend("down"))
        }
        async fn set_state(&self, _key: &str, _state: &str) -> StorageResult<()> {
            Err(StorageError::backend("down"))
        }
        async fn clear_state(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::backend("down"))
        }
        async fn get_data(&self, _key: &str) -> StorageResult<DataMap> {
            Err(StorageError::backend("down"))
        }
        async fn upsert_data(&self, _key: &str, _data: DataMap) -> StorageResult<()> {
            Err(StorageError::backend("down"))
        }
        async fn clear_data(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::backend("down"))
        }
        async fn upsert_context(
            &self,
            _key: &str,
            _state: &str,
            _data: DataMap,
        ) -> StorageResult<()> {
            Err(StorageError::backend("down"))
        }
        async fn clear_all(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::backend("down"))
        }
        async fn close(&self) -> StorageResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_storage_failure_skips_route() {
        let log = log();
        let dispatcher = Dispatcher::with_storage(BrokenStorage)
            .with(
                on_text()
                    .state(StateFilter::ignore_state())
                    .handler(mark(&log, "stateful")),
            )
            .with(on_text().handler(mark(&log, "stateless")));

        assert!(dispatcher.dispatch(text_update(1, "hi"), null_bot()).await);
        assert_eq!(*log.lock(), ["stateless"]);
    }

    #[tokio::test]
    async fn test_group_registration() {
        let log = log();
        let gate = {
            let log = Arc::clone(&log);
            middleware_fn(move |_ctx, next| {
                let log = Arc::clone(&log);
                async move {
                    log.lock().push("gate");
                    next.run().await;
                }
            })
        };
        let group = HandlerGroup::new("private")
            .with_filter(filter::private_chat())
            .use_middleware(gate)
            .with(on_text().handler(mark(&log, "text")));

        let mut dispatcher = Dispatcher::new();
        dispatcher
            .register_group(group)
            .add(on_channel_post().handler(mark(&log, "post")));
        assert_eq!(dispatcher.route_count(), 2);

        dispatcher.dispatch(text_update(1, "hi"), null_bot()).await;
        dispatcher.dispatch(channel_update("hi"), null_bot()).await;
        assert_eq!(*log.lock(), ["gate", "text", "post"]);
    }

    #[derive(Debug, Clone, Default, PartialEq, CallbackData)]
    #[callback(prefix = "menu")]
    struct MenuCallback {
        pub page: String,
    }

    #[tokio::test]
    async fn test_callback_routes_discriminate_by_pattern() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = |tag: &'static str| {
            let seen = Arc::clone(&seen);
            move |Callback(menu): Callback<MenuCallback>| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().push(format!("{tag}:{}", menu.page));
                    Ok(())
                }
            }
        };

        let dispatcher = Dispatcher::new()
            .with(
                on_callback(MenuCallback {
                    page: "settings".into(),
                })
                .handler(record("settings")),
            )
            .with(on_callback(MenuCallback::default()).handler(record("any")));

        dispatcher
            .dispatch(callback_update(1, "menu:settings"), null_bot())
            .await;
        dispatcher
            .dispatch(callback_update(1, "menu:about"), null_bot())
            .await;
        assert!(
            !dispatcher
                .dispatch(callback_update(1, "other:about"), null_bot())
                .await
        );
        assert_eq!(*seen.lock(), ["settings:settings", "any:about"]);
    }

    async fn fail_blocked() -> HandlerResult {
        Err(ApiError::remote(403, "Forbidden: bot was blocked by the user").into())
    }

    async fn fail_plain() -> HandlerResult {
        Err("plain failure".into())
    }

    async fn forget_user(user: UserState) -> HandlerResult {
        user.clear_all().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_errors_reach_pipeline() {
        let blocked = Arc::new(AtomicUsize::new(0));
        let fallback = Arc::new(AtomicUsize::new(0));

        let mut dispatcher = Dispatcher::new();
        dispatcher
            .add(on_command("block").handler(fail_blocked))
            .add(on_command("fail").handler(fail_plain))
            .add(on_channel_post().handler(forget_user));
        {
            let blocked = Arc::clone(&blocked);
            dispatcher.on_bot_blocked(move |ctx, _err| {
                let blocked = Arc::clone(&blocked);
                async move {
                    assert_eq!(ctx.user_key(), Some("8"));
                    blocked.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }
        {
            let fallback = Arc::clone(&fallback);
            dispatcher.set_fallback_error_handler(move |_ctx, _err| {
                let fallback = Arc::clone(&fallback);
                async move {
                    fallback.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            });
        }

        assert!(dispatcher.dispatch(text_update(8, "/block"), null_bot()).await);
        assert!(dispatcher.dispatch(text_update(8, "/fail"), null_bot()).await);
        // extraction failures take the same path
        assert!(dispatcher.dispatch(channel_update("x"), null_bot()).await);

        assert_eq!(blocked.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clones_diverge_on_write() {
        let base = Dispatcher::new().with(on_text().handler(|| async { Ok(()) }));
        let mut extended = base.clone();
        extended.add(on_message().handler(|| async { Ok(()) }));

        assert_eq!(base.route_count(), 1);
        assert_eq!(extended.route_count(), 2);
        extended.clear();
        assert_eq!(extended.route_count(), 0);
    }

    #[test]
    fn test_service_is_always_ready() {
        let mut dispatcher = Dispatcher::new();
        let mut ready =
            tokio_test::task::spawn(ServiceExt::<(Update, BoxedBot)>::ready(&mut dispatcher));
        tokio_test::assert_ready_ok!(ready.poll());
    }

    #[tokio::test]
    async fn test_tower_service() {
        let log = log();
        let dispatcher = Dispatcher::new().with(on_text().handler(mark(&log, "text")));

        let handled = dispatcher
            .clone()
            .oneshot((text_update(1, "hi"), null_bot()))
            .await
            .unwrap();
        assert!(handled);

        let unhandled = dispatcher
            .oneshot((callback_update(1, "x"), null_bot()))
            .await
            .unwrap();
        assert!(!unhandled);
        assert_eq!(*log.lock(), ["text"]);
    }
}
