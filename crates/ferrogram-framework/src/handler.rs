//! Handler system for the Ferrogram framework.
//!
//! Handlers are plain async functions whose parameters are extracted from
//! the [`DispatchContext`], similar to Axum's handler system:
//!
//! ```rust,ignore
//! async fn start(bot: BoxedBot, update: UpdateRef) -> HandlerResult {
//!     let chat = update.chat().map(|c| c.id).unwrap_or_default();
//!     bot.send_message(chat, "Hello!").await?;
//!     Ok(())
//! }
//!
//! async fn ask_age(user: UserState, CurrentState(state): CurrentState) -> HandlerResult {
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! A parameter that fails to extract turns into a handler error, which the
//! dispatcher routes to the error pipeline like any other failure.

use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::DispatchContext;
use crate::error::HandlerResult;
use crate::extractor::FromContext;

/// A type alias for a boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// Handler Trait
// ============================================================================

/// The terminal step of a route.
///
/// Implemented for async functions taking 0-8 [`FromContext`] parameters and
/// returning [`HandlerResult`].
pub trait Handler<T>: Clone + Send + Sync + 'static {
    /// The type of future calling this handler returns.
    type Future: Future<Output = HandlerResult> + Send + 'static;

    /// Call the handler with the given context.
    fn call(self, ctx: Arc<DispatchContext>) -> Self::Future;
}

// ============================================================================
// Type erasure
// ============================================================================

/// Keeps the extractor tuple type of a handler so it can be erased.
pub struct HandlerFn<F, T> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> HandlerFn<F, T> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<F: Clone, T> Clone for HandlerFn<F, T> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}

/// A type-erased handler that can be stored in a route.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync>;

/// Type-erased handler trait for dynamic dispatch.
pub trait ErasedHandler: Send + Sync {
    fn call(&self, ctx: Arc<DispatchContext>) -> BoxFuture<'static, HandlerResult>;
}

impl<F, T> ErasedHandler for HandlerFn<F, T>
where
    F: Handler<T> + Send + Sync,
    T: 'static,
{
    fn call(&self, ctx: Arc<DispatchContext>) -> BoxFuture<'static, HandlerResult> {
        let f = self.f.clone();
        Box::pin(f.call(ctx))
    }
}

/// Convert a handler function into a boxed handler.
pub fn into_handler<F, T>(f: F) -> BoxedHandler
where
    F: Handler<T> + Send + Sync + 'static,
    T: 'static,
{
    Arc::new(HandlerFn::new(f))
}

// ============================================================================
// Handler implementations for functions
// ============================================================================

impl<F, Fut> Handler<()> for F
where
    F: FnOnce() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    type Future = Fut;

    fn call(self, _ctx: Arc<DispatchContext>) -> Self::Future {
        (self)()
    }
}

macro_rules! impl_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case)]
        impl<F, Fut, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = HandlerResult> + Send + 'static,
            $( $ty: FromContext + Send + 'static, )*
        {
            type Future = BoxFuture<'static, HandlerResult>;

            fn call(self, ctx: Arc<DispatchContext>) -> Self::Future {
                Box::pin(async move {
                    $(
                        let $ty = $ty::from_context(&ctx).await?;
                    )*

                    (self)($($ty,)*).await
                })
            }
        }
    };
}

impl_handler!(T1);
impl_handler!(T1, T2);
impl_handler!(T1, T2, T3);
impl_handler!(T1, T2, T3, T4);
impl_handler!(T1, T2, T3, T4, T5);
impl_handler!(T1, T2, T3, T4, T5, T6);
impl_handler!(T1, T2, T3, T4, T5, T6, T7);
impl_handler!(T1, T2, T3, T4, T5, T6, T7, T8);
