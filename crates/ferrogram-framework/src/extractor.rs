//! Extractor system for the Ferrogram framework.
//!
//! The [`FromContext`] trait defines how handler parameters are produced
//! from a [`DispatchContext`]. Extraction is asynchronous because some
//! extractors ([`CurrentState`], [`StateData`]) read per-user state from the
//! storage.

use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use ferrogram_core::{BoxedBot, CallbackPayload, DataMap, State, Update, UserStateManager};

use crate::context::DispatchContext;
use crate::error::{ExtractError, ExtractResult};

/// A trait for types that can be extracted from a [`DispatchContext`].
///
/// # Example
///
/// ```rust,ignore
/// struct ChatId(i64);
///
/// #[async_trait]
/// impl FromContext for ChatId {
///     async fn from_context(ctx: &Arc<DispatchContext>) -> ExtractResult<Self> {
///         ctx.update()
///             .chat()
///             .map(|c| ChatId(c.id))
///             .ok_or_else(|| ExtractError::custom("update has no chat"))
///     }
/// }
/// ```
#[async_trait]
pub trait FromContext: Sized + Send + 'static {
    async fn from_context(ctx: &Arc<DispatchContext>) -> ExtractResult<Self>;
}

/// The whole context.
#[async_trait]
impl FromContext for Arc<DispatchContext> {
    async fn from_context(ctx: &Arc<DispatchContext>) -> ExtractResult<Self> {
        Ok(Arc::clone(ctx))
    }
}

/// The bot the update arrived on.
#[async_trait]
impl FromContext for BoxedBot {
    async fn from_context(ctx: &Arc<DispatchContext>) -> ExtractResult<Self> {
        Ok(ctx.bot_arc())
    }
}

/// Optional parameters never fail; the inner error becomes `None`.
#[async_trait]
impl<T: FromContext> FromContext for Option<T> {
    async fn from_context(ctx: &Arc<DispatchContext>) -> ExtractResult<Self> {
        Ok(T::from_context(ctx).await.ok())
    }
}

// ─── Update ───────────────────────────────────────────────────────────────────

/// The update being dispatched.
#[derive(Debug, Clone)]
pub struct UpdateRef(pub Arc<Update>);

impl Deref for UpdateRef {
    type Target = Update;

    fn deref(&self) -> &Update {
        &self.0
    }
}

#[async_trait]
impl FromContext for UpdateRef {
    async fn from_context(ctx: &Arc<DispatchContext>) -> ExtractResult<Self> {
        Ok(UpdateRef(ctx.update_arc()))
    }
}

// ─── Per-user state ───────────────────────────────────────────────────────────

/// The per-user state façade of the update's user.
///
/// Fails with [`ExtractError::NoUser`] for updates without a sender.
#[derive(Debug, Clone)]
pub struct UserState(pub UserStateManager);

impl Deref for UserState {
    type Target = UserStateManager;

    fn deref(&self) -> &UserStateManager {
        &self.0
    }
}

#[async_trait]
impl FromContext for UserState {
    async fn from_context(ctx: &Arc<DispatchContext>) -> ExtractResult<Self> {
        ctx.require_user().map(UserState)
    }
}

/// The user's state at extraction time, read from the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentState(pub Option<State>);

#[async_trait]
impl FromContext for CurrentState {
    async fn from_context(ctx: &Arc<DispatchContext>) -> ExtractResult<Self> {
        let user = ctx.require_user()?;
        Ok(CurrentState(user.get_state().await?))
    }
}

/// The user's data bag at extraction time, read from the storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateData(pub DataMap);

impl StateData {
    /// Deserializes one value, `None` when missing or of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.0
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl Deref for StateData {
    type Target = DataMap;

    fn deref(&self) -> &DataMap {
        &self.0
    }
}

#[async_trait]
impl FromContext for StateData {
    async fn from_context(ctx: &Arc<DispatchContext>) -> ExtractResult<Self> {
        let user = ctx.require_user()?;
        Ok(StateData(user.get_data().await?))
    }
}

// ─── Callback payloads ────────────────────────────────────────────────────────

/// A callback payload published by an [`on_callback`](crate::routing::on_callback)
/// route.
#[derive(Debug, Clone, PartialEq)]
pub struct Callback<T>(pub T);

impl<T> Deref for Callback<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

#[async_trait]
impl<T: CallbackPayload + Clone> FromContext for Callback<T> {
    async fn from_context(ctx: &Arc<DispatchContext>) -> ExtractResult<Self> {
        ctx.get::<Callback<T>>()
            .ok_or(ExtractError::CallbackMissing(T::SHAPE.type_name))
    }
}
