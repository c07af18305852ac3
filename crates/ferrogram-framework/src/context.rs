//! Per-dispatch context handed to middleware and handlers.
//!
//! One [`DispatchContext`] is created for every incoming update and shared
//! (behind an `Arc`) by every link of the middleware chain and the terminal
//! handler. It carries:
//!
//! - the update and the bot it arrived on
//! - the [`StateManager`] of the dispatcher and the resolved user key
//! - a typed extension map middleware uses to pass values downstream
//!
//! Per-user state is never cached here; the state helpers go to the storage
//! on every call.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use ferrogram_core::{
    BoxedBot, DataMap, State, StateManager, StorageResult, Update, UserStateManager,
};

use crate::error::{ExtractError, ExtractResult};

/// The context object passed through one dispatch.
pub struct DispatchContext {
    update: Arc<Update>,
    bot: BoxedBot,
    states: StateManager,
    user_key: Option<String>,
    extensions: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl DispatchContext {
    /// Creates a context, resolving the user key from the update.
    pub fn new(update: Arc<Update>, bot: BoxedBot, states: StateManager) -> Self {
        let user_key = update.user_key();
        Self {
            update,
            bot,
            states,
            user_key,
            extensions: Mutex::new(HashMap::new()),
        }
    }

    // ─── Update and bot ───────────────────────────────────────────────────────

    pub fn update(&self) -> &Update {
        &self.update
    }

    /// Returns a clone of the update `Arc`.
    pub fn update_arc(&self) -> Arc<Update> {
        Arc::clone(&self.update)
    }

    pub fn bot(&self) -> &BoxedBot {
        &self.bot
    }

    /// Returns a clone of the bot `Arc`.
    pub fn bot_arc(&self) -> BoxedBot {
        Arc::clone(&self.bot)
    }

    // ─── Per-user state ───────────────────────────────────────────────────────

    pub fn state_manager(&self) -> &StateManager {
        &self.states
    }

    /// The storage key of the update's user, if it has one.
    pub fn user_key(&self) -> Option<&str> {
        self.user_key.as_deref()
    }

    /// The per-user state façade, if the update has a user.
    pub fn user(&self) -> Option<UserStateManager> {
        self.user_key.as_deref().map(|key| self.states.for_user(key))
    }

    /// Like [`user`](Self::user), failing with [`ExtractError::NoUser`].
    pub fn require_user(&self) -> ExtractResult<UserStateManager> {
        self.user().ok_or(ExtractError::NoUser)
    }

    /// Reads the current state of the user. Keyless updates have none.
    pub async fn current_state(&self) -> StorageResult<Option<State>> {
        match self.user() {
            Some(user) => user.get_state().await,
            None => Ok(None),
        }
    }

    /// Sets (or with `None`, clears) the state of the user.
    ///
    /// Does nothing for keyless updates.
    pub async fn set_state(&self, state: Option<&State>) -> StorageResult<()> {
        match self.user() {
            Some(user) => user.set_state(state).await,
            None => Ok(()),
        }
    }

    /// Reads the data bag of the user. Keyless updates have an empty bag.
    pub async fn data(&self) -> StorageResult<DataMap> {
        match self.user() {
            Some(user) => user.get_data().await,
            None => Ok(DataMap::new()),
        }
    }

    /// Merges one value into the data bag of the user.
    ///
    /// Does nothing for keyless updates.
    pub async fn set_data_value(&self, key: &str, value: impl Into<Value>) -> StorageResult<()> {
        match self.user() {
            Some(user) => user.set_data_value(key, value).await,
            None => Ok(()),
        }
    }

    // ─── Extensions ───────────────────────────────────────────────────────────

    /// Stores a value for downstream links. One value per type; later calls
    /// overwrite.
    pub fn insert<T: Send + Sync + 'static>(&self, value: T) {
        self.extensions
            .lock()
            .insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a clone of a stored value.
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.extensions
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.extensions.lock().contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns a stored value.
    pub fn remove<T: 'static>(&self) -> Option<T> {
        self.extensions
            .lock()
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

impl std::fmt::Debug for DispatchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchContext")
            .field("update_id", &self.update.update_id)
            .field("kind", &self.update.kind())
            .field("user_key", &self.user_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferrogram_core::{ApiError, ApiResult, BotApi};

    pub(crate) struct NullBot;

    #[async_trait]
    impl BotApi for NullBot {
        async fn call(&self, method: &str, _params: Value) -> ApiResult<Value> {
            Err(ApiError::transport(format!("{method}: offline")))
        }
    }

    pub(crate) fn null_bot() -> BoxedBot {
        Arc::new(NullBot)
    }

    pub(crate) fn text_update(user_id: i64, text: &str) -> Update {
        serde_json::from_value(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "from": { "id": user_id, "is_bot": false, "first_name": "Test" },
                "chat": { "id": user_id, "type": "private" },
                "date": 0,
                "text": text
            }
        }))
        .unwrap()
    }

    pub(crate) fn callback_update(user_id: i64, data: &str) -> Update {
        serde_json::from_value(serde_json::json!({
            "update_id": 2,
            "callback_query": {
                "id": "cq",
                "from": { "id": user_id, "is_bot": false, "first_name": "Test" },
                "chat_instance": "ci",
                "data": data
            }
        }))
        .unwrap()
    }

    pub(crate) fn channel_update(text: &str) -> Update {
        serde_json::from_value(serde_json::json!({
            "update_id": 3,
            "channel_post": {
                "message_id": 11,
                "chat": { "id": -100, "type": "channel", "title": "news" },
                "date": 0,
                "text": text
            }
        }))
        .unwrap()
    }

    fn context(update: Update) -> DispatchContext {
        DispatchContext::new(Arc::new(update), null_bot(), StateManager::default())
    }

    #[test]
    fn test_user_key_resolution() {
        let ctx = context(text_update(7, "hi"));
        assert_eq!(ctx.user_key(), Some("7"));

        let keyless = context(channel_update("post"));
        assert_eq!(keyless.user_key(), None);
        assert!(matches!(keyless.require_user(), Err(ExtractError::NoUser)));
    }

    #[test]
    fn test_extensions() {
        let ctx = context(text_update(1, "hi"));
        assert!(!ctx.contains::<u32>());

        ctx.insert(5_u32);
        ctx.insert(String::from("x"));
        assert_eq!(ctx.get::<u32>(), Some(5));
        assert_eq!(ctx.get::<String>().as_deref(), Some("x"));

        ctx.insert(6_u32);
        assert_eq!(ctx.remove::<u32>(), Some(6));
        assert!(!ctx.contains::<u32>());
    }

    #[tokio::test]
    async fn test_state_helpers_round_trip() {
        let states = StateManager::default();
        let ctx = DispatchContext::new(Arc::new(text_update(3, "hi")), null_bot(), states.clone());
        let step = State::new("form.name");

        ctx.set_state(Some(&step)).await.unwrap();
        assert_eq!(ctx.current_state().await.unwrap(), Some(step.clone()));
        assert_eq!(states.for_user(3_i64).get_state().await.unwrap(), Some(step));

        ctx.set_data_value("name", "Ann").await.unwrap();
        assert_eq!(ctx.data().await.unwrap()["name"], "Ann");
    }

    #[tokio::test]
    async fn test_keyless_state_helpers_are_noops() {
        let states = StateManager::default();
        let ctx = DispatchContext::new(Arc::new(channel_update("post")), null_bot(), states);
        ctx.set_state(Some(&State::new("s"))).await.unwrap();
        assert_eq!(ctx.current_state().await.unwrap(), None);
        assert!(ctx.data().await.unwrap().is_empty());
    }
}
