use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::State;
use super::storage::{DataMap, MemoryStorage, StateStorage, UserContext, to_value};
use crate::error::{StorageError, StorageResult};

/// A user identifier that can be turned into a storage key.
///
/// Strings are used as is; integers use their base-10 form.
pub trait UserKey {
    fn to_user_key(&self) -> String;
}

impl UserKey for str {
    fn to_user_key(&self) -> String {
        self.to_string()
    }
}

impl UserKey for String {
    fn to_user_key(&self) -> String {
        self.clone()
    }
}

impl<T: UserKey + ?Sized> UserKey for &T {
    fn to_user_key(&self) -> String {
        (**self).to_user_key()
    }
}

macro_rules! impl_user_key_for_int {
    ($($ty:ty),*) => {
        $(
            impl UserKey for $ty {
                fn to_user_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_user_key_for_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Hands out per-user façades over one shared storage.
///
/// Cloning is cheap; all clones share the storage.
#[derive(Clone)]
pub struct StateManager {
    storage: Arc<dyn StateStorage>,
}

impl Default for StateManager {
    /// A manager backed by a fresh [`MemoryStorage`].
    fn default() -> Self {
        Self::new(MemoryStorage::new())
    }
}

impl fmt::Debug for StateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager").finish_non_exhaustive()
    }
}

impl StateManager {
    pub fn new(storage: impl StateStorage) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Wraps an already shared storage.
    pub fn from_shared(storage: Arc<dyn StateStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn StateStorage> {
        &self.storage
    }

    /// Binds the storage to one user.
    pub fn for_user(&self, user: impl UserKey) -> UserStateManager {
        UserStateManager {
            key: user.to_user_key(),
            storage: Arc::clone(&self.storage),
        }
    }
}

/// State and data operations for a single user.
///
/// Nothing is cached: every call goes to the storage.
#[derive(Clone)]
pub struct UserStateManager {
    key: String,
    storage: Arc<dyn StateStorage>,
}

impl fmt::Debug for UserStateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStateManager")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl UserStateManager {
    /// The storage key of this user.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn get_context(&self) -> StorageResult<UserContext> {
        self.storage.get_context(&self.key).await
    }

    /// Current state, `None` when unset.
    pub async fn get_state(&self) -> StorageResult<Option<State>> {
        let name = self.storage.get_state(&self.key).await?;
        Ok((!name.is_empty()).then(|| State::new(name)))
    }

    /// Sets the state; `None` clears it.
    pub async fn set_state(&self, state: Option<&State>) -> StorageResult<()> {
        match state {
            Some(state) => self.storage.set_state(&self.key, state.name()).await,
            None => self.storage.clear_state(&self.key).await,
        }
    }

    pub async fn clear_state(&self) -> StorageResult<()> {
        self.storage.clear_state(&self.key).await
    }

    pub async fn get_data(&self) -> StorageResult<DataMap> {
        self.storage.get_data(&self.key).await
    }

    /// Merges `data` into the stored bag.
    pub async fn set_data(&self, data: DataMap) -> StorageResult<()> {
        self.storage.upsert_data(&self.key, data).await
    }

    pub async fn get_data_value(&self, key: &str) -> StorageResult<Option<Value>> {
        let mut data = self.storage.get_data(&self.key).await?;
        Ok(data.remove(key))
    }

    pub async fn set_data_value(&self, key: &str, value: impl Into<Value>) -> StorageResult<()> {
        let data = DataMap::from([(key.to_string(), value.into())]);
        self.storage.upsert_data(&self.key, data).await
    }

    /// Reads one data value and deserializes it.
    pub async fn get_value_as<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> StorageResult<Option<T>> {
        match self.get_data_value(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StorageError::conversion(key, e)),
            None => Ok(None),
        }
    }

    /// Serializes a value and stores it under `key`.
    pub async fn set_value_from<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> StorageResult<()> {
        let value = to_value(key, value)?;
        self.set_data_value(key, value).await
    }

    pub async fn clear_data(&self) -> StorageResult<()> {
        self.storage.clear_data(&self.key).await
    }

    /// Merges `data` and, when `state` is given, sets the state.
    ///
    /// Unlike [`set_state`](Self::set_state), `None` leaves the stored state
    /// untouched.
    pub async fn update_context(
        &self,
        state: Option<&State>,
        data: DataMap,
    ) -> StorageResult<()> {
        let name = state.map(State::name).unwrap_or_default();
        self.storage.upsert_context(&self.key, name, data).await
    }

    /// Removes state and data.
    pub async fn clear_all(&self) -> StorageResult<()> {
        self.storage.clear_all(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_user_keys() {
        let manager = StateManager::default();
        assert_eq!(manager.for_user("alice").key(), "alice");
        assert_eq!(manager.for_user(String::from("bob")).key(), "bob");
        assert_eq!(manager.for_user(42_i64).key(), "42");
        assert_eq!(manager.for_user(-7_i32).key(), "-7");
        assert_eq!(manager.for_user(u64::MAX).key(), "18446744073709551615");
    }

    #[tokio::test]
    async fn test_set_state_none_clears() {
        let manager = StateManager::default();
        let user = manager.for_user(1_i64);
        let state = State::new("form.name");

        user.set_state(Some(&state)).await.unwrap();
        assert_eq!(user.get_state().await.unwrap(), Some(state));

        user.set_state(None).await.unwrap();
        assert_eq!(user.get_state().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_context_none_keeps_state() {
        let manager = StateManager::default();
        let user = manager.for_user("u");
        let state = State::new("s");

        user.update_context(Some(&state), DataMap::from([("a".into(), json!(1))]))
            .await
            .unwrap();
        user.update_context(None, DataMap::from([("b".into(), json!(2))]))
            .await
            .unwrap();

        let ctx = user.get_context().await.unwrap();
        assert_eq!(ctx.state, "s");
        assert_eq!(ctx.data.len(), 2);
    }

    #[tokio::test]
    async fn test_data_values() {
        let manager = StateManager::default();
        let user = manager.for_user("u");

        user.set_data_value("name", "Ann").await.unwrap();
        user.set_data_value("age", 30).await.unwrap();
        assert_eq!(user.get_data_value("name").await.unwrap(), Some(json!("Ann")));
        assert_eq!(user.get_data_value("missing").await.unwrap(), None);
        assert_eq!(user.get_data().await.unwrap().len(), 2);

        user.clear_data().await.unwrap();
        assert!(user.get_data().await.unwrap().is_empty());
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u8,
    }

    #[tokio::test]
    async fn test_typed_values() {
        let manager = StateManager::default();
        let user = manager.for_user("u");
        let profile = Profile {
            name: "Ann".into(),
            age: 30,
        };

        user.set_value_from("profile", &profile).await.unwrap();
        let back: Option<Profile> = user.get_value_as("profile").await.unwrap();
        assert_eq!(back, Some(profile));

        user.set_data_value("age", "thirty").await.unwrap();
        let err = user.get_value_as::<u8>("age").await.unwrap_err();
        assert!(matches!(err, StorageError::Conversion { .. }));
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let manager = StateManager::default();
        manager
            .for_user(1_i64)
            .set_state(Some(&State::new("a")))
            .await
            .unwrap();
        assert_eq!(manager.for_user(2_i64).get_state().await.unwrap(), None);

        manager.for_user(1_i64).clear_all().await.unwrap();
        assert_eq!(manager.for_user("1").get_state().await.unwrap(), None);
    }
}
