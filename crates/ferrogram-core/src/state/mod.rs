//! Per-user finite-state-machine support.
//!
//! - [`State`] / [`StateGroup`] name conversation steps.
//! - [`StateFilter`] decides whether a route applies to the current state.
//! - [`StateStorage`] is the persistence boundary, with [`MemoryStorage`] as
//!   the in-process backend.
//! - [`StateManager`] hands out per-user façades over a shared storage.
//!
//! ```rust,ignore
//! let mut form = StateGroup::new("form");
//! let ask_name = form.add("name");
//! let ask_age = form.add("age");
//!
//! let manager = StateManager::default();
//! let user = manager.for_user(42_i64);
//! user.set_state(Some(&ask_name)).await?;
//! assert_eq!(user.get_state().await?, Some(ask_name));
//! ```

mod filter;
mod manager;
mod storage;

pub use filter::StateFilter;
pub use manager::{StateManager, UserKey, UserStateManager};
pub use storage::{DataMap, MemoryStorage, StateStorage, UserContext};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A named conversation step. Two states are equal when their names are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    name: String,
}

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for State {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for State {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for State {
    fn eq(&self, other: &str) -> bool {
        self.name == other
    }
}

impl PartialEq<&str> for State {
    fn eq(&self, other: &&str) -> bool {
        self.name == *other
    }
}

/// A namespace of related states labelled `"<group>.<member>"`.
#[derive(Debug, Clone, Default)]
pub struct StateGroup {
    name: String,
    states: BTreeMap<String, State>,
}

impl StateGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: BTreeMap::new(),
        }
    }

    /// Adds a member and returns its state.
    pub fn add(&mut self, member: impl Into<String>) -> State {
        let member = member.into();
        let state = State::new(format!("{}.{}", self.name, member));
        self.states.insert(member, state.clone());
        state
    }

    /// Looks up a member by its short name.
    pub fn get(&self, member: &str) -> Option<&State> {
        self.states.get(member)
    }

    /// All members, keyed by short name.
    pub fn states(&self) -> &BTreeMap<String, State> {
        &self.states
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A filter matching any member of this group.
    pub fn any(&self) -> StateFilter {
        StateFilter::in_states(self.states.values().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_equality() {
        assert_eq!(State::new("a"), State::from("a"));
        assert_ne!(State::new("a"), State::new("b"));
        assert!(State::new("form.name") == "form.name");
    }

    #[test]
    fn test_state_group() {
        let mut form = StateGroup::new("form");
        let name = form.add("name");
        form.add("age");

        assert_eq!(name.name(), "form.name");
        assert_eq!(form.get("name"), Some(&name));
        assert!(form.get("email").is_none());
        assert_eq!(form.states().len(), 2);
        assert_eq!(form.name(), "form");

        let any = form.any();
        assert!(any.check(Some(&State::new("form.age"))));
        assert!(!any.check(Some(&State::new("other.age"))));
        assert!(!any.check(None));
    }
}
