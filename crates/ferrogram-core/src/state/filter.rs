use super::State;

/// A predicate over the current (possibly absent) state of a user.
///
/// | Constructor | Passes when |
/// |---|---|
/// | [`ignore_state`](Self::ignore_state) | always |
/// | [`no_state`](Self::no_state) | the user has no state |
/// | [`in_state`](Self::in_state) / [`in_states`](Self::in_states) | the state is one of the listed ones |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateFilter {
    states: Vec<State>,
    ignore_state: bool,
    match_any: bool,
    allow_no_state: bool,
}

impl StateFilter {
    /// Passes only in the given state.
    pub fn in_state(state: &State) -> Self {
        Self::in_states([state.clone()])
    }

    /// Passes in any of the given states.
    pub fn in_states(states: impl IntoIterator<Item = State>) -> Self {
        let states: Vec<State> = states.into_iter().collect();
        Self {
            match_any: states.len() > 1,
            states,
            ..Default::default()
        }
    }

    /// Always passes.
    pub fn ignore_state() -> Self {
        Self {
            ignore_state: true,
            ..Default::default()
        }
    }

    /// Passes only when the user has no state.
    pub fn no_state() -> Self {
        Self {
            allow_no_state: true,
            ..Default::default()
        }
    }

    /// Evaluates the filter. An empty state name counts as no state.
    pub fn check(&self, current: Option<&State>) -> bool {
        if self.ignore_state {
            return true;
        }

        let Some(current) = current.filter(|s| !s.name().is_empty()) else {
            return self.allow_no_state || self.states.is_empty();
        };

        if self.states.is_empty() {
            return !self.allow_no_state;
        }
        self.states.iter().any(|s| s == current)
    }

    /// Union: passes if either side would.
    pub fn or(&self, other: &StateFilter) -> StateFilter {
        StateFilter {
            states: self.states.iter().chain(&other.states).cloned().collect(),
            ignore_state: self.ignore_state || other.ignore_state,
            match_any: true,
            allow_no_state: self.allow_no_state || other.allow_no_state,
        }
    }

    /// Conjunction of the flags, keeping only the state set of `self`.
    ///
    /// `other`'s states are dropped. Use [`intersect`](Self::intersect) for a
    /// conjunction over both state sets.
    pub fn and(&self, other: &StateFilter) -> StateFilter {
        StateFilter {
            states: self.states.clone(),
            ignore_state: self.ignore_state && other.ignore_state,
            match_any: false,
            allow_no_state: self.allow_no_state && other.allow_no_state,
        }
    }

    /// Conjunction over both state sets.
    ///
    /// A side without states constrains nothing, so the other side's set is
    /// kept as is; otherwise only states listed on both sides remain.
    pub fn intersect(&self, other: &StateFilter) -> StateFilter {
        let states = match (self.states.is_empty(), other.states.is_empty()) {
            (true, _) => other.states.clone(),
            (_, true) => self.states.clone(),
            _ => self
                .states
                .iter()
                .filter(|s| other.states.contains(s))
                .cloned()
                .collect(),
        };
        StateFilter {
            match_any: states.len() > 1,
            states,
            ignore_state: self.ignore_state && other.ignore_state,
            allow_no_state: self.allow_no_state && other.allow_no_state,
        }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn is_ignore_state(&self) -> bool {
        self.ignore_state
    }

    pub fn allows_no_state(&self) -> bool {
        self.allow_no_state
    }

    pub fn matches_any(&self) -> bool {
        self.match_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(name: &str) -> State {
        State::new(name)
    }

    #[test]
    fn test_check_table() {
        let a = s("a");
        let b = s("b");
        let empty = s("");

        let ignore = StateFilter::ignore_state();
        assert!(ignore.check(None));
        assert!(ignore.check(Some(&a)));

        let none = StateFilter::no_state();
        assert!(none.check(None));
        assert!(none.check(Some(&empty)));
        assert!(!none.check(Some(&a)));

        let in_a = StateFilter::in_state(&a);
        assert!(in_a.check(Some(&a)));
        assert!(!in_a.check(Some(&b)));
        assert!(!in_a.check(None));
        assert!(!in_a.matches_any());

        let any = StateFilter::default();
        assert!(any.check(None));
        assert!(any.check(Some(&b)));
    }

    #[test]
    fn test_or_unions() {
        let f = StateFilter::in_state(&s("a")).or(&StateFilter::in_state(&s("b")));
        assert!(f.check(Some(&s("a"))));
        assert!(f.check(Some(&s("b"))));
        assert!(!f.check(None));
        assert!(f.matches_any());

        let with_none = StateFilter::in_state(&s("a")).or(&StateFilter::no_state());
        assert!(with_none.check(None));
        assert!(with_none.check(Some(&s("a"))));
        assert!(!with_none.check(Some(&s("c"))));
    }

    #[test]
    fn test_and_keeps_left_states() {
        let left = StateFilter::in_state(&s("a"));
        let right = StateFilter::in_state(&s("b"));
        let f = left.and(&right);
        assert_eq!(f.states(), [s("a")]);
        assert!(f.check(Some(&s("a"))));
        assert!(!f.check(Some(&s("b"))));
    }

    #[test]
    fn test_intersect() {
        let ab = StateFilter::in_states([s("a"), s("b")]);
        let bc = StateFilter::in_states([s("b"), s("c")]);
        let f = ab.intersect(&bc);
        assert_eq!(f.states(), [s("b")]);
        assert!(!f.check(Some(&s("a"))));

        let unconstrained = ab.intersect(&StateFilter::default());
        assert_eq!(unconstrained.states().len(), 2);
    }
}
