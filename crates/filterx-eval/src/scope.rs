//! Per-evaluation scope: the weak-reference registry and scratch-variable
//! holder described in §3.5 and §4.6.
//!
//! The original source implements this as an arena of weakref slots owned
//! by the scope, torn down unconditionally at scope exit (§9: "implement as
//! an arena owned by the scope; weakrefs are raw indices that become
//! dangling only when the arena is torn down"). Here the arena is simply
//! `Vec<Object>` — holding a strong `Object` *is* "the bag that keeps the
//! target alive until scope teardown", and a `Weak<ObjectCell>` taken via
//! [`crate::object::Object::downgrade`] is exactly the dangling-on-drop
//! pointer the source describes. `register` is `weakref_set`; letting the
//! `Vec` drop at the end of evaluation is `weakref` teardown.

use crate::object::Object;
use std::collections::HashMap;

/// The per-evaluation scope (§3.5). Single-threaded by construction: it
/// holds `Object`s (`Rc`-based, `!Send`), so it cannot itself cross a
/// thread boundary, enforcing §4.1's ownership-discipline recommendation
/// without any runtime assertion.
pub struct EvalScope {
    /// Strong-reference bag: every object a weakref has ever been taken on
    /// is kept alive here until the scope drops.
    strong_refs: Vec<Object>,
    /// Scratch variables (`$MYVAR`-style names local to one evaluation, as
    /// opposed to record attributes), per §4.3.10.
    scratch: HashMap<String, Object>,
    /// Step/gas counter backing `EvalOptions::step_limit` (§4.7, ambient).
    steps_taken: u64,
    step_limit: Option<u64>,
    /// `format_kv` skips nested dict/list values rather than serializing
    /// them; the source notes this with a debug log (§4.4). There is no
    /// ambient logger in this crate (see SPEC_FULL.md §2), so the count is
    /// exposed here instead, for a host that wants to surface it.
    kv_values_skipped: u64,
}

impl EvalScope {
    pub fn new(step_limit: Option<u64>) -> Self {
        Self {
            strong_refs: Vec::new(),
            scratch: HashMap::new(),
            steps_taken: 0,
            step_limit,
            kv_values_skipped: 0,
        }
    }

    pub fn record_kv_value_skipped(&mut self) {
        self.kv_values_skipped += 1;
    }

    pub fn kv_values_skipped(&self) -> u64 {
        self.kv_values_skipped
    }

    /// `weakref_set`: register `obj` in the bag (keeping it alive for the
    /// scope's lifetime) and hand back a weak reference to it.
    pub fn register_weak(&mut self, obj: &Object) -> std::rc::Weak<crate::object::ObjectCell> {
        let weak = obj.downgrade();
        self.strong_refs.push(obj.clone());
        weak
    }

    pub fn get_scratch(&self, name: &str) -> Option<Object> {
        self.scratch.get(name).cloned()
    }

    pub fn set_scratch(&mut self, name: impl Into<String>, value: Object) {
        self.scratch.insert(name.into(), value);
    }

    /// Consumes one evaluation step; used by node evaluation to bound
    /// pathological trees (e.g. a generator against a huge string). Not a
    /// spec.md feature — see SPEC_FULL.md §4.7.
    pub fn tick(&mut self) -> crate::error::EvalResult<()> {
        self.steps_taken += 1;
        if let Some(limit) = self.step_limit {
            if self.steps_taken > limit {
                return Err(crate::error::EvalError::StepLimitExceeded);
            }
        }
        Ok(())
    }
}

impl Default for EvalScope {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weak_stays_valid_while_scope_lives() {
        let mut scope = EvalScope::default();
        let obj = Object::integer(42);
        let weak = scope.register_weak(&obj);
        drop(obj);
        assert!(Object::upgrade(&weak).is_some());
    }

    #[test]
    fn weak_dangles_after_scope_drop() {
        let obj = Object::integer(42);
        let weak = {
            let mut scope = EvalScope::default();
            let weak = scope.register_weak(&obj);
            drop(obj);
            weak
        };
        assert!(Object::upgrade(&weak).is_none());
    }

    #[test]
    fn step_limit_trips() {
        let mut scope = EvalScope::new(Some(2));
        assert!(scope.tick().is_ok());
        assert!(scope.tick().is_ok());
        assert!(scope.tick().is_err());
    }
}
