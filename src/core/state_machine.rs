//! Generic state machine with a configurable transition set and per-state /
//! per-transition hooks. Public methods are thread-safe; hooks observe the
//! committed state and their panics are isolated.

use crate::utils::error::{FabricError, Result};
use log::{debug, error};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type HookId = u64;

type Hook = Arc<dyn Fn() + Send + Sync>;

struct HookEntry {
    id: HookId,
    hook: Hook,
}

pub struct StateMachine<S> {
    state: Mutex<S>,
    transitions: Mutex<HashSet<(S, S)>>,
    state_hooks: Mutex<HashMap<S, Vec<HookEntry>>>,
    transition_hooks: Mutex<HashMap<(S, S), Vec<HookEntry>>>,
    next_hook_id: AtomicU64,
}

impl<S> StateMachine<S>
where
    S: Copy + Eq + Hash + Debug + Send + 'static,
{
    pub fn new(initial: S) -> Self {
        Self {
            state: Mutex::new(initial),
            transitions: Mutex::new(HashSet::new()),
            state_hooks: Mutex::new(HashMap::new()),
            transition_hooks: Mutex::new(HashMap::new()),
            next_hook_id: AtomicU64::new(0),
        }
    }

    pub fn add_transition(&self, from: S, to: S) {
        self.transitions.lock().insert((from, to));
    }

    pub fn state(&self) -> S {
        *self.state.lock()
    }

    /// `true` for self-transitions and registered pairs.
    pub fn is_valid_transition(&self, from: S, to: S) -> bool {
        from == to || self.transitions.lock().contains(&(from, to))
    }

    /// Commit a transition, then run hooks for the new state and for the
    /// `(old, new)` pair. Self-transitions are no-ops; unregistered
    /// transitions fail without mutating state.
    pub fn set_state(&self, target: S) -> Result<()> {
        let old = {
            let mut state = self.state.lock();
            if *state == target {
                return Ok(());
            }
            if !self.transitions.lock().contains(&(*state, target)) {
                return Err(FabricError::InvalidState(format!(
                    "invalid state transition from {:?} to {:?}",
                    *state, target
                )));
            }
            let old = *state;
            *state = target;
            old
        };

        debug!("state transition: {:?} -> {:?}", old, target);

        let mut hooks: Vec<Hook> = Vec::new();
        if let Some(entries) = self.state_hooks.lock().get(&target) {
            hooks.extend(entries.iter().map(|e| Arc::clone(&e.hook)));
        }
        if let Some(entries) = self.transition_hooks.lock().get(&(old, target)) {
            hooks.extend(entries.iter().map(|e| Arc::clone(&e.hook)));
        }

        for hook in hooks {
            if catch_unwind(AssertUnwindSafe(|| (*hook)())).is_err() {
                error!("panic in state hook for {:?}", target);
            }
        }

        Ok(())
    }

    pub fn add_hook<F>(&self, state: S, hook: F) -> HookId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_hook_id.fetch_add(1, Ordering::Relaxed);
        self.state_hooks.lock().entry(state).or_default().push(HookEntry {
            id,
            hook: Arc::new(hook),
        });
        id
    }

    pub fn add_transition_hook<F>(&self, from: S, to: S, hook: F) -> HookId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_hook_id.fetch_add(1, Ordering::Relaxed);
        self.transition_hooks
            .lock()
            .entry((from, to))
            .or_default()
            .push(HookEntry {
                id,
                hook: Arc::new(hook),
            });
        id
    }

    pub fn remove_hook(&self, hook_id: HookId) -> bool {
        for entries in self.state_hooks.lock().values_mut() {
            let before = entries.len();
            entries.retain(|e| e.id != hook_id);
            if entries.len() != before {
                return true;
            }
        }
        for entries in self.transition_hooks.lock().values_mut() {
            let before = entries.len();
            entries.retain(|e| e.id != hook_id);
            if entries.len() != before {
                return true;
            }
        }
        false
    }
}
