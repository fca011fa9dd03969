//! Top-level application mode FSM. Game is the hub; overlay modes transit
//! through it, with an escape hatch from any overlay to Paused.

use crate::core::state_machine::StateMachine;
use log::{error, info};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppMode {
    Game,
    Paused,
    Console,
    Menu,
    Editor,
}

/// Input/simulation routing per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppModeFlags {
    pub capture_mouse: bool,
    pub pause_simulation: bool,
    pub route_to_ui: bool,
    pub route_to_game: bool,
}

static TRANSITIONS: Lazy<HashSet<(AppMode, AppMode)>> = Lazy::new(|| {
    use AppMode::*;
    HashSet::from([
        // Esc: Game <-> Paused
        (Game, Paused),
        (Paused, Game),
        // Backtick: Game <-> Console
        (Game, Console),
        (Console, Game),
        // F7: Game <-> Editor
        (Game, Editor),
        (Editor, Game),
        // F11: Game <-> Menu
        (Game, Menu),
        (Menu, Game),
        // Esc from overlay modes -> Paused
        (Console, Paused),
        (Editor, Paused),
        (Menu, Paused),
    ])
});

pub type ObserverId = u64;

type Observer = Arc<dyn Fn(AppMode, AppMode) + Send + Sync>;

pub struct AppModeManager {
    sm: StateMachine<AppMode>,
    previous: Mutex<AppMode>,
    observers: Mutex<Vec<(ObserverId, Observer)>>,
    next_observer_id: AtomicU64,
}

impl Default for AppModeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AppModeManager {
    pub fn new() -> Self {
        let sm = StateMachine::new(AppMode::Game);
        for &(from, to) in TRANSITIONS.iter() {
            sm.add_transition(from, to);
        }
        Self {
            sm,
            previous: Mutex::new(AppMode::Game),
            observers: Mutex::new(Vec::new()),
            next_observer_id: AtomicU64::new(0),
        }
    }

    /// Attempt a mode change; invalid transitions are rejected. Observers
    /// run after the state is committed.
    pub fn transition(&self, target: AppMode) -> bool {
        let old = self.sm.state();
        if old == target {
            return true;
        }
        if self.sm.set_state(target).is_err() {
            return false;
        }
        *self.previous.lock() = old;
        info!("app mode: {:?} -> {:?}", old, target);

        let observers: Vec<Observer> = self
            .observers
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for observer in observers {
            if catch_unwind(AssertUnwindSafe(|| (*observer)(old, target))).is_err() {
                error!("panic in app mode observer");
            }
        }
        true
    }

    pub fn toggle_pause(&self) {
        match self.current() {
            AppMode::Game => {
                self.transition(AppMode::Paused);
            }
            AppMode::Paused => {
                self.transition(AppMode::Game);
            }
            _ => {}
        }
    }

    pub fn current(&self) -> AppMode {
        self.sm.state()
    }

    pub fn previous(&self) -> AppMode {
        *self.previous.lock()
    }

    pub fn flags(mode: AppMode) -> AppModeFlags {
        match mode {
            AppMode::Game => AppModeFlags {
                capture_mouse: true,
                pause_simulation: false,
                route_to_ui: false,
                route_to_game: true,
            },
            AppMode::Paused => AppModeFlags {
                capture_mouse: false,
                pause_simulation: true,
                route_to_ui: true,
                route_to_game: false,
            },
            AppMode::Console => AppModeFlags {
                capture_mouse: false,
                pause_simulation: false,
                route_to_ui: true,
                route_to_game: true,
            },
            AppMode::Menu | AppMode::Editor => AppModeFlags {
                capture_mouse: false,
                pause_simulation: true,
                route_to_ui: true,
                route_to_game: false,
            },
        }
    }

    pub fn is_valid_transition(from: AppMode, to: AppMode) -> bool {
        from == to || TRANSITIONS.contains(&(from, to))
    }

    pub fn add_observer<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(AppMode, AppMode) + Send + Sync + 'static,
    {
        let id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }
}
