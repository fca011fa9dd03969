//! Global timeline: pausable scaled time, per-region time scales, rolling
//! auto-snapshots, and snapshot-based restore. All public methods are safe to
//! call from multiple threads.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Upper bound on the rolling snapshot history.
pub const MAX_HISTORY_SIZE: usize = 100;

/// Immutable timestamped record sufficient to restore timeline state, plus a
/// per-entity binary blob map for anything else callers want carried along.
#[derive(Debug, Clone, Default)]
pub struct TimeState {
    timestamp: f64,
    entity_states: HashMap<String, Vec<u8>>,
}

impl TimeState {
    pub fn new(timestamp: f64) -> Self {
        Self {
            timestamp,
            entity_states: HashMap::new(),
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn set_entity_state<T: Serialize>(&mut self, entity_id: &str, state: &T) {
        if let Ok(blob) = bincode::serialize(state) {
            self.entity_states.insert(entity_id.to_string(), blob);
        }
    }

    pub fn entity_state<T: DeserializeOwned>(&self, entity_id: &str) -> Option<T> {
        let blob = self.entity_states.get(entity_id)?;
        bincode::deserialize(blob).ok()
    }

    pub fn entity_count(&self) -> usize {
        self.entity_states.len()
    }
}

pub type RegionId = u64;

#[derive(Debug, Clone)]
struct TimeRegion {
    id: RegionId,
    time_scale: f64,
    local_time: f64,
}

#[derive(Debug, Default)]
struct TimelineInner {
    current_time: f64,
    global_time_scale: f64,
    paused: bool,
    automatic_snapshots: bool,
    snapshot_interval: f64,
    snapshot_counter: f64,
    history: VecDeque<TimeState>,
    regions: Vec<TimeRegion>,
    next_region_id: RegionId,
}

pub struct Timeline {
    inner: Mutex<TimelineInner>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TimelineInner {
                global_time_scale: 1.0,
                snapshot_interval: 1.0,
                ..TimelineInner::default()
            }),
        }
    }

    /// Advance global and per-region time by a scaled delta. While paused,
    /// nothing advances and no snapshots are taken. Automatic snapshots fire
    /// once per whole interval of unpaused wall time.
    pub fn update(&self, dt: f64) {
        let mut inner = self.inner.lock();
        if inner.paused {
            return;
        }

        let scaled = dt * inner.global_time_scale;
        inner.current_time += scaled;

        if inner.automatic_snapshots {
            inner.snapshot_counter += dt;
            while inner.snapshot_counter >= inner.snapshot_interval {
                let snapshot = TimeState::new(inner.current_time);
                inner.history.push_back(snapshot);
                inner.snapshot_counter -= inner.snapshot_interval;
                if inner.history.len() > MAX_HISTORY_SIZE {
                    inner.history.pop_front();
                }
            }
        }

        for region in &mut inner.regions {
            region.local_time += scaled * region.time_scale;
        }
    }

    pub fn create_region(&self, time_scale: f64) -> RegionId {
        let mut inner = self.inner.lock();
        let id = inner.next_region_id;
        inner.next_region_id += 1;
        inner.regions.push(TimeRegion {
            id,
            time_scale,
            local_time: 0.0,
        });
        id
    }

    pub fn remove_region(&self, id: RegionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.regions.len();
        inner.regions.retain(|r| r.id != id);
        inner.regions.len() != before
    }

    pub fn region_local_time(&self, id: RegionId) -> Option<f64> {
        self.inner
            .lock()
            .regions
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.local_time)
    }

    pub fn region_time_scale(&self, id: RegionId) -> Option<f64> {
        self.inner
            .lock()
            .regions
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.time_scale)
    }

    pub fn set_region_time_scale(&self, id: RegionId, scale: f64) -> bool {
        let mut inner = self.inner.lock();
        if let Some(region) = inner.regions.iter_mut().find(|r| r.id == id) {
            region.time_scale = scale;
            true
        } else {
            false
        }
    }

    pub fn region_count(&self) -> usize {
        self.inner.lock().regions.len()
    }

    pub fn current_time(&self) -> f64 {
        self.inner.lock().current_time
    }

    pub fn set_current_time(&self, time: f64) {
        self.inner.lock().current_time = time;
    }

    pub fn global_time_scale(&self) -> f64 {
        self.inner.lock().global_time_scale
    }

    pub fn set_global_time_scale(&self, scale: f64) {
        self.inner.lock().global_time_scale = scale;
    }

    pub fn pause(&self) {
        self.inner.lock().paused = true;
    }

    pub fn resume(&self) {
        self.inner.lock().paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    pub fn set_automatic_snapshots(&self, enable: bool, interval: f64) {
        let mut inner = self.inner.lock();
        inner.automatic_snapshots = enable;
        inner.snapshot_interval = interval;
        inner.snapshot_counter = 0.0;
    }

    pub fn create_snapshot(&self) -> TimeState {
        TimeState::new(self.inner.lock().current_time)
    }

    pub fn restore_snapshot(&self, state: &TimeState) {
        let mut inner = self.inner.lock();
        Self::restore_locked(&mut inner, state.timestamp());
    }

    pub fn history(&self) -> Vec<TimeState> {
        self.inner.lock().history.iter().cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }

    pub fn push_history(&self, state: TimeState) {
        let mut inner = self.inner.lock();
        inner.history.push_back(state);
        if inner.history.len() > MAX_HISTORY_SIZE {
            inner.history.pop_front();
        }
    }

    pub fn clear_history(&self) {
        self.inner.lock().history.clear();
    }

    /// Restore global time and every region's local time from the indexed
    /// snapshot. Out-of-range indices return `false` and change nothing.
    pub fn jump_to_snapshot(&self, index: usize) -> bool {
        let mut inner = self.inner.lock();
        let Some(timestamp) = inner.history.get(index).map(|s| s.timestamp()) else {
            return false;
        };
        Self::restore_locked(&mut inner, timestamp);
        true
    }

    fn restore_locked(inner: &mut TimelineInner, timestamp: f64) {
        inner.current_time = timestamp;
        for region in &mut inner.regions {
            region.local_time = timestamp;
        }
    }
}
