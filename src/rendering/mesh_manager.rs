//! Event-driven dirty-chunk set plus budgeted remeshing. Producers
//! (interaction, simulation, imports) emit `voxel_changed` events and stay
//! ignorant of meshing; the manager subscribes and rebuilds within its
//! per-tick budget.

use crate::config::MeshConfig;
use crate::core::event::{Event, EventDispatcher, EventValue, ListenerId};
use crate::rendering::mesh::ChunkMeshData;
use crate::rendering::mesher::mesh_chunk;
use crate::world::chunk_coord::ChunkCoord;
use crate::world::grid::ChunkedGrid;
use glam::Vec4;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub const VOXEL_CHANGED_EVENT: &str = "voxel_changed";

/// Fire a `voxel_changed` event carrying the chunk coordinate.
pub fn emit_voxel_changed(dispatcher: &EventDispatcher, cx: i32, cy: i32, cz: i32) {
    let mut event = Event::new(VOXEL_CHANGED_EVENT, "voxel_edit");
    event.set_data("cx", EventValue::Int(cx as i64));
    event.set_data("cy", EventValue::Int(cy as i64));
    event.set_data("cz", EventValue::Int(cz as i64));
    dispatcher.dispatch(&mut event);
}

/// External GPU residency for chunk meshes. Implemented by the renderer
/// backend; the manager only tracks slot handles.
pub trait MeshPool: Send {
    fn allocate(&mut self, mesh: &ChunkMeshData) -> Option<u64>;
    fn free(&mut self, slot: u64);
}

pub struct ChunkMeshManager {
    config: MeshConfig,
    dirty: Arc<Mutex<BTreeSet<ChunkCoord>>>,
    meshes: HashMap<ChunkCoord, ChunkMeshData>,
    slots: HashMap<ChunkCoord, u64>,
    pool: Option<Box<dyn MeshPool>>,
    handler_id: ListenerId,
}

impl ChunkMeshManager {
    /// Subscribes to `voxel_changed` on the dispatcher. Call `detach` before
    /// dropping if the dispatcher outlives the manager.
    pub fn new(dispatcher: &EventDispatcher, config: MeshConfig) -> Self {
        let dirty = Arc::new(Mutex::new(BTreeSet::new()));
        let sink = Arc::clone(&dirty);
        let handler_id = dispatcher.add_listener(
            VOXEL_CHANGED_EVENT,
            move |e: &mut Event| {
                if let (Some(cx), Some(cy), Some(cz)) =
                    (e.int_data("cx"), e.int_data("cy"), e.int_data("cz"))
                {
                    sink.lock()
                        .insert(ChunkCoord::new(cx as i32, cy as i32, cz as i32));
                }
            },
            0,
        );

        Self {
            config,
            dirty,
            meshes: HashMap::new(),
            slots: HashMap::new(),
            pool: None,
            handler_id,
        }
    }

    pub fn detach(&self, dispatcher: &EventDispatcher) {
        dispatcher.remove_listener(VOXEL_CHANGED_EVENT, self.handler_id);
    }

    pub fn set_pool(&mut self, pool: Box<dyn MeshPool>) {
        self.pool = Some(pool);
    }

    /// Idempotent.
    pub fn mark_dirty(&self, cx: i32, cy: i32, cz: i32) {
        self.dirty.lock().insert(ChunkCoord::new(cx, cy, cz));
    }

    /// Remesh up to the per-tick budget of dirty chunks (ascending coordinate
    /// order), replacing stored meshes and pool slots. Returns the number of
    /// chunks processed.
    pub fn update(
        &mut self,
        density: &ChunkedGrid<f32>,
        essence: &ChunkedGrid<Vec4>,
    ) -> usize {
        let batch: Vec<ChunkCoord> = {
            let mut dirty = self.dirty.lock();
            let batch: Vec<ChunkCoord> = dirty
                .iter()
                .take(self.config.max_remesh_per_tick)
                .copied()
                .collect();
            for coord in &batch {
                dirty.remove(coord);
            }
            batch
        };

        for coord in &batch {
            let mesh = mesh_chunk(
                coord,
                density,
                essence,
                self.config.density_threshold,
                self.config.palette_epsilon,
            );

            if let Some(pool) = self.pool.as_mut() {
                if let Some(old_slot) = self.slots.remove(coord) {
                    pool.free(old_slot);
                }
                if !mesh.is_empty() {
                    if let Some(slot) = pool.allocate(&mesh) {
                        self.slots.insert(*coord, slot);
                    }
                }
            }

            self.meshes.insert(*coord, mesh);
        }

        batch.len()
    }

    pub fn mesh_for(&self, coord: &ChunkCoord) -> Option<&ChunkMeshData> {
        self.meshes.get(coord)
    }

    pub fn slot_for(&self, coord: &ChunkCoord) -> Option<u64> {
        self.slots.get(coord).copied()
    }

    pub fn is_dirty(&self, coord: &ChunkCoord) -> bool {
        self.dirty.lock().contains(coord)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.lock().len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Erase from the dirty set, mesh map, and pool slot map.
    pub fn remove_chunk(&mut self, coord: &ChunkCoord) {
        self.dirty.lock().remove(coord);
        self.meshes.remove(coord);
        if let Some(slot) = self.slots.remove(coord) {
            if let Some(pool) = self.pool.as_mut() {
                pool.free(slot);
            }
        }
    }
}
