//! Sparse chunked storage for scalar and vector voxel fields. Reads of
//! unloaded chunks return defaults without allocating; the first write to a
//! chunk allocates it and adds it to the active set.

use crate::world::chunk_coord::{cell_index, local_coord, ChunkCoord, CHUNK_SIZE, CHUNK_VOLUME};
use glam::Vec4;
use std::collections::HashMap;

/// Values read at the six face-adjacent cells of a voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbors<T> {
    pub pos_x: T,
    pub neg_x: T,
    pub pos_y: T,
    pub neg_y: T,
    pub pos_z: T,
    pub neg_z: T,
}

/// Sparse mapping from chunk coordinate to a dense S^3 cell array.
pub struct ChunkedGrid<T> {
    chunks: HashMap<ChunkCoord, Box<[T]>>,
}

impl<T: Copy + Default> Default for ChunkedGrid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default> ChunkedGrid<T> {
    pub fn new() -> Self {
        Self {
            chunks: HashMap::new(),
        }
    }

    /// Read a cell; unloaded chunks yield `T::default()` and stay unloaded.
    pub fn get(&self, x: i32, y: i32, z: i32) -> T {
        match self.chunks.get(&ChunkCoord::from_world(x, y, z)) {
            Some(cells) => cells[cell_index(local_coord(x), local_coord(y), local_coord(z))],
            None => T::default(),
        }
    }

    /// Write a cell, allocating and activating its chunk on first touch.
    pub fn set(&mut self, x: i32, y: i32, z: i32, value: T) {
        let coord = ChunkCoord::from_world(x, y, z);
        let cells = self
            .chunks
            .entry(coord)
            .or_insert_with(|| vec![T::default(); CHUNK_VOLUME].into_boxed_slice());
        cells[cell_index(local_coord(x), local_coord(y), local_coord(z))] = value;
    }

    /// Drop a chunk's storage and active-set entry.
    pub fn remove_chunk(&mut self, coord: &ChunkCoord) -> bool {
        self.chunks.remove(coord).is_some()
    }

    pub fn is_active(&self, coord: &ChunkCoord) -> bool {
        self.chunks.contains_key(coord)
    }

    pub fn active_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Coordinates of every chunk that has ever been written to, sorted so
    /// iteration order is deterministic.
    pub fn active_chunks(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self.chunks.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Six face-adjacent cell values, crossing chunk boundaries transparently.
    pub fn neighbors(&self, x: i32, y: i32, z: i32) -> Neighbors<T> {
        Neighbors {
            pos_x: self.get(x + 1, y, z),
            neg_x: self.get(x - 1, y, z),
            pos_y: self.get(x, y + 1, z),
            neg_y: self.get(x, y - 1, z),
            pos_z: self.get(x, y, z + 1),
            neg_z: self.get(x, y, z - 1),
        }
    }

    /// Visit every cell of an active chunk in dense order, yielding world
    /// coordinates. No-op for unloaded chunks.
    pub fn for_each_cell(&self, coord: &ChunkCoord, mut visitor: impl FnMut(i32, i32, i32, T)) {
        let Some(cells) = self.chunks.get(coord) else {
            return;
        };
        let (bx, by, bz) = coord.base();
        for lz in 0..CHUNK_SIZE {
            for ly in 0..CHUNK_SIZE {
                for lx in 0..CHUNK_SIZE {
                    let value = cells[cell_index(lx as usize, ly as usize, lz as usize)];
                    visitor(bx + lx, by + ly, bz + lz, value);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

/// Thin typed facade over a `ChunkedGrid`.
pub struct FieldLayer<T> {
    grid: ChunkedGrid<T>,
}

impl<T: Copy + Default> Default for FieldLayer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default> FieldLayer<T> {
    pub fn new() -> Self {
        Self {
            grid: ChunkedGrid::new(),
        }
    }

    pub fn read(&self, x: i32, y: i32, z: i32) -> T {
        self.grid.get(x, y, z)
    }

    pub fn write(&mut self, x: i32, y: i32, z: i32, value: T) {
        self.grid.set(x, y, z, value);
    }

    pub fn grid(&self) -> &ChunkedGrid<T> {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut ChunkedGrid<T> {
        &mut self.grid
    }
}

/// Scalar solidity field; the mesh threshold defines the surface.
pub type DensityField = FieldLayer<f32>;
/// RGBA material field quantized to palette indices during meshing.
pub type EssenceField = FieldLayer<Vec4>;
