//! Bounding volume hierarchy built by longest-axis centroid median split.
//! Append-only: inserts mark the tree dirty and the next query rebuilds.

use crate::utils::math::{Aabb, CullResult, Frustum};

struct Item<T> {
    bounds: Aabb,
    data: T,
}

#[derive(Clone, Copy)]
struct Node {
    bounds: Aabb,
    left: i32,
    right: i32,
    item_index: i32,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            bounds: Aabb::default(),
            left: -1,
            right: -1,
            item_index: -1,
        }
    }
}

pub struct Bvh<T> {
    items: Vec<Item<T>>,
    nodes: Vec<Node>,
    root: i32,
    dirty: bool,
}

impl<T> Default for Bvh<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Bvh<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            nodes: Vec::new(),
            root: -1,
            dirty: true,
        }
    }

    pub fn insert(&mut self, bounds: Aabb, data: T) {
        self.items.push(Item { bounds, data });
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.nodes.clear();
        self.root = -1;
        self.dirty = true;
    }

    pub fn build(&mut self) {
        self.nodes.clear();
        self.root = -1;

        if self.items.is_empty() {
            self.dirty = false;
            return;
        }

        let count = self.items.len();
        let mut indices: Vec<usize> = (0..count).collect();
        // Worst case 2n - 1 nodes for n leaves
        self.nodes.reserve(count * 2);
        self.nodes.push(Node::default());
        self.root = 0;

        self.build_recursive(0, &mut indices, 0, count);
        self.dirty = false;
    }

    fn build_recursive(&mut self, node_index: usize, indices: &mut [usize], start: usize, end: usize) {
        let mut bounds = self.items[indices[start]].bounds;
        for &i in &indices[start + 1..end] {
            bounds = bounds.union(&self.items[i].bounds);
        }
        self.nodes[node_index].bounds = bounds;

        // Leaf: single item
        if end - start == 1 {
            self.nodes[node_index].item_index = indices[start] as i32;
            return;
        }

        let size = bounds.max - bounds.min;
        let axis = if size.y > size.x && size.y > size.z {
            1
        } else if size.z > size.x && size.z > size.y {
            2
        } else {
            0
        };

        let items = &self.items;
        indices[start..end].sort_by(|&a, &b| {
            let ca = items[a].bounds.center()[axis];
            let cb = items[b].bounds.center()[axis];
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mid = start + (end - start) / 2;

        self.nodes.push(Node::default());
        let left = self.nodes.len() - 1;
        self.nodes.push(Node::default());
        let right = self.nodes.len() - 1;

        self.nodes[node_index].left = left as i32;
        self.nodes[node_index].right = right as i32;

        self.build_recursive(left, indices, start, mid);
        self.build_recursive(right, indices, mid, end);
    }

    fn ensure_built(&mut self) {
        if self.dirty {
            self.build();
        }
    }

    /// Every item whose bounds intersect the region. Rebuilds first if dirty.
    pub fn query(&mut self, region: &Aabb) -> Vec<&T> {
        self.ensure_built();
        let mut results = Vec::new();
        if self.root >= 0 {
            self.query_recursive(self.root as usize, region, &mut results);
        }
        results
    }

    fn query_recursive<'a>(&'a self, node_index: usize, region: &Aabb, results: &mut Vec<&'a T>) {
        let node = &self.nodes[node_index];
        if !node.bounds.intersects(region) {
            return;
        }
        if node.item_index >= 0 {
            results.push(&self.items[node.item_index as usize].data);
            return;
        }
        if node.left >= 0 {
            self.query_recursive(node.left as usize, region, results);
        }
        if node.right >= 0 {
            self.query_recursive(node.right as usize, region, results);
        }
    }

    /// Every item not fully outside the frustum. Rebuilds first if dirty.
    pub fn query_frustum(&mut self, frustum: &Frustum) -> Vec<&T> {
        self.ensure_built();
        let mut results = Vec::new();
        if self.root >= 0 {
            self.query_frustum_recursive(self.root as usize, frustum, &mut results);
        }
        results
    }

    fn query_frustum_recursive<'a>(
        &'a self,
        node_index: usize,
        frustum: &Frustum,
        results: &mut Vec<&'a T>,
    ) {
        let node = &self.nodes[node_index];
        if frustum.test_aabb(&node.bounds) == CullResult::Outside {
            return;
        }
        if node.item_index >= 0 {
            results.push(&self.items[node.item_index as usize].data);
            return;
        }
        if node.left >= 0 {
            self.query_frustum_recursive(node.left as usize, frustum, results);
        }
        if node.right >= 0 {
            self.query_frustum_recursive(node.right as usize, frustum, results);
        }
    }
}

impl<T: PartialEq> Bvh<T> {
    /// Linear scan removal by value.
    pub fn remove(&mut self, data: &T) -> bool {
        if let Some(pos) = self.items.iter().position(|item| &item.data == data) {
            self.items.remove(pos);
            self.dirty = true;
            true
        } else {
            false
        }
    }
}
