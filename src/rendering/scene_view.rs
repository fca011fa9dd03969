//! Frustum culling over ECS entities and per-frame render-list assembly:
//! cull, partition into opaque/transparent, sort transparents back-to-front,
//! and hand draw calls to an external renderer.

use crate::ecs::{
    BoundingBox, ChildOf, EntityId, Position, Renderable, Rotation, Scale, TransparentTag, World,
};
use crate::rendering::camera::Camera;
use crate::utils::math::{Aabb, CullResult, Frustum};
use glam::{Mat4, Quat, Vec3};

/// One draw submission. Handles are opaque u16s owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub sort_key: u64,
    pub transform: [f32; 16],
    pub program: u16,
    pub vertex_buffer: u16,
    pub index_buffer: u16,
    pub index_count: u32,
    pub index_offset: u32,
    pub view_id: u8,
}

impl Default for DrawCall {
    fn default() -> Self {
        Self {
            sort_key: 0,
            transform: Mat4::IDENTITY.to_cols_array(),
            program: 0,
            vertex_buffer: 0,
            index_buffer: 0,
            index_count: 0,
            index_offset: 0,
            view_id: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct RenderList {
    calls: Vec<DrawCall>,
}

impl RenderList {
    pub fn add(&mut self, call: DrawCall) {
        self.calls.push(call);
    }

    pub fn sort_by_key(&mut self) {
        self.calls.sort_by_key(|c| c.sort_key);
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// GPU submission boundary; the runtime never talks to a graphics API
/// directly.
pub trait Renderer {
    fn set_clear_color(&mut self, view_id: u8, rgba: u32);
    fn submit(&mut self, call: &DrawCall);
}

/// Flat frustum culling over entities with Position. Entities without a
/// BoundingBox are always kept.
pub struct FrustumCuller;

impl FrustumCuller {
    pub fn cull(view_proj: &Mat4, world: &World) -> Vec<EntityId> {
        let frustum = Frustum::from_view_projection(view_proj);
        world
            .entities_with::<Position>()
            .into_iter()
            .filter(|&entity| match world.get::<BoundingBox>(entity) {
                Some(bbox) => {
                    let aabb = Aabb::new(
                        Vec3::new(bbox.min_x, bbox.min_y, bbox.min_z),
                        Vec3::new(bbox.max_x, bbox.max_y, bbox.max_z),
                    );
                    frustum.test_aabb(&aabb) != CullResult::Outside
                }
                None => true,
            })
            .collect()
    }
}

/// Compose an entity's world matrix through its ChildOf chain.
pub fn global_transform(world: &World, entity: EntityId) -> Mat4 {
    let local = local_transform(world, entity);
    match world.get::<ChildOf>(entity) {
        Some(parent) => global_transform(world, parent.0) * local,
        None => local,
    }
}

fn local_transform(world: &World, entity: EntityId) -> Mat4 {
    let position = world
        .get::<Position>(entity)
        .map_or(Vec3::ZERO, |p| Vec3::new(p.x, p.y, p.z));
    let rotation = world
        .get::<Rotation>(entity)
        .map_or(Quat::IDENTITY, |r| Quat::from_xyzw(r.x, r.y, r.z, r.w));
    let scale = world
        .get::<Scale>(entity)
        .map_or(Vec3::ONE, |s| Vec3::new(s.x, s.y, s.z));
    Mat4::from_scale_rotation_translation(scale, rotation, position)
}

/// Owns a view id and drives the per-frame pipeline: cull, partition, sort,
/// submit. Opaque pass is `view_id + 1`, transparent pass `view_id + 2`.
pub struct SceneView {
    view_id: u8,
    clear_color: u32,
    render_list: RenderList,
    visible: Vec<EntityId>,
}

impl SceneView {
    pub fn new(view_id: u8) -> Self {
        Self {
            view_id,
            clear_color: 0x303030ff,
            render_list: RenderList::default(),
            visible: Vec::new(),
        }
    }

    pub fn view_id(&self) -> u8 {
        self.view_id
    }

    pub fn set_clear_color(&mut self, rgba: u32) {
        self.clear_color = rgba;
    }

    pub fn visible_entities(&self) -> &[EntityId] {
        &self.visible
    }

    pub fn render_list(&self) -> &RenderList {
        &self.render_list
    }

    pub fn render(&mut self, camera: &Camera, world: &World, renderer: &mut dyn Renderer) {
        let view_proj = camera.view_projection();
        self.visible = FrustumCuller::cull(&view_proj, world);

        let mut opaque = Vec::new();
        let mut transparent = Vec::new();
        for &entity in &self.visible {
            if world.has::<TransparentTag>(entity) {
                transparent.push(entity);
            } else {
                opaque.push(entity);
            }
        }

        // Back-to-front: farthest from the camera first
        let camera_pos = camera.position;
        transparent.sort_by(|&a, &b| {
            let da = distance_sq(world, a, camera_pos);
            let db = distance_sq(world, b, camera_pos);
            db.partial_cmp(&da).unwrap_or(std::cmp::Ordering::Equal)
        });

        renderer.set_clear_color(self.view_id, self.clear_color);

        self.render_list.clear();
        for &entity in &opaque {
            let call = self.draw_call_for(world, entity, self.view_id + 1);
            self.render_list.add(call);
            renderer.submit(&call);
        }
        for &entity in &transparent {
            let call = self.draw_call_for(world, entity, self.view_id + 2);
            self.render_list.add(call);
            renderer.submit(&call);
        }
    }

    fn draw_call_for(&self, world: &World, entity: EntityId, view_id: u8) -> DrawCall {
        DrawCall {
            sort_key: world.get::<Renderable>(entity).map_or(0, |r| r.sort_key),
            transform: global_transform(world, entity).to_cols_array(),
            view_id,
            ..DrawCall::default()
        }
    }
}

fn distance_sq(world: &World, entity: EntityId, from: Vec3) -> f32 {
    world.get::<Position>(entity).map_or(0.0, |p| {
        (Vec3::new(p.x, p.y, p.z) - from).length_squared()
    })
}
