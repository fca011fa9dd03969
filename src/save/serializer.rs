//! Scene <-> JSON: scene-tagged entities with their components, active
//! chunks of both voxel fields, timeline state, and optional player state.

use crate::core::temporal::{TimeState, Timeline};
use crate::ecs::{
    AiBehaviorConfig, AudioSourceConfig, BoundingBox, ChildOf, EntityId, LocalToWorld, Name,
    PhysicsBodyConfig, PhysicsShapeType, Position, Renderable, Rotation, Scale, SceneEntity,
    World,
};
use crate::world::chunk_coord::{CHUNK_SIZE, CHUNK_VOLUME};
use crate::world::grid::{DensityField, EssenceField};
use glam::{Vec3, Vec4};
use log::warn;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

pub const SCENE_VERSION: &str = "1.0";

/// Player state recovered from a scene, when present.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadedPlayer {
    pub position: Option<Vec3>,
    pub velocity: Option<Vec3>,
}

pub struct SceneSerializer;

impl SceneSerializer {
    pub fn serialize(
        world: &World,
        density: &DensityField,
        essence: &EssenceField,
        timeline: &Timeline,
        player_pos: Option<Vec3>,
        player_vel: Option<Vec3>,
    ) -> Value {
        let mut scene = Map::new();
        scene.insert("version".into(), json!(SCENE_VERSION));
        scene.insert("entities".into(), Self::serialize_entities(world));
        scene.insert("chunks".into(), Self::serialize_chunks(density, essence));
        scene.insert("timeline".into(), Self::serialize_timeline(timeline));

        if player_pos.is_some() || player_vel.is_some() {
            let mut player = Map::new();
            if let Some(p) = player_pos {
                player.insert("position".into(), json!({"x": p.x, "y": p.y, "z": p.z}));
            }
            if let Some(v) = player_vel {
                player.insert("velocity".into(), json!({"x": v.x, "y": v.y, "z": v.z}));
            }
            scene.insert("player".into(), Value::Object(player));
        }

        Value::Object(scene)
    }

    pub fn serialize_entities(world: &World) -> Value {
        let entities: Vec<Value> = world
            .entities_with::<SceneEntity>()
            .into_iter()
            .map(|entity| Self::serialize_entity(world, entity))
            .collect();
        Value::Array(entities)
    }

    fn serialize_entity(world: &World, entity: EntityId) -> Value {
        let mut out = Map::new();
        out.insert("id".into(), json!(entity));

        if let Some(name) = world.get::<Name>(entity) {
            out.insert("name".into(), json!(name.0));
        }
        if let Some(parent) = world.get::<ChildOf>(entity) {
            out.insert("parentId".into(), json!(parent.0));
        }

        let components = Self::serialize_components(world, entity);
        if !components.is_empty() {
            out.insert("components".into(), Value::Object(components));
        }

        Value::Object(out)
    }

    fn serialize_components(world: &World, entity: EntityId) -> Map<String, Value> {
        let mut components = Map::new();

        if let Some(p) = world.get::<Position>(entity) {
            components.insert("Position".into(), json!({"x": p.x, "y": p.y, "z": p.z}));
        }
        if let Some(r) = world.get::<Rotation>(entity) {
            components.insert(
                "Rotation".into(),
                json!({"x": r.x, "y": r.y, "z": r.z, "w": r.w}),
            );
        }
        if let Some(s) = world.get::<Scale>(entity) {
            components.insert("Scale".into(), json!({"x": s.x, "y": s.y, "z": s.z}));
        }
        if let Some(b) = world.get::<BoundingBox>(entity) {
            components.insert(
                "BoundingBox".into(),
                json!({
                    "minX": b.min_x, "minY": b.min_y, "minZ": b.min_z,
                    "maxX": b.max_x, "maxY": b.max_y, "maxZ": b.max_z,
                }),
            );
        }
        if let Some(ltw) = world.get::<LocalToWorld>(entity) {
            components.insert("LocalToWorld".into(), json!(ltw.matrix.to_vec()));
        }
        if world.has::<SceneEntity>(entity) {
            components.insert("SceneEntity".into(), json!(true));
        }
        if let Some(r) = world.get::<Renderable>(entity) {
            components.insert("Renderable".into(), json!(r.sort_key));
        }
        if let Some(body) = world.get::<PhysicsBodyConfig>(entity) {
            let shape = match body.shape_type {
                PhysicsShapeType::Box => "box",
                PhysicsShapeType::Sphere => "sphere",
                PhysicsShapeType::Capsule => "capsule",
                PhysicsShapeType::Mesh => "mesh",
            };
            components.insert(
                "PhysicsBody".into(),
                json!({
                    "shapeType": shape,
                    "mass": body.mass,
                    "restitution": body.restitution,
                    "friction": body.friction,
                    "velocity": {
                        "x": body.velocity_x,
                        "y": body.velocity_y,
                        "z": body.velocity_z,
                    },
                }),
            );
        }
        if let Some(ai) = world.get::<AiBehaviorConfig>(entity) {
            let waypoints: Vec<Value> = ai
                .waypoints
                .iter()
                .map(|wp| json!({"x": wp[0], "y": wp[1], "z": wp[2]}))
                .collect();
            components.insert(
                "AIBehavior".into(),
                json!({
                    "btXmlId": ai.bt_xml_id,
                    "currentState": ai.current_state,
                    "waypoints": waypoints,
                }),
            );
        }
        if let Some(audio) = world.get::<AudioSourceConfig>(entity) {
            components.insert(
                "AudioSource".into(),
                json!({
                    "soundPath": audio.sound_path,
                    "volume": audio.volume,
                    "looping": audio.looping,
                    "position": {
                        "x": audio.position_x,
                        "y": audio.position_y,
                        "z": audio.position_z,
                    },
                }),
            );
        }

        components
    }

    pub fn serialize_chunks(density: &DensityField, essence: &EssenceField) -> Value {
        let chunks: Vec<Value> = density
            .grid()
            .active_chunks()
            .into_iter()
            .map(|coord| {
                let mut density_data = Vec::with_capacity(CHUNK_VOLUME);
                density
                    .grid()
                    .for_each_cell(&coord, |_x, _y, _z, value| density_data.push(value));

                // Essence reads cross into its own grid, defaulting where the
                // essence chunk was never written
                let (bx, by, bz) = coord.base();
                let mut essence_data = Vec::with_capacity(CHUNK_VOLUME * 4);
                for lz in 0..CHUNK_SIZE {
                    for ly in 0..CHUNK_SIZE {
                        for lx in 0..CHUNK_SIZE {
                            let e = essence.read(bx + lx, by + ly, bz + lz);
                            essence_data.extend_from_slice(&[e.x, e.y, e.z, e.w]);
                        }
                    }
                }

                json!({
                    "x": coord.x,
                    "y": coord.y,
                    "z": coord.z,
                    "density": density_data,
                    "essence": essence_data,
                })
            })
            .collect();
        Value::Array(chunks)
    }

    pub fn serialize_timeline(timeline: &Timeline) -> Value {
        let history: Vec<Value> = timeline
            .history()
            .iter()
            .map(|state| json!({"timestamp": state.timestamp()}))
            .collect();
        json!({
            "currentTime": timeline.current_time(),
            "globalTimeScale": timeline.global_time_scale(),
            "isPaused": timeline.is_paused(),
            "history": history,
        })
    }

    /// Apply a scene onto existing state. Absent fields default; parent
    /// links are rewired in a second pass over the original entity-id map.
    pub fn deserialize(
        scene: &Value,
        world: &mut World,
        density: &mut DensityField,
        essence: &mut EssenceField,
        timeline: &Timeline,
    ) -> Option<LoadedPlayer> {
        if scene.get("version").and_then(Value::as_str).is_none() {
            warn!("scene json missing version field");
            return None;
        }

        if let Some(entities) = scene.get("entities") {
            Self::deserialize_entities(entities, world);
        }
        if let Some(chunks) = scene.get("chunks") {
            Self::deserialize_chunks(chunks, density, essence);
        }
        if let Some(timeline_json) = scene.get("timeline") {
            Self::deserialize_timeline(timeline_json, timeline);
        }

        let mut player = LoadedPlayer::default();
        if let Some(player_json) = scene.get("player") {
            player.position = read_vec3(player_json.get("position"));
            player.velocity = read_vec3(player_json.get("velocity"));
        }
        Some(player)
    }

    pub fn deserialize_entities(entities: &Value, world: &mut World) {
        let Some(list) = entities.as_array() else {
            warn!("entities json is not an array");
            return;
        };

        let mut id_map: HashMap<u64, EntityId> = HashMap::new();

        for entity_json in list {
            let Some(old_id) = entity_json.get("id").and_then(Value::as_u64) else {
                warn!("skipping entity without id");
                continue;
            };

            let entity = Self::resolve_entity(world, old_id, entity_json);
            if let Some(name) = entity_json.get("name").and_then(Value::as_str) {
                if !world.has::<Name>(entity) {
                    world.set(entity, Name(name.to_string()));
                }
            }
            if let Some(components) = entity_json.get("components") {
                Self::restore_components(world, entity, components);
            }
            id_map.insert(old_id, entity);
        }

        // Second pass: rewire parent links through the id map
        for entity_json in list {
            let (Some(old_id), Some(parent_old)) = (
                entity_json.get("id").and_then(Value::as_u64),
                entity_json.get("parentId").and_then(Value::as_u64),
            ) else {
                continue;
            };
            if let (Some(&child), Some(&parent)) = (id_map.get(&old_id), id_map.get(&parent_old)) {
                world.set(child, ChildOf(parent));
            }
        }
    }

    /// Known ids are reused and overwritten; unknown ids (and unnamed
    /// entities) are recreated.
    fn resolve_entity(world: &mut World, old_id: u64, entity_json: &Value) -> EntityId {
        if world.is_alive(old_id) {
            return old_id;
        }
        if let Some(name) = entity_json.get("name").and_then(Value::as_str) {
            if let Some(existing) = world.find_by_name(name) {
                return existing;
            }
        }
        world.create_entity()
    }

    fn restore_components(world: &mut World, entity: EntityId, components: &Value) {
        if let Some(p) = components.get("Position") {
            world.set(
                entity,
                Position {
                    x: field_f32(p, "x", 0.0),
                    y: field_f32(p, "y", 0.0),
                    z: field_f32(p, "z", 0.0),
                },
            );
        }
        if let Some(r) = components.get("Rotation") {
            world.set(
                entity,
                Rotation {
                    x: field_f32(r, "x", 0.0),
                    y: field_f32(r, "y", 0.0),
                    z: field_f32(r, "z", 0.0),
                    w: field_f32(r, "w", 1.0),
                },
            );
        }
        if let Some(s) = components.get("Scale") {
            world.set(
                entity,
                Scale {
                    x: field_f32(s, "x", 1.0),
                    y: field_f32(s, "y", 1.0),
                    z: field_f32(s, "z", 1.0),
                },
            );
        }
        if let Some(b) = components.get("BoundingBox") {
            world.set(
                entity,
                BoundingBox {
                    min_x: field_f32(b, "minX", 0.0),
                    min_y: field_f32(b, "minY", 0.0),
                    min_z: field_f32(b, "minZ", 0.0),
                    max_x: field_f32(b, "maxX", 0.0),
                    max_y: field_f32(b, "maxY", 0.0),
                    max_z: field_f32(b, "maxZ", 0.0),
                },
            );
        }
        if let Some(matrix) = components.get("LocalToWorld").and_then(Value::as_array) {
            if matrix.len() == 16 {
                let mut ltw = LocalToWorld::default();
                for (i, v) in matrix.iter().enumerate() {
                    ltw.matrix[i] = v.as_f64().unwrap_or(0.0) as f32;
                }
                world.set(entity, ltw);
            }
        }
        if components.get("SceneEntity").and_then(Value::as_bool) == Some(true) {
            world.set(entity, SceneEntity);
        }
        if let Some(sort_key) = components.get("Renderable").and_then(Value::as_u64) {
            world.set(entity, Renderable { sort_key });
        }
        if let Some(body) = components.get("PhysicsBody") {
            let shape = match body.get("shapeType").and_then(Value::as_str) {
                Some("sphere") => PhysicsShapeType::Sphere,
                Some("capsule") => PhysicsShapeType::Capsule,
                Some("mesh") => PhysicsShapeType::Mesh,
                _ => PhysicsShapeType::Box,
            };
            let velocity = body.get("velocity");
            world.set(
                entity,
                PhysicsBodyConfig {
                    shape_type: shape,
                    mass: field_f32(body, "mass", 1.0),
                    restitution: field_f32(body, "restitution", 0.3),
                    friction: field_f32(body, "friction", 0.5),
                    velocity_x: velocity.map_or(0.0, |v| field_f32(v, "x", 0.0)),
                    velocity_y: velocity.map_or(0.0, |v| field_f32(v, "y", 0.0)),
                    velocity_z: velocity.map_or(0.0, |v| field_f32(v, "z", 0.0)),
                },
            );
        }
        if let Some(ai) = components.get("AIBehavior") {
            let waypoints = ai
                .get("waypoints")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .map(|wp| {
                            [
                                field_f32(wp, "x", 0.0),
                                field_f32(wp, "y", 0.0),
                                field_f32(wp, "z", 0.0),
                            ]
                        })
                        .collect()
                })
                .unwrap_or_default();
            world.set(
                entity,
                AiBehaviorConfig {
                    bt_xml_id: ai
                        .get("btXmlId")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                    current_state: ai.get("currentState").and_then(Value::as_u64).unwrap_or(0)
                        as u8,
                    waypoints,
                },
            );
        }
        if let Some(audio) = components.get("AudioSource") {
            let position = audio.get("position");
            world.set(
                entity,
                AudioSourceConfig {
                    sound_path: audio
                        .get("soundPath")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                    volume: field_f32(audio, "volume", 1.0),
                    looping: audio.get("looping").and_then(Value::as_bool).unwrap_or(false),
                    position_x: position.map_or(0.0, |p| field_f32(p, "x", 0.0)),
                    position_y: position.map_or(0.0, |p| field_f32(p, "y", 0.0)),
                    position_z: position.map_or(0.0, |p| field_f32(p, "z", 0.0)),
                },
            );
        }
    }

    pub fn deserialize_chunks(
        chunks: &Value,
        density: &mut DensityField,
        essence: &mut EssenceField,
    ) {
        let Some(list) = chunks.as_array() else {
            warn!("chunks json is not an array");
            return;
        };

        for chunk_json in list {
            let (Some(cx), Some(cy), Some(cz)) = (
                chunk_json.get("x").and_then(Value::as_i64),
                chunk_json.get("y").and_then(Value::as_i64),
                chunk_json.get("z").and_then(Value::as_i64),
            ) else {
                warn!("skipping chunk without coordinates");
                continue;
            };
            let (bx, by, bz) = (
                cx as i32 * CHUNK_SIZE,
                cy as i32 * CHUNK_SIZE,
                cz as i32 * CHUNK_SIZE,
            );

            if let Some(values) = chunk_json.get("density").and_then(Value::as_array) {
                for (i, value) in values.iter().take(CHUNK_VOLUME).enumerate() {
                    let (lx, ly, lz) = unpack_index(i);
                    density.write(
                        bx + lx,
                        by + ly,
                        bz + lz,
                        value.as_f64().unwrap_or(0.0) as f32,
                    );
                }
            }

            if let Some(values) = chunk_json.get("essence").and_then(Value::as_array) {
                if values.len() % 4 == 0 {
                    for i in 0..(values.len() / 4).min(CHUNK_VOLUME) {
                        let (lx, ly, lz) = unpack_index(i);
                        let read = |offset: usize| {
                            values[i * 4 + offset].as_f64().unwrap_or(0.0) as f32
                        };
                        essence.write(
                            bx + lx,
                            by + ly,
                            bz + lz,
                            Vec4::new(read(0), read(1), read(2), read(3)),
                        );
                    }
                }
            }
        }
    }

    pub fn deserialize_timeline(timeline_json: &Value, timeline: &Timeline) {
        if let Some(time) = timeline_json.get("currentTime").and_then(Value::as_f64) {
            timeline.set_current_time(time);
        }
        if let Some(scale) = timeline_json.get("globalTimeScale").and_then(Value::as_f64) {
            timeline.set_global_time_scale(scale);
        }

        timeline.clear_history();
        if let Some(history) = timeline_json.get("history").and_then(Value::as_array) {
            for state in history {
                let timestamp = state.get("timestamp").and_then(Value::as_f64).unwrap_or(0.0);
                timeline.push_history(TimeState::new(timestamp));
            }
        }

        match timeline_json.get("isPaused").and_then(Value::as_bool) {
            Some(false) => timeline.resume(),
            _ => timeline.pause(),
        }
    }
}

fn field_f32(value: &Value, key: &str, default: f32) -> f32 {
    value
        .get(key)
        .and_then(Value::as_f64)
        .map_or(default, |v| v as f32)
}

fn read_vec3(value: Option<&Value>) -> Option<Vec3> {
    let v = value?;
    Some(Vec3::new(
        field_f32(v, "x", 0.0),
        field_f32(v, "y", 0.0),
        field_f32(v, "z", 0.0),
    ))
}

fn unpack_index(i: usize) -> (i32, i32, i32) {
    let n = CHUNK_SIZE as usize;
    ((i % n) as i32, ((i / n) % n) as i32, (i / (n * n)) as i32)
}
