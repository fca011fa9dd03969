//! Plain-data component records shared across subsystems. Character, AI, and
//! animation components live with their systems.

use crate::ecs::EntityId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Quaternion (x, y, z, w).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Scale {
    fn default() -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f32,
    pub min_y: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub max_z: f32,
}

/// Tag for entities that are part of the serialized scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneEntity;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Renderable {
    pub sort_key: u64,
}

/// Tag for entities rendered in the back-to-front transparent pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransparentTag;

/// Parent link; children are created under a parent and never reparented to
/// an ancestor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildOf(pub EntityId);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Name(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalToWorld {
    pub matrix: [f32; 16],
}

impl Default for LocalToWorld {
    fn default() -> Self {
        let mut matrix = [0.0; 16];
        matrix[0] = 1.0;
        matrix[5] = 1.0;
        matrix[10] = 1.0;
        matrix[15] = 1.0;
        Self { matrix }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicsShapeType {
    #[default]
    Box,
    Sphere,
    Capsule,
    Mesh,
}

/// Configuration handed to an external physics engine on spawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBodyConfig {
    pub shape_type: PhysicsShapeType,
    pub mass: f32,
    pub restitution: f32,
    pub friction: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub velocity_z: f32,
}

impl Default for PhysicsBodyConfig {
    fn default() -> Self {
        Self {
            shape_type: PhysicsShapeType::Box,
            mass: 1.0,
            restitution: 0.3,
            friction: 0.5,
            velocity_x: 0.0,
            velocity_y: 0.0,
            velocity_z: 0.0,
        }
    }
}

/// Persisted AI setup: which tree to load and where patrols run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiBehaviorConfig {
    pub bt_xml_id: String,
    pub current_state: u8,
    pub waypoints: Vec<[f32; 3]>,
}

/// Configuration handed to an external audio engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSourceConfig {
    pub sound_path: String,
    pub volume: f32,
    pub looping: bool,
    pub position_x: f32,
    pub position_y: f32,
    pub position_z: f32,
}

impl Default for AudioSourceConfig {
    fn default() -> Self {
        Self {
            sound_path: String::new(),
            volume: 1.0,
            looping: false,
            position_x: 0.0,
            position_y: 0.0,
            position_z: 0.0,
        }
    }
}
