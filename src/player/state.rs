use serde::{Deserialize, Serialize};

/// Character locomotion states. Only a subset is reachable through the
/// movement FSM's transition table; the rest are reserved for controllers
/// layered on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterState {
    Grounded,
    Falling,
    Jumping,
    Climbing,
    Swimming,
    WallRunning,
    Hanging,
    Flying,
    Sliding,
    Ragdoll,
    Dashing,
    Boosting,
}

/// ECS component mirroring the FSM state onto an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterStateComponent {
    pub state: CharacterState,
}

impl Default for CharacterStateComponent {
    fn default() -> Self {
        Self {
            state: CharacterState::Grounded,
        }
    }
}

/// Dash/boost bookkeeping carried per character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashState {
    pub cooldown_remaining: f32,
    pub duration_remaining: f32,
    pub active: bool,
}
