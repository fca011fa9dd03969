//! Flight enter/exit: momentum-preserving launch and a downward ground probe
//! over the density grid on the way out.

use crate::player::state::CharacterState;
use crate::world::grid::ChunkedGrid;
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionResult {
    pub velocity: Vec3,
    pub new_state: CharacterState,
}

pub struct TransitionController;

impl TransitionController {
    /// Scale horizontal momentum, replace vertical velocity with an upward
    /// impulse, and enter Flying.
    pub fn enter_flight(velocity: Vec3, upward_impulse: f32, momentum_scale: f32) -> TransitionResult {
        TransitionResult {
            velocity: Vec3::new(
                velocity.x * momentum_scale,
                upward_impulse,
                velocity.z * momentum_scale,
            ),
            new_state: CharacterState::Flying,
        }
    }

    /// Scan straight down for solid ground: land (vertical velocity zeroed)
    /// when found within range, otherwise fall with momentum intact.
    pub fn exit_flight(
        velocity: Vec3,
        position: Vec3,
        grid: &ChunkedGrid<f32>,
        ground_check_distance: f32,
        density_threshold: f32,
    ) -> TransitionResult {
        if Self::ground_below(position, grid, ground_check_distance, density_threshold) {
            TransitionResult {
                velocity: Vec3::new(velocity.x, 0.0, velocity.z),
                new_state: CharacterState::Grounded,
            }
        } else {
            TransitionResult {
                velocity,
                new_state: CharacterState::Falling,
            }
        }
    }

    fn ground_below(
        position: Vec3,
        grid: &ChunkedGrid<f32>,
        distance: f32,
        density_threshold: f32,
    ) -> bool {
        let x = position.x.floor() as i32;
        let z = position.z.floor() as i32;
        let start_y = position.y.floor() as i32 - 1;
        let end_y = (position.y - distance).floor() as i32;

        let mut y = start_y;
        while y >= end_y {
            if grid.get(x, y, z) >= density_threshold {
                return true;
            }
            y -= 1;
        }
        false
    }
}
