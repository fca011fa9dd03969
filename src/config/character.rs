use serde::{Deserialize, Serialize};

/// Character movement tuning shared by the movement FSM, dash controller,
/// and flight transition controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    pub walk_speed: f32,
    pub run_speed: f32,
    pub jump_force: f32,
    pub gravity: f32,
    pub step_height: f32,
    pub slope_limit: f32,
    pub flight_speed: f32,
    pub dash_speed: f32,
    pub dash_duration: f32,
    pub dash_cooldown: f32,
    pub boost_speed: f32,
    pub boost_cooldown: f32,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            walk_speed: 5.0,
            run_speed: 10.0,
            jump_force: 8.0,
            gravity: 20.0,
            step_height: 1.0,
            slope_limit: 0.707,
            flight_speed: 15.0,
            dash_speed: 25.0,
            dash_duration: 0.25,
            dash_cooldown: 1.5,
            boost_speed: 30.0,
            boost_cooldown: 2.0,
        }
    }
}
