//! Ground dash and airborne boost: shared duration, separate speed and
//! cooldown tuning.

use crate::config::CharacterConfig;
use crate::player::state::DashState;
use glam::Vec3;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DashResult {
    pub displacement: Vec3,
    pub active: bool,
    pub just_finished: bool,
}

pub struct DashController;

impl DashController {
    /// Start a dash (ground) or boost (air). Fails exactly when the cooldown
    /// has not reached zero.
    pub fn start_dash(state: &mut DashState, config: &CharacterConfig, is_airborne: bool) -> bool {
        if state.cooldown_remaining > 0.0 {
            return false;
        }

        state.active = true;
        state.duration_remaining = config.dash_duration;
        state.cooldown_remaining = if is_airborne {
            config.boost_cooldown
        } else {
            config.dash_cooldown
        };
        true
    }

    /// Tick an active dash, returning this frame's displacement and whether
    /// the dash ended on this step.
    pub fn update(
        state: &mut DashState,
        config: &CharacterConfig,
        dash_direction: Vec3,
        dt: f32,
        is_airborne: bool,
    ) -> DashResult {
        if !state.active {
            return DashResult::default();
        }

        let speed = if is_airborne {
            config.boost_speed
        } else {
            config.dash_speed
        };

        let mut result = DashResult {
            displacement: dash_direction * (speed * dt),
            active: true,
            just_finished: false,
        };

        state.duration_remaining -= dt;
        if state.duration_remaining <= 0.0 {
            state.duration_remaining = 0.0;
            state.active = false;
            result.active = false;
            result.just_finished = true;
        }

        result
    }

    /// Monotonically reduce the cooldown, clamped at zero. The next dash
    /// becomes permissible exactly when it hits zero.
    pub fn update_cooldown(state: &mut DashState, dt: f32) {
        if state.cooldown_remaining > 0.0 {
            state.cooldown_remaining = (state.cooldown_remaining - dt).max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CharacterConfig {
        CharacterConfig::default()
    }

    #[test]
    fn test_start_dash_sets_duration_and_cooldown() {
        let mut state = DashState::default();
        assert!(DashController::start_dash(&mut state, &config(), false));
        assert!(state.active);
        assert_eq!(state.duration_remaining, config().dash_duration);
        assert_eq!(state.cooldown_remaining, config().dash_cooldown);
    }

    #[test]
    fn test_airborne_start_uses_boost_cooldown() {
        let mut state = DashState::default();
        assert!(DashController::start_dash(&mut state, &config(), true));
        assert_eq!(state.cooldown_remaining, config().boost_cooldown);
    }

    #[test]
    fn test_start_fails_exactly_while_cooling_down() {
        let mut state = DashState::default();
        DashController::start_dash(&mut state, &config(), false);
        state.active = false;

        assert!(!DashController::start_dash(&mut state, &config(), false));

        DashController::update_cooldown(&mut state, config().dash_cooldown - 0.01);
        assert!(!DashController::start_dash(&mut state, &config(), false));

        DashController::update_cooldown(&mut state, 0.01);
        assert_eq!(state.cooldown_remaining, 0.0);
        assert!(DashController::start_dash(&mut state, &config(), false));
    }

    #[test]
    fn test_update_returns_scaled_displacement() {
        let mut state = DashState::default();
        let cfg = config();
        DashController::start_dash(&mut state, &cfg, false);

        let result = DashController::update(&mut state, &cfg, Vec3::X, 0.1, false);
        assert!(result.active);
        assert!((result.displacement.x - cfg.dash_speed * 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_boost_speed_while_airborne() {
        let mut state = DashState::default();
        let cfg = config();
        DashController::start_dash(&mut state, &cfg, true);

        let result = DashController::update(&mut state, &cfg, Vec3::X, 0.1, true);
        assert!((result.displacement.x - cfg.boost_speed * 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_just_finished_fires_once() {
        let mut state = DashState::default();
        let cfg = config();
        DashController::start_dash(&mut state, &cfg, false);

        let mid = DashController::update(&mut state, &cfg, Vec3::X, cfg.dash_duration / 2.0, false);
        assert!(!mid.just_finished);

        let end = DashController::update(&mut state, &cfg, Vec3::X, cfg.dash_duration, false);
        assert!(end.just_finished);
        assert!(!end.active);
        assert!(!state.active);

        let after = DashController::update(&mut state, &cfg, Vec3::X, 0.1, false);
        assert_eq!(after, DashResult::default());
    }

    #[test]
    fn test_cooldown_clamps_at_zero() {
        let mut state = DashState {
            cooldown_remaining: 0.5,
            ..DashState::default()
        };
        DashController::update_cooldown(&mut state, 10.0);
        assert_eq!(state.cooldown_remaining, 0.0);
        DashController::update_cooldown(&mut state, 1.0);
        assert_eq!(state.cooldown_remaining, 0.0);
    }
}
