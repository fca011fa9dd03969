//! Smooths fixed-tick simulation state onto the variable display frame:
//! component-wise lerp for position and scale, slerp for rotation.

use crate::utils::math::Transform;

pub fn interpolate(prev: &Transform, current: &Transform, alpha: f32) -> Transform {
    let alpha = alpha.clamp(0.0, 1.0);
    Transform {
        position: prev.position.lerp(current.position, alpha),
        rotation: prev.rotation.slerp(current.rotation, alpha).normalize(),
        scale: prev.scale.lerp(current.scale, alpha),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn test_endpoints() {
        let prev = Transform {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        };
        let current = Transform {
            position: Vec3::new(10.0, 0.0, 0.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };

        let at_start = interpolate(&prev, &current, 0.0);
        assert!((at_start.position - prev.position).length() < 1e-6);

        let at_end = interpolate(&prev, &current, 1.0);
        assert!((at_end.position - current.position).length() < 1e-6);
        assert!((at_end.scale - current.scale).length() < 1e-6);
    }

    #[test]
    fn test_midpoint_lerps_and_slerps() {
        let prev = Transform::IDENTITY;
        let current = Transform {
            position: Vec3::new(4.0, 0.0, 0.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(3.0),
        };

        let mid = interpolate(&prev, &current, 0.5);
        assert!((mid.position.x - 2.0).abs() < 1e-6);
        assert!((mid.scale.x - 2.0).abs() < 1e-6);

        let quarter_turn = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(mid.rotation.dot(quarter_turn).abs() > 0.9999);
    }

    #[test]
    fn test_alpha_is_clamped() {
        let prev = Transform::IDENTITY;
        let current = Transform {
            position: Vec3::X,
            ..Transform::IDENTITY
        };
        let past_end = interpolate(&prev, &current, 2.0);
        assert!((past_end.position - Vec3::X).length() < 1e-6);
    }
}
