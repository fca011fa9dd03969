use glam::{Mat4, Quat, Vec3};

pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(fov: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov,
            aspect_ratio,
            near,
            far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov.to_radians(),
            self.aspect_ratio,
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn look_at(&mut self, target: Vec3) {
        if (target - self.position).length_squared() > 1e-12 {
            self.rotation =
                Quat::from_mat4(&Mat4::look_at_rh(self.position, target, Vec3::Y).inverse());
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(70.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_matrix_inverts_position() {
        let mut camera = Camera::default();
        camera.position = Vec3::new(0.0, 0.0, 10.0);
        let view = camera.view_matrix();
        let at_origin = view.transform_point3(Vec3::ZERO);
        assert!((at_origin.z - -10.0).abs() < 1e-5);
    }

    #[test]
    fn test_view_projection_is_proj_times_view() {
        let camera = Camera::default();
        let vp = camera.view_projection();
        let expected = camera.projection_matrix() * camera.view_matrix();
        assert!(vp.abs_diff_eq(expected, 1e-6));
    }
}
