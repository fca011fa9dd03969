use glam::{Mat4, Quat, Vec3, Vec4};

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
        }
    }
}

/// Plane in the form ax + by + cz + d = 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    pub fn normalize(&mut self) {
        let length = self.normal.length();
        if length > 0.0 {
            self.normal /= length;
            self.distance /= length;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullResult {
    Inside,
    Outside,
    Intersect,
}

/// View frustum: left, right, bottom, top, near, far.
#[derive(Debug, Clone)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract frustum planes from a column-major view-projection matrix
    /// (sum/difference of rows).
    pub fn from_view_projection(view_proj: &Mat4) -> Self {
        let m = view_proj.to_cols_array_2d();
        let row = |i: usize| Vec4::new(m[0][i], m[1][i], m[2][i], m[3][i]);

        let r0 = row(0);
        let r1 = row(1);
        let r2 = row(2);
        let r3 = row(3);

        let mut planes = [Plane::default(); 6];
        let raw = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r3 + r2, // near
            r3 - r2, // far
        ];
        for (plane, v) in planes.iter_mut().zip(raw) {
            *plane = Plane {
                normal: Vec3::new(v.x, v.y, v.z),
                distance: v.w,
            };
            plane.normalize();
        }

        Self { planes }
    }

    /// Classify an AABB against all six planes using the positive/negative
    /// vertex test.
    pub fn test_aabb(&self, aabb: &Aabb) -> CullResult {
        let mut result = CullResult::Inside;

        for plane in &self.planes {
            let mut positive = aabb.min;
            let mut negative = aabb.max;
            if plane.normal.x >= 0.0 {
                positive.x = aabb.max.x;
                negative.x = aabb.min.x;
            }
            if plane.normal.y >= 0.0 {
                positive.y = aabb.max.y;
                negative.y = aabb.min.y;
            }
            if plane.normal.z >= 0.0 {
                positive.z = aabb.max.z;
                negative.z = aabb.min.z;
            }

            if plane.distance_to_point(positive) < 0.0 {
                return CullResult::Outside;
            }
            if plane.distance_to_point(negative) < 0.0 {
                result = CullResult::Intersect;
            }
        }

        result
    }

    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.test_aabb(aabb) != CullResult::Outside
    }
}

/// Decomposed transform used by interpolation and pose math.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
