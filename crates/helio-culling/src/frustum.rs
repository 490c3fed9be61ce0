use glam::{Mat4, Vec3, Vec4};
use helio_core::{Aabb, Camera, Sphere};

#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    pub fn from_matrix(view_projection: Mat4) -> Self {
        let mut planes = [Vec4::ZERO; 6];

        // Clip space z runs 0..1, so the near plane is row 2 alone
        planes[0] = view_projection.row(3) + view_projection.row(0); // Left
        planes[1] = view_projection.row(3) - view_projection.row(0); // Right
        planes[2] = view_projection.row(3) + view_projection.row(1); // Bottom
        planes[3] = view_projection.row(3) - view_projection.row(1); // Top
        planes[4] = view_projection.row(2); // Near
        planes[5] = view_projection.row(3) - view_projection.row(2); // Far

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > 0.0 {
                *plane /= length;
            }
        }

        Self { planes }
    }

    pub fn from_camera(camera: &Camera) -> Self {
        Self::from_matrix(camera.view_projection_matrix())
    }

    pub fn test_sphere(&self, sphere: &Sphere) -> bool {
        let center = sphere.center.extend(1.0);
        self.planes
            .iter()
            .all(|plane| plane.dot(center) >= -sphere.radius)
    }

    pub fn test_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            let p = Vec3::new(
                if plane.x > 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.y > 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.z > 0.0 { aabb.max.z } else { aabb.min.z },
            );

            if plane.dot(p.extend(1.0)) < 0.0 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_down_from(height: f32) -> Frustum {
        let mut camera = Camera::new_perspective(60.0, 1.0, 0.1, 20.0);
        camera.position = Vec3::new(0.0, height, 0.0);
        camera.set_euler_angles(-90.0, 0.0, 0.0);
        Frustum::from_camera(&camera)
    }

    #[test]
    fn box_below_camera_is_visible() {
        let frustum = looking_down_from(10.0);
        let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        assert!(frustum.test_aabb(&aabb));
        assert!(frustum.test_sphere(&Sphere::new(Vec3::ZERO, 1.0)));
    }

    #[test]
    fn box_behind_camera_is_culled() {
        let frustum = looking_down_from(10.0);
        let aabb = Aabb::from_center_half_extents(Vec3::new(0.0, 15.0, 0.0), Vec3::ONE);
        assert!(!frustum.test_aabb(&aabb));
    }

    #[test]
    fn box_off_to_the_side_is_culled() {
        let frustum = looking_down_from(10.0);
        let aabb = Aabb::from_center_half_extents(Vec3::new(50.0, 0.0, 0.0), Vec3::ONE);
        assert!(!frustum.test_aabb(&aabb));
    }
}
