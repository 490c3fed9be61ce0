use glam::{Mat4, Quat, Vec3, Vec4};

use crate::transform::rotation_from_euler_degrees;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// Vertical field of view in degrees.
    Perspective { fov_y: f32 },
    /// Half of the vertical extent of the view volume.
    Orthographic { ortho_height: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub name: &'static str,
    pub position: Vec3,
    pub rotation: Quat,
    pub projection: Projection,
    pub aspect_ratio: f32,
    pub near_plane: f32,
    pub far_plane: f32,
    pub clear_color: Vec4,
    pub clear_color_buffer: bool,
    pub clear_depth_buffer: bool,
    pub frustum_culling: bool,
}

impl Camera {
    pub fn new_perspective(fov_y: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            name: "camera",
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            projection: Projection::Perspective { fov_y },
            aspect_ratio,
            near_plane: near,
            far_plane: far,
            clear_color: Vec4::ZERO,
            clear_color_buffer: true,
            clear_depth_buffer: true,
            frustum_culling: true,
        }
    }

    pub fn new_orthographic(ortho_height: f32, aspect_ratio: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Orthographic { ortho_height },
            ..Self::new_perspective(90.0, aspect_ratio, near, far)
        }
    }

    pub fn set_euler_angles(&mut self, x: f32, y: f32, z: f32) {
        self.rotation = rotation_from_euler_degrees(x, y, z);
    }

    /// Applies a rotation in the camera's local space.
    pub fn rotate_local(&mut self, x: f32, y: f32, z: f32) {
        self.rotation *= rotation_from_euler_degrees(x, y, z);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y } => Mat4::perspective_rh(
                fov_y.to_radians(),
                self.aspect_ratio,
                self.near_plane.max(f32::EPSILON),
                self.far_plane,
            ),
            Projection::Orthographic { ortho_height } => {
                let half_width = ortho_height * self.aspect_ratio;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -ortho_height,
                    ortho_height,
                    self.near_plane,
                    self.far_plane,
                )
            }
        }
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new_perspective(60.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_down_looks_along_negative_y() {
        let mut camera = Camera::default();
        camera.set_euler_angles(-90.0, 0.0, 0.0);
        assert!(camera.forward().abs_diff_eq(Vec3::NEG_Y, 1e-5));
    }

    #[test]
    fn ortho_projection_maps_height_to_clip_edge() {
        let camera = Camera::new_orthographic(2.0, 1.0, 0.0, 10.0);
        let clip = camera.projection_matrix() * Vec4::new(0.0, 2.0, -5.0, 1.0);
        assert!((clip.y / clip.w - 1.0).abs() < 1e-5);
    }
}
