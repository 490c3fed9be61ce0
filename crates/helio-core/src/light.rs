use glam::{Quat, Vec3};

use crate::bounds::Sphere;
use crate::mesh::LightMask;
use crate::texture::TextureRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub(crate) usize);

impl LightId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Light types, ordered the way baking visits them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LightKind {
    Directional,
    Omni,
    Spot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowUpdateMode {
    None,
    ThisFrame,
    Realtime,
}

/// Depth texture a light renders its shadows into
#[derive(Debug, Clone)]
pub struct ShadowMap {
    pub texture: TextureRef,
    pub resolution: u32,
    pub omni: bool,
    /// Owned by a shadow map cache rather than by the light
    pub cached: bool,
}

#[derive(Debug, Clone)]
pub struct Light {
    pub name: String,
    pub kind: LightKind,
    pub enabled: bool,
    pub mask: LightMask,
    pub is_static: bool,
    pub shadow_update_mode: ShadowUpdateMode,
    pub cast_shadows: bool,
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    /// Lights point down their local -Y axis
    pub rotation: Quat,
    pub range: f32,
    /// Degrees
    pub inner_cone_angle: f32,
    /// Degrees
    pub outer_cone_angle: f32,
    pub bake_num_samples: u32,
    /// Penumbra spread of baked soft shadows, in degrees
    pub bake_area: f32,
    pub bake_dir: bool,
    pub num_cascades: u32,
    pub shadow_resolution: u32,
    pub shadow_bias: f32,
    pub normal_offset_bias: f32,
    pub shadow_map: Option<ShadowMap>,
    pub visible_this_frame: bool,
}

impl Light {
    fn base(name: impl Into<String>, kind: LightKind) -> Self {
        Self {
            name: name.into(),
            kind,
            enabled: true,
            mask: LightMask::AFFECT_DYNAMIC | LightMask::BAKE,
            is_static: false,
            shadow_update_mode: ShadowUpdateMode::Realtime,
            cast_shadows: false,
            color: Vec3::ONE,
            intensity: 1.0,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            range: 10.0,
            inner_cone_angle: 40.0,
            outer_cone_angle: 45.0,
            bake_num_samples: 1,
            bake_area: 0.0,
            bake_dir: true,
            num_cascades: 4,
            shadow_resolution: 1024,
            shadow_bias: 0.05,
            normal_offset_bias: 0.0,
            shadow_map: None,
            visible_this_frame: false,
        }
    }

    pub fn directional(name: impl Into<String>) -> Self {
        Self::base(name, LightKind::Directional)
    }

    pub fn omni(name: impl Into<String>, position: Vec3, range: f32) -> Self {
        Self {
            position,
            range,
            ..Self::base(name, LightKind::Omni)
        }
    }

    pub fn spot(
        name: impl Into<String>,
        position: Vec3,
        range: f32,
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    ) -> Self {
        Self {
            position,
            range,
            inner_cone_angle,
            outer_cone_angle,
            ..Self::base(name, LightKind::Spot)
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_mask(mut self, mask: LightMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_cast_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }

    pub fn with_bake_samples(mut self, samples: u32, area: f32) -> Self {
        self.bake_num_samples = samples;
        self.bake_area = area;
        self
    }

    pub fn direction(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Y
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Influence volume of a local light. Directional lights are unbounded.
    pub fn bounding_sphere(&self) -> Option<Sphere> {
        match self.kind {
            LightKind::Directional => None,
            LightKind::Omni => Some(Sphere::new(self.position, self.range)),
            LightKind::Spot => {
                let angle = self.outer_cone_angle.to_radians();
                let down = -self.up();
                let center = self.position + down * (self.range * 0.5 * angle.cos());
                let radius = (down * self.range + self.right() * (angle.sin() * self.range))
                    .length()
                    * 0.5;
                Some(Sphere::new(center, radius))
            }
        }
    }

    pub fn begin_frame(&mut self) {
        self.visible_this_frame = self.kind == LightKind::Directional && self.enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omni_bounds_are_its_range() {
        let light = Light::omni("omni", Vec3::new(1.0, 2.0, 3.0), 5.0);
        let sphere = light.bounding_sphere().expect("omni lights are bounded");
        assert_eq!(sphere.center, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(sphere.radius, 5.0);
    }

    #[test]
    fn spot_bounds_sit_below_the_light() {
        let light = Light::spot("spot", Vec3::new(0.0, 10.0, 0.0), 4.0, 20.0, 30.0);
        let sphere = light.bounding_sphere().expect("spot lights are bounded");
        assert!(sphere.center.y < 10.0);
        assert!(sphere.radius > 0.0 && sphere.radius <= 4.0);
    }

    #[test]
    fn directional_lights_are_unbounded() {
        assert!(Light::directional("sun").bounding_sphere().is_none());
    }
}
