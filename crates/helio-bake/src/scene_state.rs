//! Scene settings held in a baking-friendly state for the duration of a bake

use std::ops::{Deref, DerefMut};

use glam::Vec3;
use helio_core::{Fog, FogMode, Scene};

/// Exclusive access to the scene while it is set up for baking.
///
/// Entering turns fog and static batching off and zeroes the ambient color
/// unless ambient light is being baked. Dropping the guard puts all three
/// back, including on early returns.
pub struct SceneStateGuard<'a> {
    saved: SceneSnapshot,
    scene: &'a mut Scene,
}

/// Scene-wide settings a bake overrides
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSnapshot {
    pub fog: Fog,
    pub ambient_light: Vec3,
    pub static_batching: bool,
}

impl SceneSnapshot {
    pub fn capture(scene: &Scene) -> Self {
        Self {
            fog: scene.fog,
            ambient_light: scene.ambient_light,
            static_batching: scene.static_batching,
        }
    }

    pub fn apply(&self, scene: &mut Scene) {
        scene.fog = self.fog;
        scene.ambient_light = self.ambient_light;
        scene.static_batching = self.static_batching;
    }
}

impl<'a> SceneStateGuard<'a> {
    pub fn enter(scene: &'a mut Scene) -> Self {
        let guard = Self {
            saved: SceneSnapshot::capture(scene),
            scene,
        };

        if !guard.scene.lightmap.ambient_bake {
            guard.scene.ambient_light = Vec3::ZERO;
        }
        guard.scene.fog.mode = FogMode::None;
        guard.scene.static_batching = false;
        log::debug!("Scene prepared for baking");
        guard
    }
}

impl Deref for SceneStateGuard<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl DerefMut for SceneStateGuard<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        self.scene
    }
}

impl Drop for SceneStateGuard<'_> {
    fn drop(&mut self) {
        self.saved.apply(self.scene);
        log::debug!("Scene settings restored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foggy_scene() -> Scene {
        let mut scene = Scene::new();
        scene.fog.mode = FogMode::Linear;
        scene.fog.color = Vec3::new(0.5, 0.6, 0.7);
        scene.ambient_light = Vec3::splat(0.3);
        scene.static_batching = true;
        scene
    }

    #[test]
    fn settings_are_neutral_inside_and_restored_after() {
        let mut scene = foggy_scene();
        {
            let guard = SceneStateGuard::enter(&mut scene);
            assert_eq!(guard.fog.mode, FogMode::None);
            assert_eq!(guard.ambient_light, Vec3::ZERO);
            assert!(!guard.static_batching);
            assert_eq!(guard.fog.color, Vec3::new(0.5, 0.6, 0.7));
        }
        assert_eq!(scene.fog.mode, FogMode::Linear);
        assert_eq!(scene.fog.color, Vec3::new(0.5, 0.6, 0.7));
        assert_eq!(scene.ambient_light, Vec3::splat(0.3));
        assert!(scene.static_batching);
    }

    #[test]
    fn ambient_is_kept_when_baking_it() {
        let mut scene = foggy_scene();
        scene.lightmap.ambient_bake = true;
        let guard = SceneStateGuard::enter(&mut scene);
        assert_eq!(guard.ambient_light, Vec3::splat(0.3));
    }

    #[test]
    fn restores_on_early_return() {
        fn bail(scene: &mut Scene) -> Result<(), ()> {
            let mut guard = SceneStateGuard::enter(scene);
            guard.ambient_light = Vec3::ONE;
            guard.fog.color = Vec3::ZERO;
            guard.static_batching = true;
            Err(())
        }

        let mut scene = foggy_scene();
        assert!(bail(&mut scene).is_err());
        assert_eq!(scene.ambient_light, Vec3::splat(0.3));
        assert_eq!(scene.fog.mode, FogMode::Linear);
        assert_eq!(scene.fog.color, Vec3::new(0.5, 0.6, 0.7));
        assert!(scene.static_batching);
    }

    #[test]
    fn snapshot_round_trips_scene_settings() {
        let mut scene = foggy_scene();
        let snapshot = SceneSnapshot::capture(&scene);
        scene.fog.mode = FogMode::Exp2;
        scene.fog.color = Vec3::ONE;
        scene.ambient_light = Vec3::ZERO;
        scene.static_batching = false;

        snapshot.apply(&mut scene);
        assert_eq!(SceneSnapshot::capture(&scene), snapshot);
        assert_eq!(scene.fog.mode, FogMode::Linear);
    }
}
