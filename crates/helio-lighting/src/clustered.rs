//! World-space light clusters.
//!
//! The bounds of all local lights are split into a regular grid of cells; each
//! cell lists the lights whose influence sphere touches it, up to a cap.

use glam::{UVec3, Vec3};
use helio_core::{Aabb, Light, LightingSettings, Sphere};

#[derive(Debug, Clone, PartialEq)]
pub struct LightingParams {
    pub cells: UVec3,
    pub max_lights_per_cell: u32,
    pub shadows_enabled: bool,
    pub cookies_enabled: bool,
    pub shadow_atlas_resolution: u32,
    pub cookie_atlas_resolution: u32,
}

impl LightingParams {
    pub fn from_settings(settings: &LightingSettings) -> Self {
        Self {
            cells: settings.cells,
            max_lights_per_cell: settings.max_lights_per_cell,
            shadows_enabled: settings.shadows_enabled,
            cookies_enabled: settings.cookies_enabled,
            shadow_atlas_resolution: settings.shadow_atlas_resolution,
            cookie_atlas_resolution: settings.cookie_atlas_resolution,
        }
    }

    pub fn with_cells(mut self, cells: UVec3) -> Self {
        self.cells = cells.max(UVec3::ONE);
        self
    }

    pub fn with_max_lights_per_cell(mut self, max: u32) -> Self {
        self.max_lights_per_cell = max;
        self
    }
}

#[derive(Debug, Clone)]
pub struct WorldClusters {
    name: String,
    cells: UVec3,
    bounds: Aabb,
    cell_lights: Vec<Vec<usize>>,
    light_count: usize,
}

impl WorldClusters {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: UVec3::ONE,
            bounds: Aabb::default(),
            cell_lights: vec![Vec::new()],
            light_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> UVec3 {
        self.cells
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Number of local lights assigned in the last update
    pub fn light_count(&self) -> usize {
        self.light_count
    }

    /// Rebuild the grid for `lights`. Directional lights are unbounded and are
    /// never clustered; the indices stored per cell refer to `lights`.
    pub fn update(&mut self, lights: &[&Light], params: &LightingParams) {
        self.cells = params.cells.max(UVec3::ONE);
        let cell_count = (self.cells.x * self.cells.y * self.cells.z) as usize;
        self.cell_lights.clear();
        self.cell_lights.resize_with(cell_count, Vec::new);

        let spheres: Vec<(usize, Sphere)> = lights
            .iter()
            .enumerate()
            .filter_map(|(index, light)| light.bounding_sphere().map(|s| (index, s)))
            .collect();
        self.light_count = spheres.len();

        let boxes: Vec<Aabb> = spheres.iter().map(|(_, s)| s.to_aabb()).collect();
        self.bounds = Aabb::union_all(boxes.iter());
        if spheres.is_empty() {
            return;
        }

        let cell_size = self.bounds.extents() / self.cells.as_vec3();
        let max_per_cell = params.max_lights_per_cell as usize;
        for z in 0..self.cells.z {
            for y in 0..self.cells.y {
                for x in 0..self.cells.x {
                    let min = self.bounds.min + cell_size * UVec3::new(x, y, z).as_vec3();
                    let cell = Aabb::new(min, min + cell_size);
                    let index = self.cell_index(UVec3::new(x, y, z));
                    let list = &mut self.cell_lights[index];
                    for (light_index, sphere) in &spheres {
                        if list.len() >= max_per_cell {
                            break;
                        }
                        if cell.intersects_sphere(sphere) {
                            list.push(*light_index);
                        }
                    }
                }
            }
        }
        log::trace!(
            "Clusters '{}' updated: {} lights over {:?} cells",
            self.name,
            self.light_count,
            self.cells
        );
    }

    fn cell_index(&self, cell: UVec3) -> usize {
        (cell.x + cell.y * self.cells.x + cell.z * self.cells.x * self.cells.y) as usize
    }

    /// Cell containing `position`, if it lies inside the cluster bounds
    pub fn cell_at(&self, position: Vec3) -> Option<usize> {
        if self.light_count == 0 || !self.bounds.contains_point(position) {
            return None;
        }
        let extents = self.bounds.extents().max(Vec3::splat(f32::EPSILON));
        let relative = (position - self.bounds.min) / extents * self.cells.as_vec3();
        let cell = relative
            .floor()
            .as_uvec3()
            .min(self.cells - UVec3::ONE);
        Some(self.cell_index(cell))
    }

    pub fn lights_in_cell(&self, cell: usize) -> &[usize] {
        self.cell_lights.get(cell).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lights_at(&self, position: Vec3) -> &[usize] {
        self.cell_at(position)
            .map(|cell| self.lights_in_cell(cell))
            .unwrap_or(&[])
    }
}
