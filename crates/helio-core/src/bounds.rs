use glam::{Mat4, Vec3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);

        for &point in points {
            min = min.min(point);
            max = max.max(point);
        }

        Self { min, max }
    }

    /// Union of a set of boxes; an empty set yields a zero-sized box at the origin.
    pub fn union_all<'a>(boxes: impl IntoIterator<Item = &'a Aabb>) -> Aabb {
        let mut iter = boxes.into_iter();
        match iter.next() {
            Some(first) => iter.fold(*first, |acc, aabb| acc.union(aabb)),
            None => Aabb::default(),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn half_extents(&self) -> Vec3 {
        self.extents() * 0.5
    }

    pub fn radius(&self) -> f32 {
        self.half_extents().length()
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let closest = sphere.center.clamp(self.min, self.max);
        closest.distance_squared(sphere.center) <= sphere.radius * sphere.radius
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn transform(&self, matrix: &Mat4) -> Aabb {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        let transformed: Vec<Vec3> = corners
            .iter()
            .map(|&corner| matrix.transform_point3(corner))
            .collect();

        Self::from_points(&transformed)
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

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Box that tightly encloses the sphere.
    pub fn to_aabb(&self) -> Aabb {
        Aabb::from_center_half_extents(self.center, Vec3::splat(self.radius))
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.center.distance_squared(point) <= self.radius * self.radius
    }

    pub fn intersects(&self, other: &Sphere) -> bool {
        let combined_radius = self.radius + other.radius;
        self.center.distance_squared(other.center) <= combined_radius * combined_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_all_of_nothing_is_degenerate() {
        assert_eq!(Aabb::union_all([].iter()), Aabb::default());
    }

    #[test]
    fn union_all_covers_every_box() {
        let a = Aabb::new(Vec3::splat(-1.0), Vec3::ZERO);
        let b = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 3.0, 4.0));
        let u = Aabb::union_all([a, b].iter());
        assert_eq!(u.min, Vec3::splat(-1.0));
        assert_eq!(u.max, Vec3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn sphere_box_overlap() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(aabb.intersects_sphere(&Sphere::new(Vec3::new(2.0, 0.0, 0.0), 1.5)));
        assert!(!aabb.intersects_sphere(&Sphere::new(Vec3::new(5.0, 0.0, 0.0), 1.0)));
    }

    #[test]
    fn sphere_to_aabb_is_tight() {
        let aabb = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 2.0).to_aabb();
        assert_eq!(aabb.half_extents(), Vec3::splat(2.0));
        assert_eq!(aabb.center(), Vec3::new(1.0, 2.0, 3.0));
    }
}
