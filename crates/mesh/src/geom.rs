//! Shared geometric primitives: axis-aligned bounding boxes and planes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that grows to fit the first point included.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        closest.distance_squared(center) <= radius * radius
    }
}

/// An oriented plane in normal-offset form: `dot(normal, p) == offset`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self {
            normal: normal.normalize_or_zero(),
            offset,
        }
    }

    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self {
            normal,
            offset: normal.dot(point),
        }
    }

    /// Signed distance from the plane; positive on the normal side.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }

    /// Orthogonal projection of `point` onto the plane.
    pub fn project(&self, point: Vec3) -> Vec3 {
        point - self.normal * self.signed_distance(point)
    }

    /// Mirror image of `point` across the plane.
    pub fn reflect_point(&self, point: Vec3) -> Vec3 {
        point - self.normal * (2.0 * self.signed_distance(point))
    }

    /// Mirror image of a direction vector across the plane.
    pub fn reflect_vector(&self, vector: Vec3) -> Vec3 {
        vector - self.normal * (2.0 * self.normal.dot(vector))
    }
}

/// A symmetry plane attached to a mesh, with the seam band width inside
/// which vertices are pinned onto the plane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MirrorPlane {
    pub plane: Plane,
    pub width: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_include_and_contains() {
        let mut aabb = Aabb::empty();
        aabb.include_point(Vec3::ZERO);
        aabb.include_point(Vec3::new(2.0, 1.0, 3.0));

        assert!(aabb.contains_point(Vec3::new(1.0, 0.5, 1.5)));
        assert!(!aabb.contains_point(Vec3::new(-0.1, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_sphere_intersection() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(1.0));
        assert!(aabb.intersects_sphere(Vec3::splat(1.5), 1.0));
        assert!(!aabb.intersects_sphere(Vec3::splat(3.0), 1.0));
    }

    #[test]
    fn test_plane_distance_and_projection() {
        let plane = Plane::new(Vec3::X, 0.0);

        assert!((plane.signed_distance(Vec3::new(2.0, 1.0, 0.0)) - 2.0).abs() < 1e-6);
        assert!((plane.signed_distance(Vec3::new(-1.0, 0.0, 5.0)) + 1.0).abs() < 1e-6);

        let projected = plane.project(Vec3::new(3.0, 1.0, -2.0));
        assert!((projected - Vec3::new(0.0, 1.0, -2.0)).length() < 1e-6);
    }

    #[test]
    fn test_plane_reflection() {
        let plane = Plane::new(Vec3::X, 0.0);
        let reflected = plane.reflect_point(Vec3::new(2.0, 1.0, 1.0));
        assert!((reflected - Vec3::new(-2.0, 1.0, 1.0)).length() < 1e-6);

        // Points on the plane are fixed by reflection
        let on_plane = Vec3::new(0.0, 4.0, -3.0);
        assert!((plane.reflect_point(on_plane) - on_plane).length() < 1e-6);
    }
}
