//! Displacement fields for each brush mode.
//!
//! These functions are read-only: they compute per-vertex target positions
//! from current mesh state, and the brush turns the targets into recorded
//! move actions. Modes that read neighbor state (smooth) compute every
//! target before any position would change, so results never depend on
//! iteration order.

use glam::Vec3;
use mesh::half_edge::{HalfEdgeMesh, VertexId};

use crate::brush::{BrushMode, FalloffCurve};

/// One evaluation of the brush at its point of action.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub position: Vec3,
    pub normal: Vec3,
    pub radius: f32,
    pub intensity: f32,
    pub falloff: FalloffCurve,
}

impl Sample {
    /// Falloff-weighted strength at `distance` from the point of action.
    fn weight(&self, distance: f32) -> f32 {
        if distance > self.radius || self.radius <= 0.0 {
            return 0.0;
        }
        self.falloff.evaluate(distance / self.radius) * self.intensity
    }
}

/// Compute displacement targets for the selected vertices under a mode.
pub fn displacement_targets(
    mesh: &HalfEdgeMesh,
    vertices: &[VertexId],
    sample: &Sample,
    mode: &BrushMode,
    stroke_delta: Vec3,
) -> Vec<(VertexId, Vec3)> {
    match mode {
        BrushMode::Inflate { invert } => inflate_targets(mesh, vertices, sample, *invert),
        BrushMode::Smooth => smooth_targets(mesh, vertices, sample),
        BrushMode::MoveDirectional => move_directional_targets(mesh, vertices, sample, stroke_delta),
        BrushMode::Flatten => flatten_targets(mesh, vertices, sample),
        BrushMode::Pinch => pinch_targets(mesh, vertices, sample),
        BrushMode::Crease => crease_targets(mesh, vertices, sample, stroke_delta),
    }
}

/// Move vertices along their own normals (deflate when inverted).
pub fn inflate_targets(
    mesh: &HalfEdgeMesh,
    vertices: &[VertexId],
    sample: &Sample,
    invert: bool,
) -> Vec<(VertexId, Vec3)> {
    let sign = if invert { -1.0 } else { 1.0 };
    let mut targets = Vec::new();

    for &id in vertices {
        let Some(vertex) = mesh.vertex(id) else {
            continue;
        };
        let weight = sample.weight(vertex.position.distance(sample.position));
        if weight <= 0.0 {
            continue;
        }
        let direction = vertex.normal.normalize_or_zero();
        targets.push((id, vertex.position + direction * (weight * sign)));
    }

    targets
}

/// Blend vertices toward their neighbor average. Two-pass: all targets are
/// computed from the untouched positions.
pub fn smooth_targets(
    mesh: &HalfEdgeMesh,
    vertices: &[VertexId],
    sample: &Sample,
) -> Vec<(VertexId, Vec3)> {
    let mut targets = Vec::new();

    for &id in vertices {
        let Some(vertex) = mesh.vertex(id) else {
            continue;
        };
        let weight = sample.weight(vertex.position.distance(sample.position));
        if weight <= 0.0 {
            continue;
        }

        let Ok(neighbors) = mesh.neighbors(id) else {
            continue;
        };
        if neighbors.is_empty() {
            continue;
        }
        let mut average = Vec3::ZERO;
        let mut count = 0;
        for neighbor in neighbors {
            if let Some(n) = mesh.vertex(neighbor) {
                average += n.position;
                count += 1;
            }
        }
        if count == 0 {
            continue;
        }
        average /= count as f32;

        targets.push((id, vertex.position.lerp(average, weight.min(1.0))));
    }

    targets
}

/// Drag vertices along the stroke direction.
pub fn move_directional_targets(
    mesh: &HalfEdgeMesh,
    vertices: &[VertexId],
    sample: &Sample,
    stroke_delta: Vec3,
) -> Vec<(VertexId, Vec3)> {
    let mut targets = Vec::new();
    if stroke_delta.length_squared() == 0.0 {
        return targets;
    }

    for &id in vertices {
        let Some(vertex) = mesh.vertex(id) else {
            continue;
        };
        let weight = sample.weight(vertex.position.distance(sample.position));
        if weight <= 0.0 {
            continue;
        }
        targets.push((id, vertex.position + stroke_delta * weight));
    }

    targets
}

/// Project vertices toward the average plane of the affected region.
pub fn flatten_targets(
    mesh: &HalfEdgeMesh,
    vertices: &[VertexId],
    sample: &Sample,
) -> Vec<(VertexId, Vec3)> {
    let mut targets = Vec::new();

    // Average plane from the affected vertices
    let mut plane_point = Vec3::ZERO;
    let mut plane_normal = Vec3::ZERO;
    let mut count = 0;
    for &id in vertices {
        let Some(vertex) = mesh.vertex(id) else {
            continue;
        };
        if vertex.position.distance(sample.position) <= sample.radius {
            plane_point += vertex.position;
            plane_normal += vertex.normal;
            count += 1;
        }
    }
    if count == 0 {
        return targets;
    }
    plane_point /= count as f32;
    let plane_normal = if plane_normal.length_squared() > 1e-4 {
        plane_normal.normalize()
    } else {
        sample.normal
    };

    for &id in vertices {
        let Some(vertex) = mesh.vertex(id) else {
            continue;
        };
        let weight = sample.weight(vertex.position.distance(sample.position));
        if weight <= 0.0 {
            continue;
        }
        let offset = (vertex.position - plane_point).dot(plane_normal);
        let projected = vertex.position - plane_normal * offset;
        targets.push((id, vertex.position.lerp(projected, weight.min(1.0))));
    }

    targets
}

/// Pull vertices toward the brush center along the surface tangent.
pub fn pinch_targets(
    mesh: &HalfEdgeMesh,
    vertices: &[VertexId],
    sample: &Sample,
) -> Vec<(VertexId, Vec3)> {
    let mut targets = Vec::new();

    for &id in vertices {
        let Some(vertex) = mesh.vertex(id) else {
            continue;
        };
        let distance = vertex.position.distance(sample.position);
        let weight = sample.weight(distance);
        if weight <= 0.0 || distance <= 1e-6 {
            continue;
        }
        let to_center = sample.position - vertex.position;
        let normal = vertex.normal.normalize_or_zero();
        let tangent = to_center - normal * to_center.dot(normal);
        // Never pull past the center
        let step = tangent * weight * 0.5;
        targets.push((id, vertex.position + step));
    }

    targets
}

/// Carve a groove along the stroke: pinch toward the stroke line and push
/// against the surface normal.
pub fn crease_targets(
    mesh: &HalfEdgeMesh,
    vertices: &[VertexId],
    sample: &Sample,
    stroke_delta: Vec3,
) -> Vec<(VertexId, Vec3)> {
    let mut targets = Vec::new();
    let direction = stroke_delta.normalize_or_zero();
    if direction.length_squared() == 0.0 {
        return targets;
    }

    for &id in vertices {
        let Some(vertex) = mesh.vertex(id) else {
            continue;
        };
        let weight = sample.weight(vertex.position.distance(sample.position));
        if weight <= 0.0 {
            continue;
        }

        let to_vertex = vertex.position - sample.position;
        let along = to_vertex.dot(direction);
        let perpendicular = to_vertex - direction * along;

        let pinch = -perpendicular * 0.5;
        let carve = -sample.normal * 0.5;
        targets.push((id, vertex.position + (pinch + carve) * weight));
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::half_edge::HalfEdgeMesh;

    fn flat_patch() -> HalfEdgeMesh {
        // 3x3 vertex grid in the XZ plane, normals +Y
        let mut positions = Vec::new();
        for z in 0..3 {
            for x in 0..3 {
                positions.push(Vec3::new(x as f32, 0.0, z as f32));
            }
        }
        let faces = vec![
            vec![0, 4, 1],
            vec![0, 3, 4],
            vec![1, 5, 2],
            vec![1, 4, 5],
            vec![3, 7, 4],
            vec![3, 6, 7],
            vec![4, 8, 5],
            vec![4, 7, 8],
        ];
        HalfEdgeMesh::from_faces(&positions, &faces).unwrap()
    }

    fn sample_at(position: Vec3, radius: f32) -> Sample {
        Sample {
            position,
            normal: Vec3::Y,
            radius,
            intensity: 1.0,
            falloff: FalloffCurve::Smooth,
        }
    }

    #[test]
    fn test_inflate_moves_along_normals() {
        let mesh = flat_patch();
        let all: Vec<VertexId> = mesh.vertices().map(|v| v.id).collect();
        let sample = sample_at(Vec3::new(1.0, 0.0, 1.0), 10.0);

        let targets = inflate_targets(&mesh, &all, &sample, false);
        assert_eq!(targets.len(), all.len());
        for (id, target) in targets {
            let original = mesh.vertex(id).unwrap().position;
            let displacement = target - original;
            assert!(displacement.y > 0.0, "{id:?} must move up");
            assert!(displacement.x.abs() < 1e-6 && displacement.z.abs() < 1e-6);
        }
    }

    #[test]
    fn test_inflate_invert_reverses_direction() {
        let mesh = flat_patch();
        let all: Vec<VertexId> = mesh.vertices().map(|v| v.id).collect();
        let sample = sample_at(Vec3::new(1.0, 0.0, 1.0), 10.0);

        for (_, target) in inflate_targets(&mesh, &all, &sample, true) {
            assert!(target.y < 0.0);
        }
    }

    #[test]
    fn test_weight_monotone_in_distance() {
        let sample = sample_at(Vec3::ZERO, 2.0);
        let mut previous = f32::INFINITY;
        for step in 0..10 {
            let weight = sample.weight(step as f32 * 0.2);
            assert!(weight <= previous);
            previous = weight;
        }
        assert_eq!(sample.weight(2.5), 0.0);
    }

    #[test]
    fn test_smooth_is_identity_on_flat_patch_interior() {
        let mesh = flat_patch();
        let center = VertexId(4);
        let sample = sample_at(Vec3::new(1.0, 0.0, 1.0), 5.0);

        let targets = smooth_targets(&mesh, &[center], &sample);
        assert_eq!(targets.len(), 1);
        // The neighbor average of the center of a symmetric flat patch is
        // the center itself
        let (_, target) = targets[0];
        assert!((target - Vec3::new(1.0, 0.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_smooth_pulls_spike_down() {
        let mut mesh = flat_patch();
        mesh.move_vertex(VertexId(4), Vec3::new(1.0, 1.0, 1.0)).unwrap();
        mesh.recalculate_normals();

        let sample = sample_at(Vec3::new(1.0, 1.0, 1.0), 5.0);
        let targets = smooth_targets(&mesh, &[VertexId(4)], &sample);
        let (_, target) = targets[0];
        assert!(target.y < 1.0);
    }

    #[test]
    fn test_move_directional_follows_delta() {
        let mesh = flat_patch();
        let delta = Vec3::new(0.0, 0.5, 0.0);
        let sample = sample_at(Vec3::new(1.0, 0.0, 1.0), 0.5);

        let targets = move_directional_targets(&mesh, &[VertexId(4)], &sample, delta);
        assert_eq!(targets.len(), 1);
        let (_, target) = targets[0];
        // Center vertex sits at the point of action: full falloff weight
        assert!((target - Vec3::new(1.0, 0.5, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_flatten_levels_a_spike() {
        let mut mesh = flat_patch();
        mesh.move_vertex(VertexId(4), Vec3::new(1.0, 0.5, 1.0)).unwrap();
        mesh.recalculate_normals();

        let all: Vec<VertexId> = mesh.vertices().map(|v| v.id).collect();
        let sample = sample_at(Vec3::new(1.0, 0.5, 1.0), 10.0);

        let targets = flatten_targets(&mesh, &all, &sample);
        let spike_target = targets
            .iter()
            .find(|(id, _)| *id == VertexId(4))
            .map(|&(_, t)| t)
            .unwrap();
        assert!(spike_target.y < 0.5);
    }

    #[test]
    fn test_pinch_moves_toward_center_in_tangent_plane() {
        let mesh = flat_patch();
        let sample = sample_at(Vec3::new(1.0, 0.0, 1.0), 5.0);

        let targets = pinch_targets(&mesh, &[VertexId(0)], &sample);
        let (_, target) = targets[0];
        let before = mesh.vertex(VertexId(0)).unwrap().position.distance(sample.position);
        let after = target.distance(sample.position);
        assert!(after < before);
        assert!(target.y.abs() < 1e-6, "pinch stays in the tangent plane");
    }

    #[test]
    fn test_crease_carves_below_surface() {
        let mesh = flat_patch();
        let sample = sample_at(Vec3::new(1.0, 0.0, 1.0), 5.0);
        let delta = Vec3::new(0.2, 0.0, 0.0);

        let targets = crease_targets(&mesh, &[VertexId(4)], &sample, delta);
        let (_, target) = targets[0];
        assert!(target.y < 0.0);
    }
}
