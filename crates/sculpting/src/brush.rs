//! Sculpt brush: a stateful deformation operator.
//!
//! A stroke runs as: bind a mesh, open a composite on the action log,
//! `set_point_of_action` from an intersection hit, then one `apply` per
//! accepted `update_point_of_action`. Every topological action the brush
//! performs — quad triangulation and edge splits from adaptive subdivision,
//! then one move per displaced vertex — is recorded into the open
//! composite, so the whole stroke step undoes as one unit. Release seals
//! the composite (or drops it when nothing changed) and resets the point
//! of action.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use mesh::actions;
use mesh::half_edge::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshError, VertexId};
use mesh::history::{History, PreconditionError};

use crate::deformation::{self, Sample};
use crate::spatial::VertexOctree;

/// Falloff curve for brush influence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FalloffCurve {
    /// Quartic bump: (1 - d^2)^2. Smooth at the center and at the rim.
    #[default]
    Smooth,
    /// Linear: 1 - d
    Linear,
    /// Quadratic decay: (1 - d)^2
    Sharp,
    /// Full strength across the whole radius
    Constant,
}

impl FalloffCurve {
    /// Strength at a normalized distance (0.0 = center, 1.0 = rim).
    pub fn evaluate(&self, normalized_distance: f32) -> f32 {
        let d = normalized_distance.clamp(0.0, 1.0);
        match self {
            FalloffCurve::Smooth => {
                let t = 1.0 - d * d;
                t * t
            }
            FalloffCurve::Linear => 1.0 - d,
            FalloffCurve::Sharp => {
                let t = 1.0 - d;
                t * t
            }
            FalloffCurve::Constant => 1.0,
        }
    }
}

/// Adaptive subdivision limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubdivisionConfig {
    /// Edges longer than `detail_factor * radius` are split
    pub detail_factor: f32,
    /// Cap on splits per apply, against runaway refinement
    pub max_splits_per_step: usize,
}

impl Default for SubdivisionConfig {
    fn default() -> Self {
        Self {
            detail_factor: 0.75,
            max_splits_per_step: 64,
        }
    }
}

/// Brush parameters, passed in explicitly by the owning tool (persisted
/// defaults are an external concern).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrushConfig {
    /// Falloff radius in world units
    pub radius: f32,
    /// Displacement scale at the center of the falloff
    pub intensity: f32,
    /// Refine the mesh under the brush before displacing
    pub subdivide: bool,
    /// Movement below `step_width_factor * radius` does not advance the
    /// point of action
    pub step_width_factor: f32,
    pub falloff: FalloffCurve,
    pub subdivision: SubdivisionConfig,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            intensity: 0.5,
            subdivide: true,
            step_width_factor: 0.3,
            falloff: FalloffCurve::default(),
            subdivision: SubdivisionConfig::default(),
        }
    }
}

/// Deformation behavior, one variant per mode; constructed fresh per stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrushMode {
    /// Displace along vertex normals; `invert` deflates instead
    Inflate { invert: bool },
    /// Laplacian blend toward the neighbor average
    Smooth,
    /// Drag along the stroke direction
    MoveDirectional,
    /// Level toward the average plane of the affected region
    Flatten,
    /// Tangential pull toward the brush center
    Pinch,
    /// Pinch toward the stroke line and carve along the negated normal
    Crease,
}

/// The surface position and normal a stroke is currently deforming around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointOfAction {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Brush failures. Operating with no active mesh or no point of action is a
/// tool-logic bug and is reported, never silently ignored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SculptError {
    #[error("brush has no active mesh")]
    NoActiveMesh,
    #[error("brush has no point of action")]
    NoPointOfAction,
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// What one `apply` call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StrokeStats {
    pub quads_triangulated: usize,
    pub edges_split: usize,
    pub vertices_moved: usize,
}

/// Stateful sculpt brush for one editing session.
#[derive(Debug, Clone)]
pub struct SculptBrush {
    config: BrushConfig,
    mode: BrushMode,
    /// Bound mesh id (None = no active mesh)
    mesh: Option<u32>,
    point: Option<PointOfAction>,
    /// Movement since the previous accepted point of action
    stroke_delta: Vec3,
}

impl SculptBrush {
    pub fn new(config: BrushConfig, mode: BrushMode) -> Self {
        Self {
            config,
            mode,
            mesh: None,
            point: None,
            stroke_delta: Vec3::ZERO,
        }
    }

    pub fn config(&self) -> &BrushConfig {
        &self.config
    }

    pub fn mode(&self) -> BrushMode {
        self.mode
    }

    /// Swap the deformation mode (between strokes).
    pub fn set_mode(&mut self, mode: BrushMode) {
        self.mode = mode;
    }

    pub fn radius(&self) -> f32 {
        self.config.radius
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.config.radius = radius.max(0.0);
    }

    pub fn mesh(&self) -> Option<u32> {
        self.mesh
    }

    pub fn set_mesh(&mut self, id: u32) {
        self.mesh = Some(id);
    }

    pub fn clear_mesh(&mut self) {
        self.mesh = None;
        self.point = None;
    }

    pub fn point_of_action(&self) -> Option<PointOfAction> {
        self.point
    }

    pub fn has_point_of_action(&self) -> bool {
        self.point.is_some()
    }

    /// Movement between the two most recent accepted points of action.
    pub fn stroke_delta(&self) -> Vec3 {
        self.stroke_delta
    }

    /// Begin a stroke at a surface point.
    pub fn set_point_of_action(&mut self, position: Vec3, normal: Vec3) {
        self.point = Some(PointOfAction { position, normal });
        self.stroke_delta = Vec3::ZERO;
    }

    /// Advance the stroke. Returns false (and leaves the point unchanged)
    /// when the movement since the last point is below the step width —
    /// degenerate zero-length stroke steps are skipped.
    pub fn update_point_of_action(&mut self, position: Vec3, normal: Vec3) -> bool {
        let Some(current) = self.point else {
            self.set_point_of_action(position, normal);
            return true;
        };
        let delta = position - current.position;
        if delta.length() < self.config.step_width_factor * self.config.radius {
            return false;
        }
        self.stroke_delta = delta;
        self.point = Some(PointOfAction { position, normal });
        true
    }

    /// End the stroke; `apply` is rejected until a new point is set.
    pub fn reset_point_of_action(&mut self) {
        self.point = None;
        self.stroke_delta = Vec3::ZERO;
    }

    /// Run one stroke step: subdivide under the brush (when enabled), then
    /// displace every vertex inside the radius, recording all resulting
    /// actions into the history's open composite.
    ///
    /// No vertex farther than the radius from the point of action moves, and
    /// displacement magnitude never increases with distance. Vertices inside
    /// the mirror seam band are pinned onto the mirror plane.
    pub fn apply(
        &mut self,
        mesh: &mut HalfEdgeMesh,
        history: &mut History,
    ) -> Result<StrokeStats, SculptError> {
        if self.mesh.is_none() {
            return Err(SculptError::NoActiveMesh);
        }
        let point = self.point.ok_or(SculptError::NoPointOfAction)?;
        if !history.has_open_composite() {
            return Err(PreconditionError::CompositeNotOpen.into());
        }

        let mut stats = StrokeStats::default();

        if self.config.subdivide {
            self.subdivide_under_brush(mesh, history, point, &mut stats)?;
        }

        let octree = VertexOctree::from_mesh(mesh);
        let mut selected = octree.query_sphere(point.position, self.config.radius);
        selected.sort();

        let sample = Sample {
            position: point.position,
            normal: point.normal,
            radius: self.config.radius,
            intensity: self.config.intensity,
            falloff: self.config.falloff,
        };
        let targets =
            deformation::displacement_targets(mesh, &selected, &sample, &self.mode, self.stroke_delta);

        let mirror = mesh.mirror_plane().copied();
        for (vertex, mut target) in targets {
            let Some(original) = mesh.vertex(vertex).map(|v| v.position) else {
                continue;
            };
            if let Some(mirror) = &mirror {
                // Seam vertices never leave the plane
                if mirror.plane.signed_distance(original).abs() <= mirror.width {
                    target = mirror.plane.project(target);
                }
            }
            if target == original {
                continue;
            }
            let action = actions::move_vertex(mesh, vertex, target)?;
            history.record(action)?;
            stats.vertices_moved += 1;
        }

        mesh.recalculate_normals();

        debug!(
            "apply: {} quads triangulated, {} edges split, {} vertices moved",
            stats.quads_triangulated, stats.edges_split, stats.vertices_moved
        );
        Ok(stats)
    }

    /// Refine the region under the brush: triangulate quads, then split
    /// edges longer than the detail threshold at their midpoints. Subdivide
    /// runs before displacement so detail stays proportional to curvature.
    fn subdivide_under_brush(
        &self,
        mesh: &mut HalfEdgeMesh,
        history: &mut History,
        point: PointOfAction,
        stats: &mut StrokeStats,
    ) -> Result<(), SculptError> {
        let radius = self.config.radius;
        let threshold = self.config.subdivision.detail_factor * radius;

        // Quads under the brush become triangles first
        let mut quads: Vec<FaceId> = mesh
            .faces()
            .filter(|face| {
                let loop_verts = mesh.face_vertices(face.id);
                loop_verts.len() == 4
                    && loop_verts.iter().any(|&v| {
                        mesh.vertex(v)
                            .is_some_and(|vx| vx.position.distance(point.position) <= radius)
                    })
            })
            .map(|face| face.id)
            .collect();
        quads.sort();
        for quad in quads {
            let action = actions::triangulate_quad(mesh, quad)?;
            history.record(action)?;
            stats.quads_triangulated += 1;
        }

        // Long edges inside the ball, one candidate per undirected edge,
        // in id order for determinism
        let mut candidates: Vec<(HalfEdgeId, VertexId, VertexId)> = Vec::new();
        for he in mesh.half_edges() {
            if he.twin.is_some_and(|twin| twin < he.id) {
                continue;
            }
            let Some(dest) = mesh.half_edge_dest(he.id) else {
                continue;
            };
            let (Some(a), Some(b)) = (mesh.vertex(he.origin), mesh.vertex(dest)) else {
                continue;
            };
            let in_reach = a.position.distance(point.position) <= radius
                || b.position.distance(point.position) <= radius;
            if in_reach && a.position.distance(b.position) > threshold {
                candidates.push((he.id, he.origin, dest));
            }
        }
        candidates.sort_by_key(|&(id, _, _)| id);

        for (_, from, to) in candidates {
            if stats.edges_split >= self.config.subdivision.max_splits_per_step {
                trace!(
                    "subdivide: split cap {} reached",
                    self.config.subdivision.max_splits_per_step
                );
                break;
            }
            // An earlier split may have consumed this edge; re-resolve it
            let Some(edge) = mesh.find_half_edge(from, to) else {
                continue;
            };
            if !actions::can_split_edge(mesh, edge) {
                continue;
            }
            let (Some(a), Some(b)) = (mesh.vertex(from), mesh.vertex(to)) else {
                continue;
            };
            if a.position.distance(b.position) <= threshold {
                continue;
            }
            let midpoint = (a.position + b.position) * 0.5;
            let action = actions::split_edge(mesh, edge, midpoint)?;
            history.record(action)?;
            stats.edges_split += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_patch(n: usize) -> HalfEdgeMesh {
        let mut positions = Vec::new();
        for z in 0..n {
            for x in 0..n {
                positions.push(Vec3::new(x as f32, 0.0, z as f32));
            }
        }
        let mut faces = Vec::new();
        for z in 0..n - 1 {
            for x in 0..n - 1 {
                let i = (z * n + x) as u32;
                let right = i + 1;
                let down = i + n as u32;
                let diag = down + 1;
                faces.push(vec![i, diag, right]);
                faces.push(vec![i, down, diag]);
            }
        }
        HalfEdgeMesh::from_faces(&positions, &faces).unwrap()
    }

    fn inflate_brush(radius: f32) -> SculptBrush {
        let config = BrushConfig {
            radius,
            intensity: 1.0,
            subdivide: false,
            ..Default::default()
        };
        SculptBrush::new(config, BrushMode::Inflate { invert: false })
    }

    #[test]
    fn test_falloff_endpoints() {
        for curve in [
            FalloffCurve::Smooth,
            FalloffCurve::Linear,
            FalloffCurve::Sharp,
        ] {
            assert!((curve.evaluate(0.0) - 1.0).abs() < 1e-6);
            assert!(curve.evaluate(1.0).abs() < 1e-6);
        }
        assert_eq!(FalloffCurve::Constant.evaluate(1.0), 1.0);
    }

    #[test]
    fn test_apply_requires_mesh_and_point() {
        let mut mesh = flat_patch(3);
        let mut history = History::new();
        let mut brush = inflate_brush(2.0);

        assert_eq!(
            brush.apply(&mut mesh, &mut history),
            Err(SculptError::NoActiveMesh)
        );

        brush.set_mesh(0);
        assert_eq!(
            brush.apply(&mut mesh, &mut history),
            Err(SculptError::NoPointOfAction)
        );

        brush.set_point_of_action(Vec3::new(1.0, 0.0, 1.0), Vec3::Y);
        assert_eq!(
            brush.apply(&mut mesh, &mut history),
            Err(SculptError::Precondition(
                PreconditionError::CompositeNotOpen
            ))
        );

        history.begin_composite().unwrap();
        assert!(brush.apply(&mut mesh, &mut history).is_ok());
    }

    #[test]
    fn test_apply_rejected_after_reset() {
        let mut mesh = flat_patch(3);
        let mut history = History::new();
        let mut brush = inflate_brush(2.0);
        brush.set_mesh(0);
        brush.set_point_of_action(Vec3::new(1.0, 0.0, 1.0), Vec3::Y);
        brush.reset_point_of_action();

        history.begin_composite().unwrap();
        assert_eq!(
            brush.apply(&mut mesh, &mut history),
            Err(SculptError::NoPointOfAction)
        );
    }

    #[test]
    fn test_update_point_of_action_step_width() {
        let mut brush = inflate_brush(1.0);
        brush.set_point_of_action(Vec3::ZERO, Vec3::Y);

        // step width = 0.3 * radius = 0.3
        assert!(!brush.update_point_of_action(Vec3::new(0.1, 0.0, 0.0), Vec3::Y));
        assert_eq!(brush.point_of_action().unwrap().position, Vec3::ZERO);

        assert!(brush.update_point_of_action(Vec3::new(0.5, 0.0, 0.0), Vec3::Y));
        assert_eq!(
            brush.point_of_action().unwrap().position,
            Vec3::new(0.5, 0.0, 0.0)
        );
        assert_eq!(brush.stroke_delta(), Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_inflate_respects_radius_and_monotonicity() {
        let mut mesh = flat_patch(7);
        let mut history = History::new();
        let mut brush = inflate_brush(2.0);
        brush.set_mesh(0);
        let center = Vec3::new(3.0, 0.0, 3.0);
        brush.set_point_of_action(center, Vec3::Y);

        let original: Vec<(VertexId, Vec3)> =
            mesh.vertices().map(|v| (v.id, v.position)).collect();

        history.begin_composite().unwrap();
        let stats = brush.apply(&mut mesh, &mut history).unwrap();
        assert!(history.seal_composite(&mut mesh).unwrap());
        assert!(stats.vertices_moved > 0);

        let mut moved: Vec<(f32, f32)> = Vec::new();
        for (id, before) in original {
            let after = mesh.vertex(id).unwrap().position;
            let displacement = (after - before).length();
            let distance = before.distance(center);
            if distance >= 2.0 {
                assert_eq!(displacement, 0.0, "{id:?} is outside the radius");
            } else {
                assert!(displacement > 0.0, "{id:?} is inside the radius");
                moved.push((distance, displacement));
            }
        }

        // Displacement is non-increasing in distance from the point of action
        moved.sort_by(|a, b| a.0.total_cmp(&b.0));
        for pair in moved.windows(2) {
            assert!(pair[1].1 <= pair[0].1 + 1e-6);
        }
    }

    #[test]
    fn test_stroke_undo_restores_mesh() {
        let mut mesh = flat_patch(5);
        let mut history = History::new();
        let before = mesh.signature();

        let mut brush = inflate_brush(2.0);
        brush.set_mesh(0);
        brush.set_point_of_action(Vec3::new(2.0, 0.0, 2.0), Vec3::Y);

        history.begin_composite().unwrap();
        brush.apply(&mut mesh, &mut history).unwrap();
        assert!(history.seal_composite(&mut mesh).unwrap());
        let after = mesh.signature();
        assert_ne!(before, after);

        assert!(history.undo(&mut mesh).unwrap());
        assert_eq!(mesh.signature(), before);

        assert!(history.redo(&mut mesh).unwrap());
        assert_eq!(mesh.signature(), after);
    }

    #[test]
    fn test_subdivision_splits_long_edges() {
        let mut mesh = flat_patch(3);
        let mut history = History::new();
        let config = BrushConfig {
            radius: 2.0,
            intensity: 0.2,
            subdivide: true,
            subdivision: SubdivisionConfig {
                detail_factor: 0.4, // threshold 0.8 < grid edge length 1.0
                max_splits_per_step: 64,
            },
            ..Default::default()
        };
        let mut brush = SculptBrush::new(config, BrushMode::Inflate { invert: false });
        brush.set_mesh(0);
        brush.set_point_of_action(Vec3::new(1.0, 0.0, 1.0), Vec3::Y);

        let faces_before = mesh.face_count();
        history.begin_composite().unwrap();
        let stats = brush.apply(&mut mesh, &mut history).unwrap();
        history.seal_composite(&mut mesh).unwrap();

        assert!(stats.edges_split > 0);
        assert!(mesh.face_count() > faces_before);
        assert!(mesh.is_manifold());
    }

    #[test]
    fn test_subdivision_triangulates_quads_first() {
        let mut mesh = HalfEdgeMesh::from_faces(
            &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            &[vec![0, 3, 2, 1]],
        )
        .unwrap();
        let mut history = History::new();

        let config = BrushConfig {
            radius: 2.0,
            intensity: 0.1,
            subdivide: true,
            ..Default::default()
        };
        let mut brush = SculptBrush::new(config, BrushMode::Inflate { invert: false });
        brush.set_mesh(0);
        brush.set_point_of_action(Vec3::new(0.5, 0.0, 0.5), Vec3::Y);

        history.begin_composite().unwrap();
        let stats = brush.apply(&mut mesh, &mut history).unwrap();
        history.seal_composite(&mut mesh).unwrap();

        assert_eq!(stats.quads_triangulated, 1);
        assert!(mesh.faces().all(|f| mesh.face_vertices(f.id).len() == 3));
        assert!(mesh.is_manifold());
    }

    #[test]
    fn test_stroke_with_subdivision_undoes_cleanly() {
        let mut mesh = flat_patch(4);
        let mut history = History::new();
        let before = mesh.signature();

        let config = BrushConfig {
            radius: 1.5,
            intensity: 0.5,
            subdivide: true,
            subdivision: SubdivisionConfig {
                detail_factor: 0.5,
                max_splits_per_step: 16,
            },
            ..Default::default()
        };
        let mut brush = SculptBrush::new(config, BrushMode::Inflate { invert: false });
        brush.set_mesh(0);
        brush.set_point_of_action(Vec3::new(1.5, 0.0, 1.5), Vec3::Y);

        history.begin_composite().unwrap();
        brush.apply(&mut mesh, &mut history).unwrap();
        history.seal_composite(&mut mesh).unwrap();
        let after = mesh.signature();

        assert!(history.undo(&mut mesh).unwrap());
        assert_eq!(mesh.signature(), before);
        assert!(mesh.is_manifold());

        assert!(history.redo(&mut mesh).unwrap());
        assert_eq!(mesh.signature(), after);
        assert!(mesh.is_manifold());
    }

    #[test]
    fn test_mirror_seam_vertices_stay_pinned() {
        use mesh::geom::{MirrorPlane, Plane};

        let mut mesh = flat_patch(3);
        // Shift the patch so column x=0 sits on the YZ plane
        mesh.set_mirror_plane(MirrorPlane {
            plane: Plane::new(Vec3::X, 0.0),
            width: 1e-3,
        });

        let mut history = History::new();
        // MoveDirectional drags off-plane; seam vertices must not follow
        let config = BrushConfig {
            radius: 2.0,
            intensity: 1.0,
            subdivide: false,
            ..Default::default()
        };
        let mut brush = SculptBrush::new(config, BrushMode::MoveDirectional);
        brush.set_mesh(0);
        brush.set_point_of_action(Vec3::new(0.0, 0.0, 1.0), Vec3::Y);
        brush.update_point_of_action(Vec3::new(1.0, 0.0, 1.0), Vec3::Y);

        history.begin_composite().unwrap();
        brush.apply(&mut mesh, &mut history).unwrap();
        history.seal_composite(&mut mesh).unwrap();

        for v in [0u32, 3, 6] {
            let position = mesh.vertex(VertexId(v)).unwrap().position;
            assert!(
                position.x.abs() <= 1e-6,
                "seam vertex {v} left the mirror plane: {position}"
            );
        }
    }

    #[test]
    fn test_drop_last_for_no_effect_stroke() {
        let mut mesh = flat_patch(3);
        let mut history = History::new();
        let mut brush = inflate_brush(0.5);
        brush.set_mesh(0);
        // Point of action far away from the patch: nothing inside the radius
        brush.set_point_of_action(Vec3::new(50.0, 50.0, 50.0), Vec3::Y);

        history.begin_composite().unwrap();
        let stats = brush.apply(&mut mesh, &mut history).unwrap();
        assert_eq!(stats.vertices_moved, 0);
        // Empty gesture: sealing discards it
        assert!(!history.seal_composite(&mut mesh).unwrap());
        assert!(history.is_empty());
    }
}
