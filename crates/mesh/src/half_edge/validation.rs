//! Validation methods for HalfEdgeMesh: manifold checking and structural
//! snapshots for state comparison.

use std::collections::HashMap;

use glam::Vec3;

use super::types::{FaceId, TopologyError, VertexId};
use super::HalfEdgeMesh;

/// A structural snapshot of mesh state: vertex positions plus face loops in
/// canonical rotation. Two meshes with equal signatures have the same
/// geometry and the same face/half-edge adjacency.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSignature {
    pub vertices: Vec<(VertexId, Vec3)>,
    pub faces: Vec<(FaceId, Vec<VertexId>)>,
}

impl HalfEdgeMesh {
    /// Validation predicate used by tests and by mirroring.
    pub fn is_manifold(&self) -> bool {
        self.check_manifold().is_ok()
    }

    /// Check the manifold-with-boundary invariants:
    ///
    /// 1. twin relationships are symmetric and point in opposite directions
    /// 2. every face cycle closes with 3 or 4 half-edges that agree on their
    ///    face and have consistent next/prev links
    /// 3. the faces around each vertex form a single fan
    ///
    /// The directed edge map makes a third face per edge unrepresentable, so
    /// edge over-incidence is rejected at construction rather than here.
    pub fn check_manifold(&self) -> Result<(), TopologyError> {
        // Check 1: twin symmetry and direction
        for he in self.half_edges() {
            let Some(twin_id) = he.twin else {
                continue;
            };
            let twin = self.half_edge(twin_id).ok_or_else(|| {
                TopologyError::Corrupt(format!("{:?} has dead twin {:?}", he.id, twin_id))
            })?;
            if twin.twin != Some(he.id) {
                return Err(TopologyError::Corrupt(format!(
                    "twin symmetry violated at {:?}",
                    he.id
                )));
            }
            if self.half_edge_dest(he.id) != Some(twin.origin)
                || self.half_edge_dest(twin_id) != Some(he.origin)
            {
                return Err(TopologyError::Corrupt(format!(
                    "twin direction mismatch at {:?}",
                    he.id
                )));
            }
        }

        // Check 2: face cycles
        for face in self.faces() {
            let start = face.half_edge;
            let mut current = start;
            let mut count = 0usize;
            loop {
                let he = self.half_edge(current).ok_or_else(|| {
                    TopologyError::Corrupt(format!("face {:?} cycle broken", face.id))
                })?;
                if he.face != face.id {
                    return Err(TopologyError::Corrupt(format!(
                        "{:?} claims {:?} but lies on {:?} cycle",
                        he.id, he.face, face.id
                    )));
                }
                let next = self.half_edge(he.next).ok_or_else(|| {
                    TopologyError::Corrupt(format!("face {:?} cycle broken", face.id))
                })?;
                if next.prev != he.id {
                    return Err(TopologyError::Corrupt(format!(
                        "next/prev mismatch at {:?}",
                        he.id
                    )));
                }
                count += 1;
                current = he.next;
                if current == start {
                    break;
                }
                if count > 4 {
                    return Err(TopologyError::Corrupt(format!(
                        "face {:?} cycle does not close",
                        face.id
                    )));
                }
            }
            if count < 3 {
                return Err(TopologyError::Corrupt(format!(
                    "face {:?} has {count} edges",
                    face.id
                )));
            }
        }

        // Check 3: single fan per vertex — the faces reachable by walking the
        // fan must be all faces that contain the vertex
        let mut membership: HashMap<VertexId, usize> = HashMap::new();
        for face in self.faces() {
            for v in self.face_vertices(face.id) {
                *membership.entry(v).or_insert(0) += 1;
            }
        }
        for vertex in self.vertices() {
            let total = membership.get(&vertex.id).copied().unwrap_or(0);
            if vertex.outgoing.is_none() {
                if total > 0 {
                    return Err(TopologyError::Corrupt(format!(
                        "{:?} has faces but no outgoing half-edge",
                        vertex.id
                    )));
                }
                continue;
            }
            let reachable = self
                .vertex_faces(vertex.id)
                .map_err(|_| TopologyError::Corrupt(format!("{:?} fan walk failed", vertex.id)))?
                .len();
            if reachable != total {
                return Err(TopologyError::Corrupt(format!(
                    "{:?} fan reaches {reachable} of {total} incident faces",
                    vertex.id
                )));
            }
        }

        Ok(())
    }

    /// Structural snapshot for equality tests and debugging. Face loops are
    /// rotated so the smallest vertex id comes first, which makes the
    /// signature independent of which half-edge a face happens to anchor.
    pub fn signature(&self) -> MeshSignature {
        let mut vertices: Vec<(VertexId, Vec3)> = self
            .vertices()
            .map(|v| (v.id, v.position))
            .collect();
        vertices.sort_by_key(|&(id, _)| id);

        let mut faces: Vec<(FaceId, Vec<VertexId>)> = self
            .faces()
            .map(|f| (f.id, canonical_rotation(self.face_vertices(f.id))))
            .collect();
        faces.sort_by_key(|&(id, _)| id);

        MeshSignature { vertices, faces }
    }
}

fn canonical_rotation(loop_verts: Vec<VertexId>) -> Vec<VertexId> {
    let Some(min_index) = loop_verts
        .iter()
        .enumerate()
        .min_by_key(|&(_, v)| v)
        .map(|(i, _)| i)
    else {
        return loop_verts;
    };
    let mut rotated = loop_verts;
    rotated.rotate_left(min_index);
    rotated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::half_edge::fixtures::*;
    use crate::half_edge::MeshError;

    #[test]
    fn test_fixtures_are_manifold() {
        assert!(single_triangle().is_manifold());
        assert!(bowtie().is_manifold());
        assert!(single_quad().is_manifold());
        assert!(triangle_grid(5).is_manifold());
    }

    #[test]
    fn test_manifold_after_face_deletion() {
        let mut mesh = triangle_grid(3);
        mesh.delete_face(FaceId(0)).unwrap();
        assert!(mesh.is_manifold());
    }

    #[test]
    fn test_two_fans_at_one_vertex_is_not_manifold() {
        // Two triangles touching only at vertex 2 form a double fan
        let mesh = HalfEdgeMesh::from_faces(
            &[
                Vec3::new(-2.0, 0.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
            ],
            &[vec![0, 2, 1], vec![2, 4, 3]],
        );
        match mesh {
            Ok(mesh) => assert!(!mesh.is_manifold()),
            Err(MeshError::Topology(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_signature_detects_position_change() {
        let mut mesh = bowtie();
        let before = mesh.signature();
        assert_eq!(before, mesh.signature());

        mesh.move_vertex(VertexId(0), Vec3::splat(5.0)).unwrap();
        assert_ne!(before, mesh.signature());
    }

    #[test]
    fn test_signature_canonical_rotation() {
        // The same face loop expressed from a different starting vertex
        // yields the same signature entry
        let a = canonical_rotation(vec![VertexId(2), VertexId(0), VertexId(1)]);
        let b = canonical_rotation(vec![VertexId(0), VertexId(1), VertexId(2)]);
        assert_eq!(a, b);
    }
}
