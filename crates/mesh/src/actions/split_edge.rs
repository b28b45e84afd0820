//! Edge split: insert a new vertex at a caller-supplied position along an
//! edge, re-triangulating each incident face into two.
//!
//! ```text
//!     Before:              After:
//!        C                    C
//!       /|\                  /|\
//!      / | \                / | \
//!     /  |  \              /  |  \
//!    A---+---B    ->    A--M--+--B
//!     \  |  /              \  |  /
//!      \ | /                \ | /
//!       \|/                  \|/
//!        D                    D
//! ```
//!
//! Incident faces must be triangles; callers triangulate quads first.

use glam::Vec3;
use tracing::trace;

use crate::half_edge::{
    FaceId, HalfEdgeId, HalfEdgeMesh, IdentityError, MeshError, TopologyError, VertexId,
};

use super::Action;

/// The gathered geometry of a splittable edge.
struct SplitSite {
    v0: VertexId,
    v1: VertexId,
    /// (face, loop rotated to start at the edge origin, opposite vertex)
    faces: Vec<(FaceId, [VertexId; 3], VertexId)>,
}

fn split_site(mesh: &HalfEdgeMesh, edge: HalfEdgeId) -> Result<SplitSite, MeshError> {
    let he = mesh
        .half_edge(edge)
        .ok_or(IdentityError::UnknownHalfEdge(edge))?;
    let v0 = he.origin;
    let v1 = mesh
        .half_edge_dest(edge)
        .ok_or_else(|| TopologyError::Corrupt(format!("{edge:?} has no destination")))?;

    let mut faces = Vec::with_capacity(2);
    let near = rotated_triangle(mesh, he.face, v0)?;
    faces.push((he.face, near, near[2]));
    if let Some(twin) = he.twin {
        let twin_he = mesh
            .half_edge(twin)
            .ok_or(IdentityError::UnknownHalfEdge(twin))?;
        let far = rotated_triangle(mesh, twin_he.face, v1)?;
        faces.push((twin_he.face, far, far[2]));
    }

    Ok(SplitSite { v0, v1, faces })
}

/// A face's loop rotated so `first` leads; fails unless it is a triangle.
fn rotated_triangle(
    mesh: &HalfEdgeMesh,
    face: FaceId,
    first: VertexId,
) -> Result<[VertexId; 3], MeshError> {
    let loop_verts = mesh.face_vertices(face);
    if loop_verts.len() != 3 {
        return Err(TopologyError::NotATriangle(face).into());
    }
    let start = loop_verts
        .iter()
        .position(|&v| v == first)
        .ok_or_else(|| TopologyError::Corrupt(format!("{first:?} not on face {face:?}")))?;
    Ok([
        loop_verts[start],
        loop_verts[(start + 1) % 3],
        loop_verts[(start + 2) % 3],
    ])
}

/// Whether the edge exists and both incident faces are triangles.
pub fn can_split_edge(mesh: &HalfEdgeMesh, edge: HalfEdgeId) -> bool {
    split_site(mesh, edge).is_ok()
}

/// Split an edge at `position`, replacing each incident face with two
/// triangles fanned around the new vertex.
pub fn split_edge(
    mesh: &mut HalfEdgeMesh,
    edge: HalfEdgeId,
    position: Vec3,
) -> Result<Action, MeshError> {
    let site = split_site(mesh, edge)?;
    let (v0, v1) = (site.v0, site.v1);

    let mut replaced = Vec::with_capacity(2);
    for &(face, loop_verts, _) in &site.faces {
        mesh.delete_face(face)?;
        replaced.push((face, loop_verts));
    }

    let mid = mesh.add_vertex(position);

    let mut created = Vec::with_capacity(4);
    for &(_, loop_verts, opposite) in &site.faces {
        // loop_verts = [from, to, opposite] for this side of the edge
        let (from, to) = (loop_verts[0], loop_verts[1]);
        for child in [[from, mid, opposite], [mid, to, opposite]] {
            let face = mesh.add_face(&child)?;
            created.push((face, child));
        }
    }

    trace!(
        "split_edge: {:?} ({:?} -> {:?}) at {:?}, {} faces replaced",
        edge,
        v0,
        v1,
        position,
        replaced.len()
    );

    Ok(Action::SplitEdge {
        vertex: mid,
        position,
        replaced,
        created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::half_edge::fixtures::*;

    #[test]
    fn test_split_interior_edge() {
        let mut mesh = bowtie();
        let edge = mesh.find_half_edge(VertexId(0), VertexId(1)).unwrap();

        let action = split_edge(&mut mesh, edge, Vec3::ZERO).unwrap();

        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.face_count(), 4);
        assert!(mesh.is_manifold());

        let Action::SplitEdge { vertex, created, .. } = &action else {
            panic!("wrong variant");
        };
        assert_eq!(created.len(), 4);
        assert_eq!(mesh.neighbors(*vertex).unwrap().len(), 4);
    }

    #[test]
    fn test_split_boundary_edge() {
        let mut mesh = bowtie();
        let edge = mesh.find_half_edge(VertexId(1), VertexId(2)).unwrap();
        assert!(mesh.is_boundary_edge(edge));

        let action = split_edge(&mut mesh, edge, Vec3::new(0.5, 0.5, 0.0)).unwrap();

        assert_eq!(mesh.face_count(), 3);
        assert!(mesh.is_manifold());

        let Action::SplitEdge { replaced, created, .. } = &action else {
            panic!("wrong variant");
        };
        assert_eq!(replaced.len(), 1);
        assert_eq!(created.len(), 2);
    }

    #[test]
    fn test_split_uses_caller_position() {
        let mut mesh = bowtie();
        let edge = mesh.find_half_edge(VertexId(0), VertexId(1)).unwrap();
        let position = Vec3::new(0.25, 0.0, 0.0);

        let action = split_edge(&mut mesh, edge, position).unwrap();
        let Action::SplitEdge { vertex, .. } = &action else {
            panic!("wrong variant");
        };
        assert_eq!(mesh.vertex(*vertex).unwrap().position, position);
    }

    #[test]
    fn test_split_undo_redo_roundtrip() {
        let mut mesh = bowtie();
        let before = mesh.signature();
        let edge = mesh.find_half_edge(VertexId(0), VertexId(1)).unwrap();

        let action = split_edge(&mut mesh, edge, Vec3::ZERO).unwrap();
        let after = mesh.signature();

        action.undo(&mut mesh).unwrap();
        assert_eq!(mesh.signature(), before);
        assert!(mesh.is_manifold());

        action.redo(&mut mesh).unwrap();
        assert_eq!(mesh.signature(), after);
        assert!(mesh.is_manifold());
    }

    #[test]
    fn test_split_rejects_unknown_edge() {
        let mut mesh = bowtie();
        let err = split_edge(&mut mesh, HalfEdgeId(99), Vec3::ZERO).unwrap_err();
        assert_eq!(
            err,
            MeshError::Identity(IdentityError::UnknownHalfEdge(HalfEdgeId(99)))
        );
    }

    #[test]
    fn test_split_rejects_quad_face() {
        let mut mesh = single_quad();
        let edge = mesh.find_half_edge(VertexId(0), VertexId(1)).unwrap();
        let before = mesh.signature();

        let err = split_edge(&mut mesh, edge, Vec3::ZERO).unwrap_err();
        assert_eq!(
            err,
            MeshError::Topology(TopologyError::NotATriangle(FaceId(0)))
        );
        // All-or-nothing: the mesh is untouched
        assert_eq!(mesh.signature(), before);
    }

    #[test]
    fn test_split_keeps_grid_manifold() {
        let mut mesh = triangle_grid(3);
        let edge = mesh.find_half_edge(VertexId(0), VertexId(4)).unwrap();

        split_edge(&mut mesh, edge, Vec3::new(0.5, 0.0, 0.5)).unwrap();
        assert!(mesh.is_manifold());
        assert_eq!(mesh.face_count(), 10);
    }
}
