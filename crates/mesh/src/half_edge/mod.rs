//! Half-edge mesh store.
//!
//! Vertices, half-edges and faces live in arena-indexed slot stores keyed by
//! stable integer ids, with free-id pools for reuse. All cross-references are
//! ids, never owning references, so deleting an element mid-action and
//! restoring it later cannot dangle.
//!
//! Topology is only ever mutated through [`HalfEdgeMesh::add_vertex`],
//! [`HalfEdgeMesh::add_face`], [`HalfEdgeMesh::delete_face`] and
//! [`HalfEdgeMesh::delete_vertex`]; compound operations (triangulation,
//! splits, collapses) are compositions of those four, so the half-edge
//! invariants are enforced in one place.

mod construction;
mod modification;
mod topology;
mod types;
mod validation;

use std::collections::HashMap;

pub use types::{
    Face, FaceId, HalfEdge, HalfEdgeId, IdentityError, MeshError, TopologyError, Vertex, VertexId,
};
pub use validation::MeshSignature;

use crate::geom::MirrorPlane;

/// Half-edge mesh with stable ids and an optional mirror plane.
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeMesh {
    pub(crate) vertices: Vec<Option<Vertex>>,
    pub(crate) half_edges: Vec<Option<HalfEdge>>,
    pub(crate) faces: Vec<Option<Face>>,
    /// Reusable vertex ids, released by the action log once unreferenced
    pub(crate) free_vertices: Vec<VertexId>,
    pub(crate) free_half_edges: Vec<HalfEdgeId>,
    pub(crate) free_faces: Vec<FaceId>,
    /// Map from (origin, destination) vertex pair to half-edge
    pub(crate) edge_map: HashMap<(VertexId, VertexId), HalfEdgeId>,
    mirror: Option<MirrorPlane>,
}

impl HalfEdgeMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// The symmetry plane attached to this mesh, if any.
    ///
    /// Consumed by renderers to draw the plane and by tools to reflect brush
    /// parameters; brush displacement pins vertices inside its seam band.
    pub fn mirror_plane(&self) -> Option<&MirrorPlane> {
        self.mirror.as_ref()
    }

    pub fn set_mirror_plane(&mut self, mirror: MirrorPlane) {
        self.mirror = Some(mirror);
    }

    pub fn clear_mirror_plane(&mut self) {
        self.mirror = None;
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use super::fixtures::*;

    #[test]
    fn test_single_triangle_counts() {
        let mesh = single_triangle();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.edge_count(), 3);
        assert!(mesh.is_manifold());
    }

    #[test]
    fn test_bowtie_shares_one_edge() {
        let mesh = bowtie();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        // 5 undirected edges: the shared one plus 4 boundary edges
        assert_eq!(mesh.edge_count(), 5);

        let shared = mesh
            .find_half_edge(VertexId(0), VertexId(1))
            .expect("shared edge exists");
        assert!(!mesh.is_boundary_edge(shared));
    }

    #[test]
    fn test_mirror_plane_roundtrip() {
        use crate::geom::{MirrorPlane, Plane};
        use glam::Vec3;

        let mut mesh = single_triangle();
        assert!(mesh.mirror_plane().is_none());

        mesh.set_mirror_plane(MirrorPlane {
            plane: Plane::new(Vec3::X, 0.0),
            width: 0.01,
        });
        assert!(mesh.mirror_plane().is_some());

        mesh.clear_mirror_plane();
        assert!(mesh.mirror_plane().is_none());
    }
}
