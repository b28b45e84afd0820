//! Edge collapse: contract an edge into its origin vertex, removing the
//! destination vertex and the faces sharing the edge.
//!
//! ## Link condition
//!
//! A collapse is rejected unless the vertices adjacent to both endpoints are
//! exactly the vertices opposite the edge (two for an interior edge, one for
//! a boundary edge). Collapsing an edge that fails this test would pinch the
//! surface into a non-manifold vertex. Two further guards reject collapses
//! the vertex-link test cannot see: an interior edge whose endpoints both lie
//! on the boundary (the collapse would merge two boundary loops), and an
//! opposite vertex of interior valence three (the collapse would fold its fan
//! into a two-sided pillow).

use tracing::trace;

use crate::half_edge::{
    FaceId, HalfEdgeId, HalfEdgeMesh, IdentityError, MeshError, TopologyError, VertexId,
};

use super::{Action, RewiredFace};

struct CollapseSite {
    kept: VertexId,
    removed: VertexId,
    /// Faces sharing the edge, with their loops
    edge_faces: Vec<(FaceId, Vec<VertexId>)>,
}

fn collapse_site(mesh: &HalfEdgeMesh, edge: HalfEdgeId) -> Result<CollapseSite, MeshError> {
    let he = mesh
        .half_edge(edge)
        .ok_or(IdentityError::UnknownHalfEdge(edge))?;
    let kept = he.origin;
    let removed = mesh
        .half_edge_dest(edge)
        .ok_or_else(|| TopologyError::Corrupt(format!("{edge:?} has no destination")))?;
    let interior = he.twin.is_some();

    let mut edge_faces = Vec::with_capacity(2);
    let mut opposites = Vec::with_capacity(2);
    let mut push_face = |face: FaceId| -> Result<(), MeshError> {
        let loop_verts = mesh.face_vertices(face);
        if loop_verts.len() != 3 {
            return Err(TopologyError::NotATriangle(face).into());
        }
        for &v in &loop_verts {
            if v != kept && v != removed {
                opposites.push(v);
            }
        }
        edge_faces.push((face, loop_verts));
        Ok(())
    };
    push_face(he.face)?;
    if let Some(twin) = he.twin {
        let twin_he = mesh
            .half_edge(twin)
            .ok_or(IdentityError::UnknownHalfEdge(twin))?;
        push_face(twin_he.face)?;
    }

    let reject = || TopologyError::NonManifoldCollapse {
        from: kept,
        to: removed,
    };

    // Vertex-link condition: the common neighbors must be exactly the
    // opposite vertices
    let kept_ring = mesh.neighbors(kept)?;
    let removed_ring = mesh.neighbors(removed)?;
    let common: Vec<VertexId> = kept_ring
        .iter()
        .copied()
        .filter(|v| removed_ring.contains(v) && *v != kept && *v != removed)
        .collect();
    if common.len() != opposites.len() || !opposites.iter().all(|v| common.contains(v)) {
        return Err(reject().into());
    }

    // An interior edge between two boundary vertices joins two boundary
    // loops at a single point
    if interior && mesh.is_boundary_vertex(kept) && mesh.is_boundary_vertex(removed) {
        return Err(reject().into());
    }

    // Interior opposite vertices of valence three would be left with a
    // two-faced fan
    for &opposite in &opposites {
        if !mesh.is_boundary_vertex(opposite) && mesh.neighbors(opposite)?.len() <= 3 {
            return Err(reject().into());
        }
    }

    Ok(CollapseSite {
        kept,
        removed,
        edge_faces,
    })
}

/// Whether collapsing this edge preserves the manifold invariant.
pub fn can_collapse_edge(mesh: &HalfEdgeMesh, edge: HalfEdgeId) -> Result<(), MeshError> {
    collapse_site(mesh, edge).map(|_| ())
}

/// Collapse an edge, merging its destination vertex into its origin. The
/// surviving vertex moves to the edge midpoint.
pub fn collapse_edge(mesh: &mut HalfEdgeMesh, edge: HalfEdgeId) -> Result<Action, MeshError> {
    let site = collapse_site(mesh, edge)?;
    let (kept, removed) = (site.kept, site.removed);

    let kept_from = mesh
        .vertex(kept)
        .ok_or(IdentityError::UnknownVertex(kept))?
        .position;
    let removed_position = mesh
        .vertex(removed)
        .ok_or(IdentityError::UnknownVertex(removed))?
        .position;
    let kept_to = (kept_from + removed_position) * 0.5;

    // The ring faces to rewire, gathered while the fan is still whole;
    // sorted by id so the rewiring order is reproducible
    let mut ring: Vec<FaceId> = mesh
        .vertex_faces(removed)?
        .into_iter()
        .filter(|f| !site.edge_faces.iter().any(|&(ef, _)| ef == *f))
        .collect();
    ring.sort();

    let mut deleted_faces = Vec::with_capacity(2);
    for (face, loop_verts) in &site.edge_faces {
        mesh.delete_face(*face)?;
        deleted_faces.push((*face, loop_verts.clone()));
    }

    let mut rewired = Vec::with_capacity(ring.len());
    for face in ring {
        let old_vertices = mesh.face_vertices(face);
        let new_vertices: Vec<VertexId> = old_vertices
            .iter()
            .map(|&v| if v == removed { kept } else { v })
            .collect();
        mesh.delete_face(face)?;
        let new_face = mesh.add_face(&new_vertices)?;
        rewired.push(RewiredFace {
            old_face: face,
            old_vertices,
            new_face,
            new_vertices,
        });
    }

    mesh.move_vertex(kept, kept_to)?;
    mesh.delete_vertex(removed)?;

    trace!(
        "collapse_edge: {:?} ({:?} <- {:?}), {} faces removed, {} rewired",
        edge,
        kept,
        removed,
        deleted_faces.len(),
        rewired.len()
    );

    Ok(Action::CollapseEdge {
        kept,
        kept_from,
        kept_to,
        removed,
        removed_position,
        deleted_faces,
        rewired,
    })
}
