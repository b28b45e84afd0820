//! Quad triangulation with a deterministic diagonal policy.
//!
//! The diagonal connecting the two vertices that yields the better
//! conditioned triangle pair wins (smaller maximum aspect ratio); ties break
//! to the diagonal containing the lower vertex id. The policy depends only on
//! geometry and ids, never on traversal order, so repeated runs pick the same
//! diagonal.

use glam::Vec3;
use tracing::trace;

use crate::half_edge::{FaceId, HalfEdgeMesh, IdentityError, MeshError, TopologyError, VertexId};

use super::Action;

/// Aspect ratio of a triangle: the longest edge over its corresponding
/// height. 2/sqrt(3) for equilateral, infinity for degenerate.
pub fn triangle_aspect_ratio(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    let lab = (b - a).length();
    let lbc = (c - b).length();
    let lca = (a - c).length();
    let longest = lab.max(lbc).max(lca);

    let doubled_area = (b - a).cross(c - a).length();
    if doubled_area <= f32::EPSILON {
        return f32::INFINITY;
    }
    longest * longest / doubled_area
}

/// The triangle pair a quad loop splits into along `diagonal`.
pub(crate) fn diagonal_triangles(
    quad: &[VertexId; 4],
    diagonal: (VertexId, VertexId),
) -> ([VertexId; 3], [VertexId; 3]) {
    if diagonal == (quad[0], quad[2]) {
        ([quad[0], quad[1], quad[2]], [quad[0], quad[2], quad[3]])
    } else {
        ([quad[0], quad[1], quad[3]], [quad[1], quad[2], quad[3]])
    }
}

/// Pick the triangulation diagonal for a quad loop.
///
/// A diagonal whose directed edge already belongs to some other face is
/// skipped (both new triangles need one direction of it each); if both
/// diagonals are blocked the quad cannot be triangulated in place.
pub fn choose_diagonal(
    mesh: &HalfEdgeMesh,
    quad: &[VertexId; 4],
) -> Result<(VertexId, VertexId), MeshError> {
    let position = |id: VertexId| -> Result<Vec3, MeshError> {
        Ok(mesh
            .vertex(id)
            .ok_or(IdentityError::UnknownVertex(id))?
            .position)
    };
    let [a, b, c, d] = *quad;
    let (pa, pb, pc, pd) = (position(a)?, position(b)?, position(c)?, position(d)?);

    let worst_02 = triangle_aspect_ratio(pa, pb, pc).max(triangle_aspect_ratio(pa, pc, pd));
    let worst_13 = triangle_aspect_ratio(pa, pb, pd).max(triangle_aspect_ratio(pb, pc, pd));

    let blocked = |from: VertexId, to: VertexId| {
        mesh.find_half_edge(from, to).is_some() || mesh.find_half_edge(to, from).is_some()
    };
    let blocked_02 = blocked(a, c);
    let blocked_13 = blocked(b, d);

    let pick_02 = match (blocked_02, blocked_13) {
        (true, true) => {
            return Err(TopologyError::EdgeAlreadyClaimed {
                from: a,
                to: c,
                face: FaceId(u32::MAX),
            }
            .into());
        }
        (true, false) => false,
        (false, true) => true,
        (false, false) => {
            if worst_02 < worst_13 {
                true
            } else if worst_13 < worst_02 {
                false
            } else {
                // Tie: lower vertex id wins
                a.min(c) <= b.min(d)
            }
        }
    };

    Ok(if pick_02 { (a, c) } else { (b, d) })
}

/// Replace a quad face with two triangles sharing the chosen diagonal.
pub fn triangulate_quad(mesh: &mut HalfEdgeMesh, face: FaceId) -> Result<Action, MeshError> {
    let loop_verts = mesh.face_vertices(face);
    if loop_verts.is_empty() {
        return Err(IdentityError::UnknownFace(face).into());
    }
    if loop_verts.len() != 4 {
        return Err(TopologyError::NotAQuad(face).into());
    }
    let quad: [VertexId; 4] = [loop_verts[0], loop_verts[1], loop_verts[2], loop_verts[3]];

    let diagonal = choose_diagonal(mesh, &quad)?;
    let (t0, t1) = diagonal_triangles(&quad, diagonal);

    mesh.delete_face(face)?;
    let f0 = mesh.add_face(&t0)?;
    let f1 = mesh.add_face(&t1)?;

    trace!(
        "triangulate_quad: {:?} -> {:?}/{:?} along {:?}",
        face, f0, f1, diagonal
    );

    Ok(Action::TriangulateQuad {
        quad: face,
        vertices: quad,
        diagonal,
        triangles: [f0, f1],
    })
}
