//! Topological actions: small, composable operations that mutate the mesh
//! store and record enough information to be undone and redone exactly.
//!
//! Each forward constructor performs the mutation and returns a fully
//! recorded [`Action`]; [`Action::undo`] and [`Action::redo`] replay the
//! inverse and forward effects by exhaustive match. Undo and redo restore
//! elements under their recorded ids, so ids captured before an action stay
//! valid afterwards unless that specific element was deleted.

mod collapse_edge;
mod split_edge;
mod triangulate_quad;

pub use collapse_edge::{can_collapse_edge, collapse_edge};
pub use split_edge::{can_split_edge, split_edge};
pub use triangulate_quad::{choose_diagonal, triangle_aspect_ratio, triangulate_quad};

use glam::Vec3;

use crate::half_edge::{FaceId, HalfEdgeMesh, IdentityError, MeshError, VertexId};

use triangulate_quad::diagonal_triangles;

/// A ring face of a collapsed vertex: deleted under its old loop and re-added
/// with the surviving vertex substituted in.
#[derive(Debug, Clone, PartialEq)]
pub struct RewiredFace {
    pub old_face: FaceId,
    pub old_vertices: Vec<VertexId>,
    pub new_face: FaceId,
    pub new_vertices: Vec<VertexId>,
}

/// One invertible topological operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    AddVertex {
        vertex: VertexId,
        position: Vec3,
    },
    DeleteVertex {
        vertex: VertexId,
        position: Vec3,
    },
    AddFace {
        face: FaceId,
        vertices: Vec<VertexId>,
    },
    DeleteFace {
        face: FaceId,
        vertices: Vec<VertexId>,
    },
    MoveVertex {
        vertex: VertexId,
        from: Vec3,
        to: Vec3,
    },
    /// A quad replaced by two triangles sharing the recorded diagonal.
    /// The quad loop is stored in its original vertex order so undo restores
    /// it exactly.
    TriangulateQuad {
        quad: FaceId,
        vertices: [VertexId; 4],
        diagonal: (VertexId, VertexId),
        triangles: [FaceId; 2],
    },
    /// A new vertex inserted along an edge, re-triangulating each incident
    /// face into two.
    SplitEdge {
        vertex: VertexId,
        position: Vec3,
        replaced: Vec<(FaceId, [VertexId; 3])>,
        created: Vec<(FaceId, [VertexId; 3])>,
    },
    /// An edge contracted into its surviving endpoint.
    CollapseEdge {
        kept: VertexId,
        kept_from: Vec3,
        kept_to: Vec3,
        removed: VertexId,
        removed_position: Vec3,
        deleted_faces: Vec<(FaceId, Vec<VertexId>)>,
        rewired: Vec<RewiredFace>,
    },
}

// ============================================================================
// Primitive action constructors
// ============================================================================

/// Insert an isolated vertex, recording the action.
pub fn add_vertex(mesh: &mut HalfEdgeMesh, position: Vec3) -> Action {
    let vertex = mesh.add_vertex(position);
    Action::AddVertex { vertex, position }
}

/// Delete an isolated vertex, recording the action.
pub fn delete_vertex(mesh: &mut HalfEdgeMesh, id: VertexId) -> Result<Action, MeshError> {
    let position = mesh
        .vertex(id)
        .ok_or(IdentityError::UnknownVertex(id))?
        .position;
    mesh.delete_vertex(id)?;
    Ok(Action::DeleteVertex {
        vertex: id,
        position,
    })
}

/// Add a face, recording the action.
pub fn add_face(mesh: &mut HalfEdgeMesh, loop_verts: &[VertexId]) -> Result<Action, MeshError> {
    let face = mesh.add_face(loop_verts)?;
    Ok(Action::AddFace {
        face,
        vertices: loop_verts.to_vec(),
    })
}

/// Delete a face, recording its loop for undo.
pub fn delete_face(mesh: &mut HalfEdgeMesh, id: FaceId) -> Result<Action, MeshError> {
    let vertices = mesh.face_vertices(id);
    if vertices.is_empty() {
        return Err(IdentityError::UnknownFace(id).into());
    }
    mesh.delete_face(id)?;
    Ok(Action::DeleteFace { face: id, vertices })
}

/// Move a vertex, recording the previous position.
pub fn move_vertex(mesh: &mut HalfEdgeMesh, id: VertexId, to: Vec3) -> Result<Action, MeshError> {
    let from = mesh
        .vertex(id)
        .ok_or(IdentityError::UnknownVertex(id))?
        .position;
    mesh.move_vertex(id, to)?;
    Ok(Action::MoveVertex {
        vertex: id,
        from,
        to,
    })
}

// ============================================================================
// Undo / redo
// ============================================================================

impl Action {
    /// Apply the inverse effect. The mesh must be in the state this action
    /// left it in (the action log guarantees strict reverse order).
    pub fn undo(&self, mesh: &mut HalfEdgeMesh) -> Result<(), MeshError> {
        match self {
            Action::AddVertex { vertex, .. } => mesh.delete_vertex(*vertex),
            Action::DeleteVertex { vertex, position } => mesh.restore_vertex(*vertex, *position),
            Action::AddFace { face, .. } => mesh.delete_face(*face),
            Action::DeleteFace { face, vertices } => mesh.restore_face(*face, vertices),
            Action::MoveVertex { vertex, from, .. } => {
                mesh.move_vertex(*vertex, *from).map_err(MeshError::from)
            }
            Action::TriangulateQuad {
                quad,
                vertices,
                triangles,
                ..
            } => {
                mesh.delete_face(triangles[1])?;
                mesh.delete_face(triangles[0])?;
                mesh.restore_face(*quad, vertices)
            }
            Action::SplitEdge {
                vertex,
                replaced,
                created,
                ..
            } => {
                for (face, _) in created.iter().rev() {
                    mesh.delete_face(*face)?;
                }
                mesh.delete_vertex(*vertex)?;
                for (face, loop_verts) in replaced.iter().rev() {
                    mesh.restore_face(*face, loop_verts)?;
                }
                Ok(())
            }
            Action::CollapseEdge {
                kept,
                kept_from,
                removed,
                removed_position,
                deleted_faces,
                rewired,
                ..
            } => {
                mesh.restore_vertex(*removed, *removed_position)?;
                mesh.move_vertex(*kept, *kept_from)?;
                for rewire in rewired.iter().rev() {
                    mesh.delete_face(rewire.new_face)?;
                    mesh.restore_face(rewire.old_face, &rewire.old_vertices)?;
                }
                for (face, loop_verts) in deleted_faces.iter().rev() {
                    mesh.restore_face(*face, loop_verts)?;
                }
                Ok(())
            }
        }
    }

    /// Re-apply the forward effect after an undo, reconstructing the same ids.
    pub fn redo(&self, mesh: &mut HalfEdgeMesh) -> Result<(), MeshError> {
        match self {
            Action::AddVertex { vertex, position } => mesh.restore_vertex(*vertex, *position),
            Action::DeleteVertex { vertex, .. } => mesh.delete_vertex(*vertex),
            Action::AddFace { face, vertices } => mesh.restore_face(*face, vertices),
            Action::DeleteFace { face, .. } => mesh.delete_face(*face),
            Action::MoveVertex { vertex, to, .. } => {
                mesh.move_vertex(*vertex, *to).map_err(MeshError::from)
            }
            Action::TriangulateQuad {
                quad,
                vertices,
                diagonal,
                triangles,
            } => {
                let (t0, t1) = diagonal_triangles(vertices, *diagonal);
                mesh.delete_face(*quad)?;
                mesh.restore_face(triangles[0], &t0)?;
                mesh.restore_face(triangles[1], &t1)
            }
            Action::SplitEdge {
                vertex,
                position,
                replaced,
                created,
            } => {
                for (face, _) in replaced {
                    mesh.delete_face(*face)?;
                }
                mesh.restore_vertex(*vertex, *position)?;
                for (face, loop_verts) in created {
                    mesh.restore_face(*face, loop_verts)?;
                }
                Ok(())
            }
            Action::CollapseEdge {
                kept,
                kept_to,
                removed,
                deleted_faces,
                rewired,
                ..
            } => {
                for (face, _) in deleted_faces {
                    mesh.delete_face(*face)?;
                }
                for rewire in rewired {
                    mesh.delete_face(rewire.old_face)?;
                    mesh.restore_face(rewire.new_face, &rewire.new_vertices)?;
                }
                mesh.move_vertex(*kept, *kept_to)?;
                mesh.delete_vertex(*removed)
            }
        }
    }

    /// Ids this action created; released to the reuse pools when the entry is
    /// discarded from the *undone* side of the log (redo-suffix truncation).
    pub fn created_ids(&self) -> (Vec<VertexId>, Vec<FaceId>) {
        match self {
            Action::AddVertex { vertex, .. } => (vec![*vertex], Vec::new()),
            Action::AddFace { face, .. } => (Vec::new(), vec![*face]),
            Action::TriangulateQuad { triangles, .. } => (Vec::new(), triangles.to_vec()),
            Action::SplitEdge {
                vertex, created, ..
            } => (
                vec![*vertex],
                created.iter().map(|&(face, _)| face).collect(),
            ),
            Action::CollapseEdge { rewired, .. } => (
                Vec::new(),
                rewired.iter().map(|r| r.new_face).collect(),
            ),
            Action::DeleteVertex { .. }
            | Action::DeleteFace { .. }
            | Action::MoveVertex { .. } => (Vec::new(), Vec::new()),
        }
    }

    /// Ids this action deleted; released when the entry is discarded from the
    /// *applied* side of the log (`drop_last`, or clearing the history).
    pub fn deleted_ids(&self) -> (Vec<VertexId>, Vec<FaceId>) {
        match self {
            Action::DeleteVertex { vertex, .. } => (vec![*vertex], Vec::new()),
            Action::DeleteFace { face, .. } => (Vec::new(), vec![*face]),
            Action::TriangulateQuad { quad, .. } => (Vec::new(), vec![*quad]),
            Action::SplitEdge { replaced, .. } => (
                Vec::new(),
                replaced.iter().map(|&(face, _)| face).collect(),
            ),
            Action::CollapseEdge {
                removed,
                deleted_faces,
                rewired,
                ..
            } => (
                vec![*removed],
                deleted_faces
                    .iter()
                    .map(|&(face, _)| face)
                    .chain(rewired.iter().map(|r| r.old_face))
                    .collect(),
            ),
            Action::AddVertex { .. } | Action::AddFace { .. } | Action::MoveVertex { .. } => {
                (Vec::new(), Vec::new())
            }
        }
    }
}
