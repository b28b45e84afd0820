//! Geometric (non-topological) modification methods for HalfEdgeMesh.

use glam::Vec3;

use super::types::{IdentityError, VertexId};
use super::HalfEdgeMesh;

impl HalfEdgeMesh {
    /// Pure position mutation; never changes topology. Cached normals are not
    /// refreshed here — call [`HalfEdgeMesh::recalculate_normals`] after a
    /// batch of moves.
    pub fn move_vertex(&mut self, id: VertexId, position: Vec3) -> Result<(), IdentityError> {
        match self.vertices.get_mut(id.0 as usize).and_then(|slot| slot.as_mut()) {
            Some(vertex) => {
                vertex.position = position;
                Ok(())
            }
            None => Err(IdentityError::UnknownVertex(id)),
        }
    }

    /// Recompute cached face normals and vertex normals from current
    /// positions. Vertex normals average the incident face normals; isolated
    /// vertices keep a zero normal.
    pub fn recalculate_normals(&mut self) {
        let mut accumulated: Vec<Vec3> = vec![Vec3::ZERO; self.vertices.len()];
        let live_faces: Vec<_> = self.faces.iter().flatten().map(|face| face.id).collect();

        for id in live_faces {
            let loop_verts = self.face_vertices(id);
            let normal = self.face_loop_normal(&loop_verts);
            if let Some(face) = self.faces[id.0 as usize].as_mut() {
                face.normal = normal;
            }
            for &v in &loop_verts {
                accumulated[v.0 as usize] += normal;
            }
        }

        for vertex in self.vertices.iter_mut().flatten() {
            vertex.normal = accumulated[vertex.id.0 as usize].normalize_or_zero();
        }
    }
}
