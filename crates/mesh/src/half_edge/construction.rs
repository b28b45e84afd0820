//! Construction methods for HalfEdgeMesh: vertex/face insertion, id
//! allocation and the id-exact restore operations used by undo/redo.

use glam::Vec3;
use tracing::trace;

use super::types::{Face, FaceId, HalfEdge, HalfEdgeId, IdentityError, MeshError, TopologyError, Vertex, VertexId};
use super::HalfEdgeMesh;

impl HalfEdgeMesh {
    /// Build a mesh from raw positions and face loops (indices into
    /// `positions`). Faces must be triangles or quads with counter-clockwise
    /// winding; shared edges are wired automatically.
    pub fn from_faces(positions: &[Vec3], faces: &[Vec<u32>]) -> Result<Self, MeshError> {
        let mut mesh = Self::new();
        let ids: Vec<VertexId> = positions.iter().map(|&p| mesh.add_vertex(p)).collect();

        for face in faces {
            let loop_verts: Vec<VertexId> = face
                .iter()
                .map(|&i| {
                    ids.get(i as usize)
                        .copied()
                        .ok_or(IdentityError::UnknownVertex(VertexId(i)))
                })
                .collect::<Result<_, _>>()?;
            mesh.add_face(&loop_verts)?;
        }

        mesh.recalculate_normals();
        Ok(mesh)
    }

    /// Insert an isolated vertex; O(1).
    pub fn add_vertex(&mut self, position: Vec3) -> VertexId {
        let id = self.alloc_vertex_id();
        self.vertices[id.0 as usize] = Some(Vertex {
            id,
            position,
            normal: Vec3::ZERO,
            outgoing: None,
        });
        id
    }

    /// Construct the half-edge cycle for a new triangle or quad, wiring twins
    /// to any existing adjacent face that shares an edge with opposite
    /// winding.
    ///
    /// Fails with [`TopologyError::EdgeAlreadyClaimed`] if a directed edge of
    /// the loop already belongs to a face (the undirected edge would gain a
    /// third incident face, or a second face with the same winding), and with
    /// [`TopologyError::FaceArity`] for loops that are not 3 or 4 vertices.
    /// All checks run before the first mutation; on error the mesh is
    /// unchanged.
    pub fn add_face(&mut self, loop_verts: &[VertexId]) -> Result<FaceId, MeshError> {
        self.validate_face_loop(loop_verts)?;
        let id = self.alloc_face_id();
        self.wire_face(id, loop_verts);
        trace!("add_face: {:?} <- {:?}", id, loop_verts);
        Ok(id)
    }

    /// Remove a face and unwire its half-edges.
    ///
    /// Half-edge ids return to the reuse pool immediately (nothing outside
    /// the store refers to them); the face id stays retired until
    /// [`HalfEdgeMesh::release_face_id`] — the action log holds deleted ids
    /// until no entry references them.
    pub fn delete_face(&mut self, id: FaceId) -> Result<(), MeshError> {
        let face = self.face(id).ok_or(IdentityError::UnknownFace(id))?;
        let start = face.half_edge;

        // Gather the cycle before touching anything
        let mut cycle: Vec<HalfEdgeId> = Vec::with_capacity(4);
        let mut current = start;
        loop {
            let he = self
                .half_edge(current)
                .ok_or_else(|| TopologyError::Corrupt(format!("face {id:?} cycle broken")))?;
            cycle.push(current);
            current = he.next;
            if current == start {
                break;
            }
            if cycle.len() > 4 {
                return Err(TopologyError::Corrupt(format!("face {id:?} cycle too long")).into());
            }
        }

        let n = cycle.len();
        let origins: Vec<VertexId> = cycle
            .iter()
            .map(|&he_id| self.half_edges[he_id.0 as usize].as_ref().map(|he| he.origin))
            .collect::<Option<_>>()
            .ok_or_else(|| TopologyError::Corrupt(format!("face {id:?} cycle broken")))?;
        let twins: Vec<Option<HalfEdgeId>> = cycle
            .iter()
            .map(|&he_id| self.half_edges[he_id.0 as usize].as_ref().and_then(|he| he.twin))
            .collect();

        // Unwire: drop edge-map entries and detach twins
        for i in 0..n {
            let from = origins[i];
            let to = origins[(i + 1) % n];
            self.edge_map.remove(&(from, to));
            if let Some(twin_id) = twins[i] {
                if let Some(twin) = self.half_edges[twin_id.0 as usize].as_mut() {
                    twin.twin = None;
                }
            }
        }

        // Free half-edges in reverse cycle order so a later add_face
        // re-allocates them in cycle order again
        for &he_id in cycle.iter().rev() {
            self.half_edges[he_id.0 as usize] = None;
            self.free_half_edges.push(he_id);
        }

        self.faces[id.0 as usize] = None;

        // Repair outgoing pointers that referenced a freed half-edge
        for i in 0..n {
            let v = origins[i];
            let outgoing = self.vertices[v.0 as usize].as_ref().and_then(|vx| vx.outgoing);
            if outgoing != Some(cycle[i]) {
                continue;
            }
            // Twin of the incoming half-edge originates at v, if it survives
            let incoming_twin = twins[(i + n - 1) % n];
            let replacement = match incoming_twin {
                Some(t)
                    if self.half_edges[t.0 as usize]
                        .as_ref()
                        .is_some_and(|he| he.origin == v) =>
                {
                    Some(t)
                }
                _ => self
                    .half_edges
                    .iter()
                    .flatten()
                    .find(|he| he.origin == v)
                    .map(|he| he.id),
            };
            if let Some(vx) = self.vertices[v.0 as usize].as_mut() {
                vx.outgoing = replacement;
            }
        }

        trace!("delete_face: {:?} ({} half-edges freed)", id, n);
        Ok(())
    }

    /// Remove an isolated vertex. Fails with [`TopologyError::VertexInUse`]
    /// if the vertex still has incident faces (delete those first). The id
    /// stays retired until [`HalfEdgeMesh::release_vertex_id`].
    pub fn delete_vertex(&mut self, id: VertexId) -> Result<(), MeshError> {
        let vertex = self.vertex(id).ok_or(IdentityError::UnknownVertex(id))?;
        if vertex.outgoing.is_some() {
            return Err(TopologyError::VertexInUse(id).into());
        }
        self.vertices[id.0 as usize] = None;
        trace!("delete_vertex: {:?}", id);
        Ok(())
    }

    // ========================================================================
    // Id-exact restoration (undo/redo support)
    // ========================================================================

    /// Re-insert a vertex under a specific id. Used by the action log to make
    /// undo/redo reconstruct identical ids; fails if the id is live.
    pub(crate) fn restore_vertex(&mut self, id: VertexId, position: Vec3) -> Result<(), MeshError> {
        self.claim_vertex_id(id)?;
        self.vertices[id.0 as usize] = Some(Vertex {
            id,
            position,
            normal: Vec3::ZERO,
            outgoing: None,
        });
        Ok(())
    }

    /// Re-insert a face under a specific id; same contract as
    /// [`HalfEdgeMesh::add_face`] otherwise.
    pub(crate) fn restore_face(
        &mut self,
        id: FaceId,
        loop_verts: &[VertexId],
    ) -> Result<(), MeshError> {
        self.validate_face_loop(loop_verts)?;
        self.claim_face_id(id)?;
        self.wire_face(id, loop_verts);
        trace!("restore_face: {:?} <- {:?}", id, loop_verts);
        Ok(())
    }

    /// Return a retired vertex id to the reuse pool.
    pub fn release_vertex_id(&mut self, id: VertexId) {
        let idx = id.0 as usize;
        if idx >= self.vertices.len() || self.vertices[idx].is_some() {
            tracing::warn!("release_vertex_id: {:?} is live, not releasing", id);
            return;
        }
        if !self.free_vertices.contains(&id) {
            self.free_vertices.push(id);
        }
    }

    /// Return a retired face id to the reuse pool.
    pub fn release_face_id(&mut self, id: FaceId) {
        let idx = id.0 as usize;
        if idx >= self.faces.len() || self.faces[idx].is_some() {
            tracing::warn!("release_face_id: {:?} is live, not releasing", id);
            return;
        }
        if !self.free_faces.contains(&id) {
            self.free_faces.push(id);
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn alloc_vertex_id(&mut self) -> VertexId {
        if let Some(id) = self.free_vertices.pop() {
            id
        } else {
            let id = VertexId(self.vertices.len() as u32);
            self.vertices.push(None);
            id
        }
    }

    fn alloc_half_edge_id(&mut self) -> HalfEdgeId {
        if let Some(id) = self.free_half_edges.pop() {
            id
        } else {
            let id = HalfEdgeId(self.half_edges.len() as u32);
            self.half_edges.push(None);
            id
        }
    }

    fn alloc_face_id(&mut self) -> FaceId {
        if let Some(id) = self.free_faces.pop() {
            id
        } else {
            let id = FaceId(self.faces.len() as u32);
            self.faces.push(None);
            id
        }
    }

    fn claim_vertex_id(&mut self, id: VertexId) -> Result<(), MeshError> {
        let idx = id.0 as usize;
        while self.vertices.len() <= idx {
            self.vertices.push(None);
        }
        if self.vertices[idx].is_some() {
            return Err(
                TopologyError::Corrupt(format!("vertex id {id:?} reused while referenced")).into(),
            );
        }
        if let Some(pos) = self.free_vertices.iter().position(|&f| f == id) {
            self.free_vertices.swap_remove(pos);
        }
        Ok(())
    }

    fn claim_face_id(&mut self, id: FaceId) -> Result<(), MeshError> {
        let idx = id.0 as usize;
        while self.faces.len() <= idx {
            self.faces.push(None);
        }
        if self.faces[idx].is_some() {
            return Err(
                TopologyError::Corrupt(format!("face id {id:?} reused while referenced")).into(),
            );
        }
        if let Some(pos) = self.free_faces.iter().position(|&f| f == id) {
            self.free_faces.swap_remove(pos);
        }
        Ok(())
    }

    /// All-or-nothing checks for a face loop; runs before any mutation.
    fn validate_face_loop(&self, loop_verts: &[VertexId]) -> Result<(), MeshError> {
        let n = loop_verts.len();
        if !(3..=4).contains(&n) {
            return Err(TopologyError::FaceArity(n).into());
        }
        for (i, &v) in loop_verts.iter().enumerate() {
            if self.vertex(v).is_none() {
                return Err(IdentityError::UnknownVertex(v).into());
            }
            if loop_verts[..i].contains(&v) {
                return Err(TopologyError::DegenerateFace(v).into());
            }
        }
        for i in 0..n {
            let from = loop_verts[i];
            let to = loop_verts[(i + 1) % n];
            if let Some(&he_id) = self.edge_map.get(&(from, to)) {
                let face = self.half_edges[he_id.0 as usize]
                    .as_ref()
                    .map(|he| he.face)
                    .unwrap_or(FaceId(u32::MAX));
                return Err(TopologyError::EdgeAlreadyClaimed { from, to, face }.into());
            }
        }
        Ok(())
    }

    /// Build the half-edge cycle for a validated loop under `face_id`.
    fn wire_face(&mut self, face_id: FaceId, loop_verts: &[VertexId]) {
        let n = loop_verts.len();
        let he_ids: Vec<HalfEdgeId> = (0..n).map(|_| self.alloc_half_edge_id()).collect();

        for i in 0..n {
            let from = loop_verts[i];
            let to = loop_verts[(i + 1) % n];
            let twin = self.edge_map.get(&(to, from)).copied();

            self.half_edges[he_ids[i].0 as usize] = Some(HalfEdge {
                id: he_ids[i],
                origin: from,
                twin,
                next: he_ids[(i + 1) % n],
                prev: he_ids[(i + n - 1) % n],
                face: face_id,
            });

            if let Some(twin_id) = twin {
                if let Some(twin_he) = self.half_edges[twin_id.0 as usize].as_mut() {
                    twin_he.twin = Some(he_ids[i]);
                }
            }

            self.edge_map.insert((from, to), he_ids[i]);

            if let Some(vertex) = self.vertices[from.0 as usize].as_mut() {
                if vertex.outgoing.is_none() {
                    vertex.outgoing = Some(he_ids[i]);
                }
            }
        }

        let normal = self.face_loop_normal(loop_verts);
        self.faces[face_id.0 as usize] = Some(Face {
            id: face_id,
            half_edge: he_ids[0],
            normal,
        });
    }

    /// Newell's method; robust for non-planar quads.
    pub(crate) fn face_loop_normal(&self, loop_verts: &[VertexId]) -> Vec3 {
        let mut normal = Vec3::ZERO;
        let n = loop_verts.len();
        for i in 0..n {
            let Some(a) = self.vertex(loop_verts[i]) else {
                return Vec3::ZERO;
            };
            let Some(b) = self.vertex(loop_verts[(i + 1) % n]) else {
                return Vec3::ZERO;
            };
            let (pa, pb) = (a.position, b.position);
            normal.x += (pa.y - pb.y) * (pa.z + pb.z);
            normal.y += (pa.z - pb.z) * (pa.x + pb.x);
            normal.z += (pa.x - pb.x) * (pa.y + pb.y);
        }
        normal.normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::half_edge::fixtures::*;

    #[test]
    fn test_add_face_rejects_bad_arity() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);

        let err = mesh.add_face(&[a, b]).unwrap_err();
        assert_eq!(err, MeshError::Topology(TopologyError::FaceArity(2)));

        let c = mesh.add_vertex(Vec3::Y);
        let d = mesh.add_vertex(Vec3::Z);
        let e = mesh.add_vertex(Vec3::ONE);
        let err = mesh.add_face(&[a, b, c, d, e]).unwrap_err();
        assert_eq!(err, MeshError::Topology(TopologyError::FaceArity(5)));
    }

    #[test]
    fn test_add_face_rejects_unknown_vertex() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);

        let err = mesh.add_face(&[a, b, VertexId(99)]).unwrap_err();
        assert_eq!(
            err,
            MeshError::Identity(IdentityError::UnknownVertex(VertexId(99)))
        );
    }

    #[test]
    fn test_add_face_rejects_repeated_vertex() {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Vec3::ZERO);
        let b = mesh.add_vertex(Vec3::X);

        let err = mesh.add_face(&[a, b, a]).unwrap_err();
        assert_eq!(err, MeshError::Topology(TopologyError::DegenerateFace(a)));
    }

    #[test]
    fn test_add_face_rejects_same_winding_neighbor() {
        let mut mesh = single_triangle();
        // A second face reusing the directed edge v0 -> v1 would give the
        // undirected edge two faces on the same side
        let d = mesh.add_vertex(Vec3::new(0.5, -1.0, 0.0));
        let err = mesh.add_face(&[VertexId(0), VertexId(1), d]).unwrap_err();
        assert!(matches!(
            err,
            MeshError::Topology(TopologyError::EdgeAlreadyClaimed { .. })
        ));
        // Opposite winding is fine
        assert!(mesh.add_face(&[VertexId(1), VertexId(0), d]).is_ok());
    }

    #[test]
    fn test_add_face_rejects_third_face_on_edge() {
        let mut mesh = bowtie();
        // Edge v0 <-> v1 already has two faces; both windings are taken
        let e = mesh.add_vertex(Vec3::new(0.0, 0.0, 1.0));
        assert!(mesh.add_face(&[VertexId(0), VertexId(1), e]).is_err());
        assert!(mesh.add_face(&[VertexId(1), VertexId(0), e]).is_err());
        assert!(mesh.is_manifold());
    }

    #[test]
    fn test_add_face_wires_twins() {
        let mesh = bowtie();
        let he = mesh.find_half_edge(VertexId(0), VertexId(1)).unwrap();
        let twin = mesh.find_half_edge(VertexId(1), VertexId(0)).unwrap();

        assert_eq!(mesh.half_edge(he).unwrap().twin, Some(twin));
        assert_eq!(mesh.half_edge(twin).unwrap().twin, Some(he));
    }

    #[test]
    fn test_delete_face_unwires_shared_edge() {
        let mut mesh = bowtie();
        let he = mesh.find_half_edge(VertexId(0), VertexId(1)).unwrap();
        let face = mesh.half_edge(he).unwrap().face;

        mesh.delete_face(face).unwrap();

        assert_eq!(mesh.face_count(), 1);
        let remaining = mesh.find_half_edge(VertexId(1), VertexId(0)).unwrap();
        assert!(mesh.is_boundary_edge(remaining));
        assert!(mesh.is_manifold());
    }

    #[test]
    fn test_delete_vertex_requires_no_faces() {
        let mut mesh = single_triangle();
        let err = mesh.delete_vertex(VertexId(0)).unwrap_err();
        assert_eq!(err, MeshError::Topology(TopologyError::VertexInUse(VertexId(0))));

        mesh.delete_face(FaceId(0)).unwrap();
        assert!(mesh.delete_vertex(VertexId(0)).is_ok());
        assert_eq!(mesh.vertex_count(), 2);
    }

    #[test]
    fn test_delete_face_repairs_outgoing() {
        let mut mesh = bowtie();
        let he = mesh.find_half_edge(VertexId(0), VertexId(1)).unwrap();
        let face = mesh.half_edge(he).unwrap().face;
        mesh.delete_face(face).unwrap();

        // Every vertex with remaining faces has a live outgoing half-edge
        for vertex in mesh.vertices() {
            if let Some(out) = vertex.outgoing {
                let he = mesh.half_edge(out).expect("outgoing half-edge is live");
                assert_eq!(he.origin, vertex.id);
            }
        }
    }

    #[test]
    fn test_restore_face_reuses_exact_id() {
        let mut mesh = single_quad();
        let loop_verts = mesh.face_vertices(FaceId(0));
        mesh.delete_face(FaceId(0)).unwrap();
        assert_eq!(mesh.face_count(), 0);

        mesh.restore_face(FaceId(0), &loop_verts).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.face_vertices(FaceId(0)), loop_verts);
    }

    #[test]
    fn test_released_ids_are_reused() {
        let mut mesh = single_triangle();
        mesh.delete_face(FaceId(0)).unwrap();
        mesh.delete_vertex(VertexId(2)).unwrap();

        // Retired ids are not handed out again...
        let fresh = mesh.add_vertex(Vec3::Z);
        assert_eq!(fresh, VertexId(3));

        // ...until released
        mesh.release_vertex_id(VertexId(2));
        let reused = mesh.add_vertex(Vec3::Y);
        assert_eq!(reused, VertexId(2));
    }

    #[test]
    fn test_from_faces_builds_grid() {
        let mesh = triangle_grid(4);
        assert_eq!(mesh.vertex_count(), 16);
        assert_eq!(mesh.face_count(), 18);
        assert!(mesh.is_manifold());

        // Interior normals point up
        for vertex in mesh.vertices() {
            assert!(vertex.normal.y > 0.9);
        }
    }
}
