//! Topology query methods for HalfEdgeMesh.

use std::collections::HashSet;

use crate::geom::Aabb;

use super::types::{Face, FaceId, HalfEdge, HalfEdgeId, IdentityError, Vertex, VertexId};
use super::HalfEdgeMesh;

impl HalfEdgeMesh {
    // ========================================================================
    // Accessors
    // ========================================================================

    /// Get vertex by ID
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.0 as usize)?.as_ref()
    }

    /// Get half-edge by ID
    pub fn half_edge(&self, id: HalfEdgeId) -> Option<&HalfEdge> {
        self.half_edges.get(id.0 as usize)?.as_ref()
    }

    /// Get face by ID
    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(id.0 as usize)?.as_ref()
    }

    /// Iterate live vertices
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.iter().flatten()
    }

    /// Iterate live half-edges
    pub fn half_edges(&self) -> impl Iterator<Item = &HalfEdge> {
        self.half_edges.iter().flatten()
    }

    /// Iterate live faces
    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.iter().flatten()
    }

    /// Number of live vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    /// Number of live faces
    pub fn face_count(&self) -> usize {
        self.faces().count()
    }

    /// Number of undirected edges (interior edges have two half-edges,
    /// boundary edges one)
    pub fn edge_count(&self) -> usize {
        let paired = self.half_edges().filter(|he| he.twin.is_some()).count();
        let boundary = self.half_edges().filter(|he| he.twin.is_none()).count();
        paired / 2 + boundary
    }

    /// Bounding box of all live vertices; used for rendering upload and for
    /// sizing spatial indices.
    pub fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for vertex in self.vertices() {
            aabb.include_point(vertex.position);
        }
        aabb
    }

    /// Live vertex positions keyed by id, for rendering upload.
    pub fn positions(&self) -> impl Iterator<Item = (VertexId, glam::Vec3)> + '_ {
        self.vertices().map(|v| (v.id, v.position))
    }

    /// Fan-triangulated face list (quads become two triangles), for
    /// rendering upload and external geometry queries.
    pub fn triangles(&self) -> Vec<[VertexId; 3]> {
        let mut result = Vec::new();
        for face in self.faces() {
            match self.face_vertices(face.id).as_slice() {
                &[a, b, c] => result.push([a, b, c]),
                &[a, b, c, d] => {
                    result.push([a, b, c]);
                    result.push([a, c, d]);
                }
                _ => {}
            }
        }
        result
    }

    // ========================================================================
    // Topology Queries
    // ========================================================================

    /// All vertices connected to `id` by an edge, collected in one traversal
    /// around the vertex fan; O(degree). Both rotational directions are
    /// walked so boundary fans are covered completely.
    pub fn neighbors(&self, id: VertexId) -> Result<Vec<VertexId>, IdentityError> {
        let vertex = self.vertex(id).ok_or(IdentityError::UnknownVertex(id))?;
        let mut result = Vec::new();
        let Some(start) = vertex.outgoing else {
            return Ok(result);
        };

        let mut visited = HashSet::new();
        let mut hit_boundary = false;
        let mut current = start;
        loop {
            if !visited.insert(current) {
                break;
            }
            let Some(he) = self.half_edge(current) else {
                break;
            };
            if let Some(next_he) = self.half_edge(he.next) {
                if !result.contains(&next_he.origin) {
                    result.push(next_he.origin);
                }
            }
            let Some(prev_he) = self.half_edge(he.prev) else {
                break;
            };
            match prev_he.twin {
                Some(twin) if twin == start => break,
                Some(twin) => current = twin,
                None => {
                    // The incoming boundary edge ends this side of the fan;
                    // its origin is a neighbor no outgoing half-edge reaches
                    if !result.contains(&prev_he.origin) {
                        result.push(prev_he.origin);
                    }
                    hit_boundary = true;
                    break;
                }
            }
        }

        if hit_boundary {
            // Walk the other rotational direction from the start
            let mut current = start;
            loop {
                let Some(he) = self.half_edge(current) else {
                    break;
                };
                let Some(twin) = he.twin else {
                    break;
                };
                let Some(twin_he) = self.half_edge(twin) else {
                    break;
                };
                let next_out = twin_he.next;
                if next_out == start || !visited.insert(next_out) {
                    break;
                }
                let Some(out_he) = self.half_edge(next_out) else {
                    break;
                };
                if let Some(dest) = self.half_edge(out_he.next) {
                    if !result.contains(&dest.origin) {
                        result.push(dest.origin);
                    }
                }
                current = next_out;
            }
        }

        Ok(result)
    }

    /// All faces incident to a vertex, one fan traversal; O(degree).
    pub fn vertex_faces(&self, id: VertexId) -> Result<Vec<FaceId>, IdentityError> {
        let vertex = self.vertex(id).ok_or(IdentityError::UnknownVertex(id))?;
        let mut result = Vec::new();
        let Some(start) = vertex.outgoing else {
            return Ok(result);
        };

        let mut visited = HashSet::new();
        let mut hit_boundary = false;
        let mut current = start;
        loop {
            if !visited.insert(current) {
                break;
            }
            let Some(he) = self.half_edge(current) else {
                break;
            };
            if !result.contains(&he.face) {
                result.push(he.face);
            }
            let Some(prev_he) = self.half_edge(he.prev) else {
                break;
            };
            match prev_he.twin {
                Some(twin) if twin == start => break,
                Some(twin) => current = twin,
                None => {
                    hit_boundary = true;
                    break;
                }
            }
        }

        if hit_boundary {
            let mut current = start;
            loop {
                let Some(he) = self.half_edge(current) else {
                    break;
                };
                let Some(twin) = he.twin else {
                    break;
                };
                let Some(twin_he) = self.half_edge(twin) else {
                    break;
                };
                let next_out = twin_he.next;
                if next_out == start || !visited.insert(next_out) {
                    break;
                }
                let Some(out_he) = self.half_edge(next_out) else {
                    break;
                };
                if !result.contains(&out_he.face) {
                    result.push(out_he.face);
                }
                current = next_out;
            }
        }

        Ok(result)
    }

    /// Faces sharing an edge with the given face.
    pub fn adjacent_faces(&self, id: FaceId) -> Result<Vec<FaceId>, IdentityError> {
        if self.face(id).is_none() {
            return Err(IdentityError::UnknownFace(id));
        }
        let mut result = Vec::new();
        for he_id in self.face_half_edges(id) {
            let Some(he) = self.half_edge(he_id) else {
                continue;
            };
            let Some(twin) = he.twin.and_then(|t| self.half_edge(t)) else {
                continue;
            };
            if !result.contains(&twin.face) {
                result.push(twin.face);
            }
        }
        Ok(result)
    }

    /// The vertices of a face in cycle order (empty if the id is unknown).
    pub fn face_vertices(&self, id: FaceId) -> Vec<VertexId> {
        let mut result = Vec::new();
        let Some(face) = self.face(id) else {
            return result;
        };
        let start = face.half_edge;
        let mut current = start;
        loop {
            let Some(he) = self.half_edge(current) else {
                break;
            };
            result.push(he.origin);
            current = he.next;
            if current == start || result.len() > 4 {
                break;
            }
        }
        result
    }

    /// The half-edges forming the boundary cycle of a face.
    pub fn face_half_edges(&self, id: FaceId) -> Vec<HalfEdgeId> {
        let mut result = Vec::new();
        let Some(face) = self.face(id) else {
            return result;
        };
        let start = face.half_edge;
        let mut current = start;
        loop {
            result.push(current);
            let Some(he) = self.half_edge(current) else {
                break;
            };
            current = he.next;
            if current == start || result.len() > 4 {
                break;
            }
        }
        result
    }

    /// The destination vertex of a half-edge.
    pub fn half_edge_dest(&self, id: HalfEdgeId) -> Option<VertexId> {
        let he = self.half_edge(id)?;
        Some(self.half_edge(he.next)?.origin)
    }

    /// Find a half-edge by its origin and destination vertices.
    pub fn find_half_edge(&self, from: VertexId, to: VertexId) -> Option<HalfEdgeId> {
        self.edge_map.get(&(from, to)).copied()
    }

    /// Check if an edge is on the boundary (its half-edge has no twin).
    pub fn is_boundary_edge(&self, id: HalfEdgeId) -> bool {
        self.half_edge(id).map(|he| he.twin.is_none()).unwrap_or(true)
    }

    /// Check if a vertex lies on the mesh boundary (or is isolated).
    pub fn is_boundary_vertex(&self, id: VertexId) -> bool {
        let Some(vertex) = self.vertex(id) else {
            return false;
        };
        let Some(start) = vertex.outgoing else {
            return true;
        };

        let mut visited = HashSet::new();
        let mut current = start;
        loop {
            if !visited.insert(current) {
                return false;
            }
            let Some(he) = self.half_edge(current) else {
                return false;
            };
            if he.twin.is_none() {
                return true;
            }
            let Some(prev_he) = self.half_edge(he.prev) else {
                return false;
            };
            match prev_he.twin {
                Some(twin) if twin == start => return false,
                Some(twin) => current = twin,
                None => return true,
            }
        }
    }
}
