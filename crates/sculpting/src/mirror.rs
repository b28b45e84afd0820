//! Mirroring: keeps one half of a mesh the exact reflection of the other
//! across a cutting plane.
//!
//! The mirrored half is re-derived from live geometry on demand — it is
//! never part of the action log, so disabling and re-enabling mirroring
//! cannot corrupt undo history. [`Mirror::apply`] deletes every face on the
//! negative side of the plane and rebuilds it as the reflection of the
//! positive side, welding the halves along vertices inside the seam band
//! (which are pinned onto the plane).

use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use mesh::geom::{MirrorPlane, Plane};
use mesh::half_edge::{FaceId, HalfEdgeMesh, MeshError, VertexId};

use crate::brush::PointOfAction;

/// Principal axis the cutting plane is orthogonal to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    X,
    Y,
    Z,
}

impl Dimension {
    pub fn axis(&self) -> Vec3 {
        match self {
            Dimension::X => Vec3::X,
            Dimension::Y => Vec3::Y,
            Dimension::Z => Vec3::Z,
        }
    }
}

/// Mirroring parameters, passed in explicitly by the owning tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Seam band half-width: vertices closer to the plane than this are
    /// pinned onto it
    pub width: f32,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self { width: 1e-3 }
    }
}

/// A symmetry policy over one cutting plane.
#[derive(Debug, Clone)]
pub struct Mirror {
    plane: Plane,
    width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Positive,
    Negative,
    Seam,
}

impl Mirror {
    /// A mirror across the plane through the origin orthogonal to `dimension`.
    pub fn new(config: &MirrorConfig, dimension: Dimension) -> Self {
        Self {
            plane: Plane::new(dimension.axis(), 0.0),
            width: config.width,
        }
    }

    pub fn from_plane(config: &MirrorConfig, plane: Plane) -> Self {
        Self {
            plane,
            width: config.width,
        }
    }

    /// The cutting plane, for rendering and for reflecting brush parameters.
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn mirror_plane(&self) -> MirrorPlane {
        MirrorPlane {
            plane: self.plane,
            width: self.width,
        }
    }

    pub fn reflect_point(&self, point: Vec3) -> Vec3 {
        self.plane.reflect_point(point)
    }

    pub fn reflect_normal(&self, normal: Vec3) -> Vec3 {
        self.plane.reflect_vector(normal)
    }

    /// Mirror a brush point of action to sculpt the opposite side.
    pub fn reflect(&self, point: PointOfAction) -> PointOfAction {
        PointOfAction {
            position: self.reflect_point(point.position),
            normal: self.reflect_normal(point.normal),
        }
    }

    fn side_of(&self, position: Vec3) -> Side {
        let distance = self.plane.signed_distance(position);
        if distance.abs() <= self.width {
            Side::Seam
        } else if distance > 0.0 {
            Side::Positive
        } else {
            Side::Negative
        }
    }

    /// Rebuild the negative half of the mesh as the reflection of the
    /// positive half and attach the plane to the mesh.
    ///
    /// All mutation here bypasses the action log; deleted ids are released
    /// immediately since no log entry can reference them.
    pub fn apply(&self, mesh: &mut HalfEdgeMesh) -> Result<(), MeshError> {
        let sides: HashMap<VertexId, Side> = mesh
            .vertices()
            .map(|v| (v.id, self.side_of(v.position)))
            .collect();

        // Pin seam vertices onto the plane
        let seam: Vec<(VertexId, Vec3)> = mesh
            .vertices()
            .filter(|v| sides[&v.id] == Side::Seam)
            .map(|v| (v.id, self.plane.project(v.position)))
            .collect();
        for (id, position) in seam {
            mesh.move_vertex(id, position)?;
        }

        let faces: Vec<(FaceId, Vec<VertexId>)> = mesh
            .faces()
            .map(|f| (f.id, mesh.face_vertices(f.id)))
            .collect();

        // Drop every face touching the negative side
        let mut dropped = 0usize;
        for (face, loop_verts) in &faces {
            if loop_verts.iter().any(|v| sides[v] == Side::Negative) {
                mesh.delete_face(*face)?;
                mesh.release_face_id(*face);
                dropped += 1;
            }
        }
        let mut negative: Vec<VertexId> = sides
            .iter()
            .filter(|&(_, &side)| side == Side::Negative)
            .map(|(&vertex, _)| vertex)
            .collect();
        negative.sort();
        for vertex in negative {
            if mesh.vertex(vertex).is_some_and(|v| v.outgoing.is_none()) {
                mesh.delete_vertex(vertex)?;
                mesh.release_vertex_id(vertex);
            }
        }

        // Rebuild: reflect each surviving face that reaches off the plane,
        // reversing the winding and welding seam vertices
        let mut partners: HashMap<VertexId, VertexId> = HashMap::new();
        let mut mirrored_faces = 0usize;
        'faces: for (_, loop_verts) in &faces {
            if loop_verts.iter().any(|v| sides[v] == Side::Negative) {
                continue;
            }
            if !loop_verts.iter().any(|v| sides[v] == Side::Positive) {
                continue;
            }

            let mut mirrored = Vec::with_capacity(loop_verts.len());
            for &vertex in loop_verts.iter().rev() {
                let mapped = match sides[&vertex] {
                    Side::Seam => vertex,
                    Side::Positive => match partners.get(&vertex) {
                        Some(&partner) => partner,
                        None => {
                            let Some(position) =
                                mesh.vertex(vertex).map(|v| v.position)
                            else {
                                continue 'faces;
                            };
                            let partner = mesh.add_vertex(self.reflect_point(position));
                            partners.insert(vertex, partner);
                            partner
                        }
                    },
                    Side::Negative => continue 'faces,
                };
                mirrored.push(mapped);
            }
            mesh.add_face(&mirrored)?;
            mirrored_faces += 1;
        }

        mesh.recalculate_normals();
        mesh.set_mirror_plane(self.mirror_plane());

        debug!(
            "mirror: {} negative faces dropped, {} faces mirrored, {} partner vertices",
            dropped,
            mirrored_faces,
            partners.len()
        );
        Ok(())
    }
}
