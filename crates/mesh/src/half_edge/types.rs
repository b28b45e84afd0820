//! Type definitions for the half-edge mesh store.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Type-safe vertex identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u32);

/// Type-safe half-edge identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HalfEdgeId(pub u32);

/// Type-safe face identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FaceId(pub u32);

/// A vertex in the half-edge mesh
#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: VertexId,
    pub position: Vec3,
    /// Cached vertex normal, averaged from incident face normals
    pub normal: Vec3,
    /// One outgoing half-edge from this vertex (None while isolated)
    pub outgoing: Option<HalfEdgeId>,
}

/// A half-edge in the mesh
///
/// Each interior edge is represented by two half-edges pointing in opposite
/// directions. Every half-edge belongs to exactly one face; an edge is on the
/// mesh boundary when its half-edge has no twin.
#[derive(Debug, Clone)]
pub struct HalfEdge {
    pub id: HalfEdgeId,
    /// The vertex this half-edge originates from
    pub origin: VertexId,
    /// The opposite half-edge (None for boundary edges)
    pub twin: Option<HalfEdgeId>,
    /// The next half-edge around the face (counter-clockwise)
    pub next: HalfEdgeId,
    /// The previous half-edge around the face (counter-clockwise)
    pub prev: HalfEdgeId,
    /// The face this half-edge borders
    pub face: FaceId,
}

/// A face (triangle or quad) in the mesh
#[derive(Debug, Clone)]
pub struct Face {
    pub id: FaceId,
    /// One half-edge on the boundary of this face
    pub half_edge: HalfEdgeId,
    /// Cached face normal
    pub normal: Vec3,
}

/// An operation would violate the topological invariants. The mesh is left
/// unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("face must have 3 or 4 vertices, got {0}")]
    FaceArity(usize),
    #[error("face repeats vertex {0:?}")]
    DegenerateFace(VertexId),
    #[error("directed edge {from:?} -> {to:?} already belongs to face {face:?}")]
    EdgeAlreadyClaimed {
        from: VertexId,
        to: VertexId,
        face: FaceId,
    },
    #[error("vertex {0:?} still has incident faces")]
    VertexInUse(VertexId),
    #[error("face {0:?} is not a triangle")]
    NotATriangle(FaceId),
    #[error("face {0:?} is not a quad")]
    NotAQuad(FaceId),
    #[error("collapsing edge {from:?} -> {to:?} would create a non-manifold vertex")]
    NonManifoldCollapse { from: VertexId, to: VertexId },
    #[error("mesh invariant violated: {0}")]
    Corrupt(String),
}

/// An id referred to a deleted or never-existing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("unknown or deleted vertex {0:?}")]
    UnknownVertex(VertexId),
    #[error("unknown or deleted half-edge {0:?}")]
    UnknownHalfEdge(HalfEdgeId),
    #[error("unknown or deleted face {0:?}")]
    UnknownFace(FaceId),
}

/// Umbrella error for mesh store and topological action failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshError {
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}
