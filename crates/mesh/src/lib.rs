//! Mesh kernel for interactive sculpting.
//!
//! This crate provides the topological core of the editor:
//! - [`half_edge`] - arena-indexed half-edge mesh store with stable ids
//! - [`actions`] - composable topological operations with exact undo/redo
//! - [`history`] - linear action log with composite (per-gesture) entries
//! - [`raycast`] - ray-vs-mesh and sphere-vs-mesh intersection queries
//! - [`geom`] - bounding boxes and planes shared with the brush layer
//!
//! The kernel is single-threaded and non-reentrant: one composite action
//! must be sealed or dropped before the next begins, and geometry queries
//! never run concurrently with a mutation. Rendering, input handling and
//! persistence live outside this crate and talk to it through ids and the
//! read-only accessors.

pub mod actions;
pub mod geom;
pub mod half_edge;
pub mod history;
pub mod raycast;

pub use actions::Action;
pub use geom::{Aabb, MirrorPlane, Plane};
pub use half_edge::{
    Face, FaceId, HalfEdge, HalfEdgeId, HalfEdgeMesh, IdentityError, MeshError, MeshSignature,
    TopologyError, Vertex, VertexId,
};
pub use history::{CompositeAction, History, HistoryError, PreconditionError};
pub use raycast::{intersect_ray, intersect_sphere, MeshHit};
