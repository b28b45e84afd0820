//! Sculpting layer on top of the mesh kernel.
//!
//! - [`brush`] - sculpt brush state machine and per-mode parameter variants
//! - [`deformation`] - displacement fields for each brush mode
//! - [`spatial`] - vertex octree for radius queries
//! - [`mirror`] - symmetry across a cutting plane
//!
//! A tool drives a stroke as: resolve the pointer to a surface point with
//! [`mesh::raycast`], open a composite on the [`mesh::history::History`],
//! feed points of action to a [`brush::SculptBrush`], and seal (or drop)
//! the composite on release. With a [`mirror::Mirror`] active the tool
//! applies the brush a second time at the reflected point of action and
//! re-derives the mirrored half on release.

pub mod brush;
pub mod deformation;
pub mod mirror;
pub mod spatial;

pub use brush::{
    BrushConfig, BrushMode, FalloffCurve, PointOfAction, SculptBrush, SculptError, StrokeStats,
    SubdivisionConfig,
};
pub use deformation::Sample;
pub use mirror::{Dimension, Mirror, MirrorConfig};
pub use spatial::{OctreeConfig, VertexOctree};
