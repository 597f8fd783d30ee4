//! Part geometry and 1-D finite-volume discretization.
//!
//! Cylinders and rings are meshed radially, plates through the half
//! thickness from the mid-plane. Node 0 of a cylinder or plate sits on the
//! symmetry axis/plane and has no face on that side, so the zero-flux
//! symmetry condition holds by construction.

pub mod error;
pub mod geometry;
pub mod mesh;

pub use error::{MeshError, MeshResult};
pub use geometry::{Geometry, InnerSurface};
pub use mesh::{CoordinateSystem, MIN_NODES, Mesh, ProbeLocation, discretize};
