//! Error types for geometry and discretization.

use thiserror::Error;

/// Invalid geometry or discretization input. Detected before any solving.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("Node count must be odd and at least {min}, got {n_nodes}")]
    InvalidNodeCount { n_nodes: usize, min: usize },

    #[error("Invalid dimension {what}: {value} m")]
    InvalidDimension { what: &'static str, value: f64 },

    #[error("Inner radius {inner} m must be smaller than outer radius {outer} m")]
    InvertedRing { inner: f64, outer: f64 },

    #[error("Field length {got} does not match node count {expected}")]
    FieldLength { expected: usize, got: usize },
}

pub type MeshResult<T> = Result<T, MeshError>;
