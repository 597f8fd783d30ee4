//! ht-core: stable foundation for the heat-treatment workspace.
//!
//! Contains:
//! - units (uom length type, Kelvin conversion, physical constants)
//! - numeric (float checks, interpolation, crossing times)
//! - ids (compact record identifiers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{HtError, HtResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
