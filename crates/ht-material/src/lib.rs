//! ht-material: temperature-dependent thermal properties of steel grades.
//!
//! Provides:
//! - `PropertyModel` (constant, curve, polynomial, equation of T)
//! - a small safe arithmetic expression evaluator for equation models
//! - `MaterialModel` bundling conductivity, specific heat, density, emissivity
//! - a catalog of standard grades with handbook curve data
//!
//! Temperatures are in °C; property values in SI.

pub mod catalog;
pub mod error;
pub mod expr;
pub mod material;
pub mod property;

pub use catalog::{grade, standard_grades};
pub use error::{MaterialError, MaterialResult};
pub use expr::Expression;
pub use material::{MaterialModel, OperatingRange, ThermalProperties};
pub use property::PropertyModel;
