//! Idealized part shapes.

use ht_core::ensure_positive;
use ht_core::units::{Length, meters_of};
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};

/// Whether a ring's bore takes part in heat exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InnerSurface {
    #[default]
    Insulated,
    Exposed,
}

/// Part shape with characteristic dimensions in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Geometry {
    Cylinder {
        radius: f64,
        length: f64,
    },
    Plate {
        thickness: f64,
        width: f64,
        length: f64,
    },
    Ring {
        inner_radius: f64,
        outer_radius: f64,
        length: f64,
        #[serde(default)]
        inner_surface: InnerSurface,
    },
}

impl Geometry {
    pub fn cylinder(radius: Length, length: Length) -> Self {
        Geometry::Cylinder {
            radius: meters_of(radius),
            length: meters_of(length),
        }
    }

    pub fn plate(thickness: Length, width: Length, length: Length) -> Self {
        Geometry::Plate {
            thickness: meters_of(thickness),
            width: meters_of(width),
            length: meters_of(length),
        }
    }

    pub fn ring(inner_radius: Length, outer_radius: Length, length: Length) -> Self {
        Geometry::Ring {
            inner_radius: meters_of(inner_radius),
            outer_radius: meters_of(outer_radius),
            length: meters_of(length),
            inner_surface: InnerSurface::Insulated,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Geometry::Cylinder { .. } => "cylinder",
            Geometry::Plate { .. } => "plate",
            Geometry::Ring { .. } => "ring",
        }
    }

    /// Check that every dimension is finite and positive.
    pub fn validate(&self) -> MeshResult<()> {
        match *self {
            Geometry::Cylinder { radius, length } => {
                positive("radius", radius)?;
                positive("length", length)?;
            }
            Geometry::Plate {
                thickness,
                width,
                length,
            } => {
                positive("thickness", thickness)?;
                positive("width", width)?;
                positive("length", length)?;
            }
            Geometry::Ring {
                inner_radius,
                outer_radius,
                length,
                ..
            } => {
                positive("inner_radius", inner_radius)?;
                positive("outer_radius", outer_radius)?;
                positive("length", length)?;
                if inner_radius >= outer_radius {
                    return Err(MeshError::InvertedRing {
                        inner: inner_radius,
                        outer: outer_radius,
                    });
                }
            }
        }
        Ok(())
    }

    /// Volume of the body that the 1-D mesh represents. Plates are meshed
    /// over half their thickness, so this is half the plate.
    pub fn meshed_volume(&self) -> f64 {
        use std::f64::consts::PI;
        match *self {
            Geometry::Cylinder { radius, length } => PI * radius * radius * length,
            Geometry::Plate {
                thickness,
                width,
                length,
            } => 0.5 * thickness * width * length,
            Geometry::Ring {
                inner_radius,
                outer_radius,
                length,
                ..
            } => PI * (outer_radius * outer_radius - inner_radius * inner_radius) * length,
        }
    }
}

fn positive(what: &'static str, value: f64) -> MeshResult<()> {
    ensure_positive(value, what)
        .map(|_| ())
        .map_err(|_| MeshError::InvalidDimension { what, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_core::units::{m, mm};

    #[test]
    fn unit_constructors_store_metres() {
        let g = Geometry::cylinder(mm(25.0), mm(100.0));
        match g {
            Geometry::Cylinder { radius, length } => {
                assert!((radius - 0.025).abs() < 1e-12);
                assert!((length - 0.1).abs() < 1e-12);
            }
            _ => panic!("expected cylinder"),
        }
    }

    #[test]
    fn ring_rejects_inverted_radii() {
        let g = Geometry::ring(m(0.05), m(0.04), m(0.1));
        assert!(matches!(g.validate(), Err(MeshError::InvertedRing { .. })));
    }

    #[test]
    fn negative_dimension_rejected() {
        let g = Geometry::Plate {
            thickness: -0.01,
            width: 0.1,
            length: 0.1,
        };
        assert!(matches!(
            g.validate(),
            Err(MeshError::InvalidDimension {
                what: "thickness",
                ..
            })
        ));
    }

    #[test]
    fn serde_tag_is_shape() {
        let json = r#"{"shape":"ring","inner_radius":0.02,"outer_radius":0.04,"length":0.05}"#;
        let g: Geometry = serde_json::from_str(json).unwrap();
        assert!(matches!(
            g,
            Geometry::Ring {
                inner_surface: InnerSurface::Insulated,
                ..
            }
        ));
        assert_eq!(g.kind_name(), "ring");
    }
}
