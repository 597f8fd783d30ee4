//! Finite-volume mesh over the characteristic dimension of a part.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};
use crate::geometry::{Geometry, InnerSurface};

/// Smallest accepted node count.
pub const MIN_NODES: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    Cartesian,
    Cylindrical,
}

/// Named reporting positions between the thermal center and the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeLocation {
    Center,
    OneThird,
    TwoThirds,
    Surface,
}

impl ProbeLocation {
    pub const ALL: [ProbeLocation; 4] = [
        ProbeLocation::Center,
        ProbeLocation::OneThird,
        ProbeLocation::TwoThirds,
        ProbeLocation::Surface,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProbeLocation::Center => "center",
            ProbeLocation::OneThird => "one_third",
            ProbeLocation::TwoThirds => "two_thirds",
            ProbeLocation::Surface => "surface",
        }
    }
}

/// 1-D mesh: node positions, control volumes and the face areas between
/// neighbouring nodes.
#[derive(Debug, Clone)]
pub struct Mesh {
    geometry: Geometry,
    coords: CoordinateSystem,
    positions: Vec<f64>,
    volumes: Vec<f64>,
    face_areas: Vec<f64>,
    spacing: f64,
    outer_area: f64,
    inner_area: f64,
    center: usize,
}

/// Discretize `geometry` into `n_nodes` nodes.
///
/// `n_nodes` must be odd and at least [`MIN_NODES`] so the wall of a ring
/// has a mid node and every shape has a well-defined center probe.
pub fn discretize(geometry: &Geometry, n_nodes: usize) -> MeshResult<Mesh> {
    if n_nodes < MIN_NODES || n_nodes % 2 == 0 {
        return Err(MeshError::InvalidNodeCount {
            n_nodes,
            min: MIN_NODES,
        });
    }
    geometry.validate()?;

    let n = n_nodes;
    let mesh = match *geometry {
        Geometry::Cylinder { radius, length } => {
            let dr = radius / (n - 1) as f64;
            let positions: Vec<f64> = (0..n).map(|i| i as f64 * dr).collect();
            let faces: Vec<f64> = (0..n - 1).map(|i| (i as f64 + 0.5) * dr).collect();
            Mesh {
                geometry: geometry.clone(),
                coords: CoordinateSystem::Cylindrical,
                volumes: annular_volumes(0.0, radius, &faces, length),
                face_areas: faces.iter().map(|r| 2.0 * PI * r * length).collect(),
                positions,
                spacing: dr,
                outer_area: 2.0 * PI * radius * length,
                inner_area: 0.0,
                center: 0,
            }
        }
        Geometry::Plate {
            thickness,
            width,
            length,
        } => {
            let half = 0.5 * thickness;
            let dx = half / (n - 1) as f64;
            let area = width * length;
            let positions: Vec<f64> = (0..n).map(|i| i as f64 * dx).collect();
            let mut volumes = vec![area * dx; n];
            volumes[0] = 0.5 * area * dx;
            volumes[n - 1] = 0.5 * area * dx;
            Mesh {
                geometry: geometry.clone(),
                coords: CoordinateSystem::Cartesian,
                positions,
                volumes,
                face_areas: vec![area; n - 1],
                spacing: dx,
                outer_area: area,
                inner_area: 0.0,
                center: 0,
            }
        }
        Geometry::Ring {
            inner_radius,
            outer_radius,
            length,
            inner_surface,
        } => {
            let dr = (outer_radius - inner_radius) / (n - 1) as f64;
            let positions: Vec<f64> = (0..n).map(|i| inner_radius + i as f64 * dr).collect();
            let faces: Vec<f64> = (0..n - 1)
                .map(|i| inner_radius + (i as f64 + 0.5) * dr)
                .collect();
            let (inner_area, center) = match inner_surface {
                InnerSurface::Insulated => (0.0, 0),
                InnerSurface::Exposed => (2.0 * PI * inner_radius * length, n / 2),
            };
            Mesh {
                geometry: geometry.clone(),
                coords: CoordinateSystem::Cylindrical,
                volumes: annular_volumes(inner_radius, outer_radius, &faces, length),
                face_areas: faces.iter().map(|r| 2.0 * PI * r * length).collect(),
                positions,
                spacing: dr,
                outer_area: 2.0 * PI * outer_radius * length,
                inner_area,
                center,
            }
        }
    };
    Ok(mesh)
}

/// Control volumes of annular cells bounded by consecutive faces.
fn annular_volumes(r_in: f64, r_out: f64, faces: &[f64], length: f64) -> Vec<f64> {
    let mut bounds = Vec::with_capacity(faces.len() + 2);
    bounds.push(r_in);
    bounds.extend_from_slice(faces);
    bounds.push(r_out);
    bounds
        .windows(2)
        .map(|w| PI * (w[1] * w[1] - w[0] * w[0]) * length)
        .collect()
}

impl Mesh {
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.coords
    }

    pub fn n_nodes(&self) -> usize {
        self.positions.len()
    }

    /// Distance of each node from the axis (cylindrical) or mid-plane.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    /// Area of the face between node `i` and `i + 1`.
    pub fn face_areas(&self) -> &[f64] {
        &self.face_areas
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn outer_area(&self) -> f64 {
        self.outer_area
    }

    /// Exposed bore area of a ring; zero for every other case.
    pub fn inner_area(&self) -> f64 {
        self.inner_area
    }

    pub fn surface_index(&self) -> usize {
        self.positions.len() - 1
    }

    /// Node with the slowest thermal response.
    pub fn center_index(&self) -> usize {
        self.center
    }

    pub fn probe_index(&self, location: ProbeLocation) -> usize {
        let c = self.center;
        let span = self.surface_index() - c;
        match location {
            ProbeLocation::Center => c,
            ProbeLocation::OneThird => c + span / 3,
            ProbeLocation::TwoThirds => c + 2 * span / 3,
            ProbeLocation::Surface => self.surface_index(),
        }
    }

    pub fn total_volume(&self) -> f64 {
        self.volumes.iter().sum()
    }

    /// Σ Vᵢ·wᵢ·Tᵢ; with `weights = ρ·cp` this is the stored heat relative to 0 °C.
    pub fn volume_weighted_sum(&self, field: &[f64], weights: &[f64]) -> MeshResult<f64> {
        let n = self.n_nodes();
        if field.len() != n {
            return Err(MeshError::FieldLength {
                expected: n,
                got: field.len(),
            });
        }
        if weights.len() != n {
            return Err(MeshError::FieldLength {
                expected: n,
                got: weights.len(),
            });
        }
        Ok(self
            .volumes
            .iter()
            .zip(field)
            .zip(weights)
            .map(|((v, t), w)| v * w * t)
            .sum())
    }
}
