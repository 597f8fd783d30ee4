// ht-core/src/units.rs

use uom::si::f64::Length as UomLength;

// Public canonical unit types (SI, f64)
pub type Length = UomLength;

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn mm(v: f64) -> Length {
    use uom::si::length::millimeter;
    Length::new::<millimeter>(v)
}

#[inline]
pub fn meters_of(l: Length) -> f64 {
    use uom::si::length::meter;
    l.get::<meter>()
}

/// Celsius to Kelvin on plain floats (hot loops avoid the uom wrapper).
#[inline]
pub fn c_to_k(t_c: f64) -> f64 {
    t_c + constants::KELVIN_OFFSET
}

pub mod constants {
    pub const KELVIN_OFFSET: f64 = 273.15;
    pub const ABSOLUTE_ZERO_C: f64 = -273.15;

    /// Stefan–Boltzmann constant [W/(m²·K⁴)]
    pub const STEFAN_BOLTZMANN: f64 = 5.670_374_419e-8;

    /// Universal gas constant [J/(mol·K)]
    pub const GAS_CONSTANT: f64 = 8.314;
}
