use serde::{Deserialize, Serialize};

use crate::error::{check_wavelength, Result};

/// Path length difference `2·c·sin(θ)` between rays scattered by
/// neighbouring planes `c` apart.
///
/// Angles outside [0, π/2] are evaluated as-is.
pub fn compute_pld(c: f64, source_angle: f64) -> f64 {
    2.0 * c * source_angle.sin()
}

/// Path length difference expressed in wavelengths.
pub fn compute_pld_in_wavelengths(pld: f64, wavelength: f64) -> Result<f64> {
    check_wavelength(wavelength)?;
    Ok(pld / wavelength)
}

/// True when `value` is within `tolerance` of an integer.
pub fn is_in_phase(value: f64, tolerance: f64) -> bool {
    (value - value.round()).abs() < tolerance
}

/// Scalar diagnostics derived from the current angle, wavelength and lattice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BraggState {
    /// Path length difference in ångström.
    pub pld: f64,
    /// `pld / λ`.
    pub pld_in_wavelengths: f64,
    /// Constructive interference (Bragg condition met).
    pub in_phase: bool,
    /// Nearest whole number of wavelengths.
    pub order: i64,
}

impl BraggState {
    pub fn compute(c: f64, source_angle: f64, wavelength: f64, tolerance: f64) -> Result<Self> {
        let pld = compute_pld(c, source_angle);
        let pld_in_wavelengths = compute_pld_in_wavelengths(pld, wavelength)?;
        Ok(Self {
            pld,
            pld_in_wavelengths,
            in_phase: is_in_phase(pld_in_wavelengths, tolerance),
            order: pld_in_wavelengths.round() as i64,
        })
    }
}

/// A diffraction order and the incident angle that satisfies it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BraggAngle {
    pub order: u32,
    /// Radians in [0, π/2].
    pub angle: f64,
}

/// Every order `n ≥ 1` with `n·λ ≤ 2c`, solved for `sin θ = n·λ / 2c`.
pub fn bragg_angles(c: f64, wavelength: f64) -> Result<Vec<BraggAngle>> {
    check_wavelength(wavelength)?;
    let max_order = (2.0 * c / wavelength).floor();
    if !max_order.is_finite() || max_order < 1.0 {
        return Ok(Vec::new());
    }
    Ok((1..=max_order as u32)
        .map(|order| BraggAngle {
            order,
            angle: (order as f64 * wavelength / (2.0 * c)).min(1.0).asin(),
        })
        .collect())
}
