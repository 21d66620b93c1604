use std::f64::consts::FRAC_1_SQRT_2;

/// Half-size of the viewing window in ångström. Bounds how many lattice
/// rows and columns are generated and how many rays may be requested.
pub const VIEW_HALF_EXTENT: f64 = 20.0;

/// How close PLD/λ must be to an integer to count as in phase.
pub const IN_PHASE_TOLERANCE: f64 = 0.014;

/// Polyline resolution of a sampled wave.
pub const SAMPLES_PER_WAVELENGTH: f64 = 16.0;

/// Phase advance constant ω·λ (rad·Å/s). Corresponds to light travelling
/// at 3 Å/s: ω = 2π·3/λ ≈ 18.85/λ.
pub const PHASE_SPEED: f64 = 19.0;

/// Default manual step length in seconds.
pub const MANUAL_STEP: f64 = 0.04;

/// Display pixels per ångström.
pub const SCALE_FACTOR: f64 = 8.0;

/// Transverse amplitude of a drawn wave, in pixels.
pub const WAVE_AMPLITUDE: f64 = 10.0;

/// Length of the top incident ray, in pixels.
pub const TOP_RAY_LENGTH: f64 = 400.0;

/// On/off length of the dashed ray baseline, in pixels.
pub const DASH_LENGTH: f64 = 8.0;

/// Crystal centre in display coordinates (x right, y down).
pub const CRYSTAL_CENTER: [f64; 2] = [400.0, 440.0];

/// Upper bound on grid rows or columns generated per quadrant.
pub const MAX_GRID_INDEX: usize = 10_000;

/// Tolerance for comparing lattice coordinates.
pub const LATTICE_TOLERANCE: f64 = 1e-10;

/// Perpendicular distance between neighbouring vertical rays, in the same
/// units as `c`.
pub fn ray_separation(c: f64, source_angle: f64) -> f64 {
    c * source_angle.cos()
}

/// Half the horizontal spacing of the top lattice row after rotating the
/// lattice by `orientation`.
///
/// Below 45° the top row is an `a` row; past it the `c` rows take over.
/// The switch is exact at |cos θ| = 1/√2.
pub fn top_row_spacing_half(a: f64, c: f64, orientation: f64) -> f64 {
    let cos_theta = orientation.cos();
    if cos_theta.abs() > FRAC_1_SQRT_2 {
        a * cos_theta.abs() / 2.0
    } else {
        c * orientation.sin().abs() / 2.0
    }
}
