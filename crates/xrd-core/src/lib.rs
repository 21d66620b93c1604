pub mod bragg;
pub mod constants;
pub mod error;
pub mod lattice;
pub mod model;
pub mod rays;
pub mod wave;

use serde::{Deserialize, Serialize};

pub use error::{Result, XrdError};

use bragg::BraggState;
use lattice::{Lattice, LatticeConstants, LatticeSites};
use rays::{RayFrame, RayRequest};
use wave::WavefrontMode;

// ---------------------------------------------------------------------------
// Shared interface types
// ---------------------------------------------------------------------------

/// Parameters the user controls, describing the full simulation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Lattice constants in ångström.
    pub lattice: LatticeConstants,
    /// Crystal rotation relative to the beam, radians.
    pub orientation: f64,
    /// Incident angle θ_in, radians (0–π/2).
    pub source_angle: f64,
    /// Source wavelength in ångström.
    pub wavelength: f64,
    /// Requested rays on each side of the centre column.
    pub horizontal_rays: f64,
    /// Requested number of lattice planes to trace.
    pub vertical_rays: f64,
    pub show_transmitted: bool,
    pub show_path_difference: bool,
    pub wavefront_mode: WavefrontMode,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            lattice: LatticeConstants::default(),
            orientation: 0.0,
            source_angle: std::f64::consts::FRAC_PI_3, // 60°
            wavelength: 8.0, // a little larger than c
            horizontal_rays: 0.0,
            vertical_rays: 2.0, // two planes show the PLD well
            show_transmitted: false,
            show_path_difference: false,
            wavefront_mode: WavefrontMode::None,
        }
    }
}

impl SimParams {
    pub fn validate(&self) -> Result<()> {
        self.lattice.validate()?;
        error::check_wavelength(self.wavelength)
    }
}

/// Fixed display geometry shared by every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Display units per ångström.
    pub scale_factor: f64,
    /// Crystal centre in display coordinates (y down).
    pub crystal_center: [f64; 2],
    pub top_ray_length: f64,
    /// Wave amplitude in display units.
    pub amplitude: f64,
    /// Polyline points per wavelength of a sampled wave.
    pub samples_per_wavelength: f64,
    /// On/off length of the dashed ray baseline.
    pub dash_length: f64,
    /// Half-size of the lattice window in ångström.
    pub view_extent: f64,
    pub in_phase_tolerance: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            scale_factor: constants::SCALE_FACTOR,
            crystal_center: constants::CRYSTAL_CENTER,
            top_ray_length: constants::TOP_RAY_LENGTH,
            amplitude: constants::WAVE_AMPLITUDE,
            samples_per_wavelength: constants::SAMPLES_PER_WAVELENGTH,
            dash_length: constants::DASH_LENGTH,
            view_extent: constants::VIEW_HALF_EXTENT,
            in_phase_tolerance: constants::IN_PHASE_TOLERANCE,
        }
    }
}

/// One fully recomputed frame, consumed by the view layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimResult {
    pub bragg: BraggState,
    pub lattice: LatticeSites,
    pub rays: RayFrame,
    /// Phase of the incoming beam at its start, radians.
    pub start_phase: f64,
}

/// Run the whole pipeline from scratch: lattice sites, Bragg diagnostics,
/// ray segments.
pub fn compute(params: &SimParams, view: &ViewConfig, start_phase: f64) -> Result<SimResult> {
    params.validate()?;
    let lattice = Lattice::with_extent(params.lattice, params.orientation, view.view_extent)?;
    compute_frame(&lattice, params, view, start_phase)
}

/// Derive diagnostics and rays for an already generated lattice.
pub fn compute_frame(
    lattice: &Lattice,
    params: &SimParams,
    view: &ViewConfig,
    start_phase: f64,
) -> Result<SimResult> {
    let constants = lattice.constants();
    let bragg = BraggState::compute(
        constants.c,
        params.source_angle,
        params.wavelength,
        view.in_phase_tolerance,
    )?;
    let rays = rays::generate_rays(
        &RayRequest {
            sites: lattice.sites(),
            constants,
            source_angle: params.source_angle,
            wavelength: params.wavelength,
            horizontal_rays: params.horizontal_rays,
            vertical_rays: params.vertical_rays,
            start_phase,
            show_transmitted: params.show_transmitted,
            show_path_difference: params.show_path_difference,
            wavefront_mode: params.wavefront_mode,
        },
        view,
    )?;
    Ok(SimResult {
        bragg,
        lattice: lattice.sites().clone(),
        rays,
        start_phase,
    })
}
