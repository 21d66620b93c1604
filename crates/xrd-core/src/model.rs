use log::debug;

use crate::bragg::BraggState;
use crate::constants::PHASE_SPEED;
use crate::error::{check_wavelength, Result};
use crate::lattice::Lattice;
use crate::wave::WavefrontMode;
use crate::{compute_frame, SimParams, SimResult, ViewConfig};

/// The simulation state behind the controls.
///
/// Setters only store inputs (regenerating the lattice when it changes);
/// [`DiffractionModel::frame`] recomputes everything downstream on demand.
#[derive(Debug, Clone)]
pub struct DiffractionModel {
    params: SimParams,
    view: ViewConfig,
    lattice: Lattice,
    /// Phase of the incoming beam, advanced by the clock.
    start_phase: f64,
    animating: bool,
}

impl DiffractionModel {
    pub fn new(params: SimParams, view: ViewConfig) -> Result<Self> {
        params.validate()?;
        let lattice = Lattice::with_extent(params.lattice, params.orientation, view.view_extent)?;
        Ok(Self {
            params,
            view,
            lattice,
            start_phase: 0.0,
            animating: false,
        })
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn view(&self) -> &ViewConfig {
        &self.view
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn start_phase(&self) -> f64 {
        self.start_phase
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn set_lattice_constants(&mut self, a: f64, c: f64) -> Result<()> {
        self.lattice.set_constants(a, c)?;
        self.params.lattice = *self.lattice.constants();
        Ok(())
    }

    pub fn set_orientation(&mut self, orientation: f64) -> Result<()> {
        self.lattice.set_orientation(orientation)?;
        self.params.orientation = orientation;
        Ok(())
    }

    pub fn set_source_angle(&mut self, source_angle: f64) {
        self.params.source_angle = source_angle;
    }

    /// Rejects λ ≤ 0 so that later frames cannot fail on it.
    pub fn set_wavelength(&mut self, wavelength: f64) -> Result<()> {
        check_wavelength(wavelength)?;
        self.params.wavelength = wavelength;
        Ok(())
    }

    /// Requested counts; clamped when the frame is generated.
    pub fn set_ray_counts(&mut self, horizontal: f64, vertical: f64) {
        self.params.horizontal_rays = horizontal;
        self.params.vertical_rays = vertical;
    }

    pub fn set_show_transmitted(&mut self, show: bool) {
        self.params.show_transmitted = show;
    }

    pub fn set_show_path_difference(&mut self, show: bool) {
        self.params.show_path_difference = show;
    }

    pub fn set_wavefront_mode(&mut self, mode: WavefrontMode) {
        self.params.wavefront_mode = mode;
    }

    pub fn set_animating(&mut self, animating: bool) {
        self.animating = animating;
    }

    /// Advance the beam by `dt` seconds regardless of the play state.
    pub fn step(&mut self, dt: f64) {
        self.start_phase -= PHASE_SPEED / self.params.wavelength * dt;
    }

    /// Clock tick: advances only while animating. Returns whether the
    /// phase moved and a new frame is due.
    pub fn tick(&mut self, dt: f64) -> bool {
        if self.animating {
            self.step(dt);
        }
        self.animating
    }

    pub fn diagnostics(&self) -> Result<BraggState> {
        BraggState::compute(
            self.lattice.constants().c,
            self.params.source_angle,
            self.params.wavelength,
            self.view.in_phase_tolerance,
        )
    }

    /// Recompute the full frame from the current inputs.
    pub fn frame(&self) -> Result<SimResult> {
        compute_frame(&self.lattice, &self.params, &self.view, self.start_phase)
    }

    /// Restore default parameters, the default sample and phase zero.
    pub fn reset(&mut self) -> Result<()> {
        self.lattice.reset()?;
        self.params = SimParams::default();
        self.start_phase = 0.0;
        self.animating = false;
        debug!("model reset to defaults");
        Ok(())
    }
}
