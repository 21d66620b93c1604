use std::f64::consts::TAU;

use log::{debug, trace};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::bragg::BraggState;
use crate::constants::ray_separation;
use crate::error::{check_wavelength, Result};
use crate::lattice::{LatticeConstants, LatticeSites};
use crate::wave::{sample_wave_with, WaveSampling, Waveform, WavefrontMode, WavefrontStyle};
use crate::ViewConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RayKind {
    Incident,
    Reflected,
    Transmitted,
}

/// One straight leg of a light path, in display coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaySegment {
    pub kind: RayKind,
    /// Horizontal grid index, `-H..=H`.
    pub i: i32,
    /// Vertical grid index (lattice plane), `0..V`.
    pub j: u32,
    pub start: Point2<f64>,
    pub end: Point2<f64>,
    /// Wavelength in display units.
    pub wavelength: f64,
    pub amplitude: f64,
    /// Phase at `start`, radians.
    pub start_phase: f64,
    pub wavefronts: WavefrontStyle,
    pub sampling: WaveSampling,
    /// Drawn bolder; set on reflected rays when the Bragg condition holds.
    pub emphasized: bool,
}

impl RaySegment {
    pub fn length(&self) -> f64 {
        nalgebra::distance(&self.start, &self.end)
    }

    pub fn waveform(&self) -> Result<Waveform> {
        sample_wave_with(
            self.start,
            self.end,
            self.wavelength,
            self.amplitude,
            self.start_phase,
            self.wavefronts,
            self.sampling,
        )
    }
}

/// Number of rays actually drawn after clamping to the populated lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RayGrid {
    /// Rays on each side of the centre column.
    pub horizontal: u32,
    /// Lattice planes hit, counting down from the anchor plane.
    pub vertical: u32,
}

impl RayGrid {
    /// `H = floor(min(h, extent/a))`, `V = min(floor(v), 1 + 2·floor(extent/c))`.
    /// Negative or NaN requests become zero.
    pub fn clamped(
        requested_horizontal: f64,
        requested_vertical: f64,
        constants: &LatticeConstants,
        view_extent: f64,
    ) -> Self {
        let sanitize = |v: f64| if v.is_nan() { 0.0 } else { v.max(0.0) };
        let horizontal = sanitize(requested_horizontal)
            .min(view_extent / constants.a)
            .floor();
        let max_vertical = 1.0 + 2.0 * (view_extent / constants.c).floor();
        let vertical = sanitize(requested_vertical).floor().min(max_vertical);
        Self {
            horizontal: horizontal.max(0.0) as u32,
            vertical: vertical.max(0.0) as u32,
        }
    }

    /// Grid cells `(2H+1)·V`.
    pub fn cells(&self) -> usize {
        (2 * self.horizontal as usize + 1) * self.vertical as usize
    }

    pub fn segment_count(&self, show_transmitted: bool) -> usize {
        let legs = if show_transmitted { 3 } else { 2 };
        self.cells() * legs
    }
}

/// Shaded overlay showing the extra path `d·sin θ` on each side of the
/// anchor plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDifferenceRegion {
    /// Outline: incoming foot, anchor, outgoing foot.
    pub outline: [Point2<f64>; 3],
    /// Incoming and outgoing shaded wedges.
    pub wedges: [[Point2<f64>; 4]; 2],
    pub arrow_start: Point2<f64>,
    pub arrow_end: Point2<f64>,
    /// Left-centre of the "d sin(θ)" label.
    pub label_center: Point2<f64>,
}

/// Placement of the in-phase message above the top outgoing ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InPhaseLabel {
    pub center: Point2<f64>,
    /// Radians; aligns the text with the outgoing ray.
    pub rotation: f64,
    /// Whole wavelengths of path difference.
    pub order: i64,
}

/// Everything the view needs to draw the light paths of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayFrame {
    pub grid: RayGrid,
    /// Per grid cell, in order: incident, reflected, optional transmitted.
    pub segments: Vec<RaySegment>,
    pub path_difference: Option<PathDifferenceRegion>,
    pub in_phase_label: Option<InPhaseLabel>,
}

impl RayFrame {
    pub fn segments_of(&self, kind: RayKind) -> impl Iterator<Item = &RaySegment> {
        self.segments.iter().filter(move |s| s.kind == kind)
    }

    pub fn waveforms(&self) -> Result<Vec<Waveform>> {
        self.segments.iter().map(RaySegment::waveform).collect()
    }
}

/// Inputs to [`generate_rays`].
#[derive(Debug, Clone, Copy)]
pub struct RayRequest<'a> {
    pub sites: &'a LatticeSites,
    pub constants: &'a LatticeConstants,
    /// Incident angle θ_in, radians.
    pub source_angle: f64,
    /// Wavelength in ångström.
    pub wavelength: f64,
    pub horizontal_rays: f64,
    pub vertical_rays: f64,
    pub start_phase: f64,
    pub show_transmitted: bool,
    pub show_path_difference: bool,
    pub wavefront_mode: WavefrontMode,
}

/// Build the incident, reflected and transmitted ray segments for every
/// cell of the clamped ray grid, plus the optional overlays.
///
/// Display coordinates have y pointing down. The top incident ray ends at
/// the anchor site and starts `top_ray_length` back along `(cos θ, sin θ)`.
/// Each deeper plane adds exactly `2·c·sin θ` (scaled) to the incident plus
/// reflected path.
pub fn generate_rays(request: &RayRequest<'_>, view: &ViewConfig) -> Result<RayFrame> {
    check_wavelength(request.wavelength)?;
    request.constants.validate()?;

    let theta = request.source_angle;
    let (sin, cos) = theta.sin_cos();
    let scale = view.scale_factor;
    let a = request.constants.a;
    let c = request.constants.c;
    let bragg = BraggState::compute(c, theta, request.wavelength, view.in_phase_tolerance)?;
    let sampling = WaveSampling {
        samples_per_wavelength: view.samples_per_wavelength,
        dash_length: view.dash_length,
    };
    let wavelength = scale * request.wavelength;
    let separation = scale * ray_separation(c, theta);
    let incident_direction = Vector2::new(cos, sin);

    let top_end = Point2::from(view.crystal_center) - request.sites.anchor.coords * scale;
    let top_start = top_end - incident_direction * view.top_ray_length;

    let grid = RayGrid::clamped(
        request.horizontal_rays,
        request.vertical_rays,
        request.constants,
        view.view_extent,
    );
    if (grid.horizontal as f64) < request.horizontal_rays.floor()
        || (grid.vertical as f64) < request.vertical_rays.floor()
    {
        debug!(
            "ray grid clamped from ({}, {}) to ({}, {})",
            request.horizontal_rays, request.vertical_rays, grid.horizontal, grid.vertical
        );
    }

    let wavefronts = match request.wavefront_mode.palette() {
        Some(palette) => WavefrontStyle {
            width: view.amplitude.max(separation - 2.0),
            palette,
        },
        None => WavefrontStyle::none(),
    };
    let segment = |kind: RayKind,
                   i: i32,
                   j: u32,
                   start: Point2<f64>,
                   end: Point2<f64>,
                   start_phase: f64,
                   emphasized: bool| RaySegment {
        kind,
        i,
        j,
        start,
        end,
        wavelength,
        amplitude: view.amplitude,
        start_phase,
        wavefronts,
        sampling,
        emphasized,
    };

    let h = grid.horizontal as i32;
    let mut segments = Vec::with_capacity(grid.segment_count(request.show_transmitted));
    for i in -h..=h {
        for j in 0..grid.vertical {
            let fi = i as f64;
            let fj = j as f64;
            let shift = Vector2::new(scale * fi * a, -scale * fj * c);
            let distance = scale * (fi * a * sin + fj * c * cos);

            let start = top_start + Vector2::new(-distance * sin, distance * cos);
            let end = top_end - shift;
            let incident_length = (end - start).norm();
            let exit_phase = incident_length / wavelength * TAU + request.start_phase;

            // Horizontal neighbours are offset along the beam; the reflected
            // leg absorbs that offset to end on a common wavefront.
            let extra = 2.0 * scale * cos * fi * a;
            let exit_end = Point2::new(
                2.0 * end.x - start.x + extra * cos,
                start.y - extra * sin,
            );

            segments.push(segment(RayKind::Incident, i, j, start, end, request.start_phase, false));
            segments.push(segment(
                RayKind::Reflected,
                i,
                j,
                end,
                exit_end,
                exit_phase,
                bragg.in_phase,
            ));
            if request.show_transmitted {
                let transmitted_end =
                    end + incident_direction * (2.0 * view.top_ray_length - incident_length);
                segments.push(segment(
                    RayKind::Transmitted,
                    i,
                    j,
                    end,
                    transmitted_end,
                    exit_phase,
                    false,
                ));
            }
        }
    }

    let path_difference = request
        .show_path_difference
        .then(|| path_difference_region(top_end, theta, scale * c, separation, view.amplitude));

    let in_phase_label = bragg.in_phase.then(|| {
        let lift = if wavefronts.width > 0.0 {
            separation / 2.0 + view.amplitude
        } else {
            2.2 * view.amplitude
        };
        let ray_middle = top_end + Vector2::new(cos, -sin) * (view.top_ray_length / 2.0);
        InPhaseLabel {
            center: ray_middle + Vector2::new(-sin, -cos) * lift,
            rotation: -theta,
            order: bragg.order,
        }
    });

    trace!(
        "generated {} ray segments on a {}x{} grid",
        segments.len(),
        2 * grid.horizontal + 1,
        grid.vertical
    );

    Ok(RayFrame {
        grid,
        segments,
        path_difference,
        in_phase_label,
    })
}

/// Overlay geometry anchored at the top incident ray's end. `spacing` is the
/// scaled interplane distance, `separation` the scaled ray separation.
fn path_difference_region(
    anchor: Point2<f64>,
    theta: f64,
    spacing: f64,
    separation: f64,
    amplitude: f64,
) -> PathDifferenceRegion {
    let (sin, cos) = theta.sin_cos();
    let d_sin = spacing * sin;
    let reach = amplitude + separation;

    let in_foot = anchor + Vector2::new(-reach * sin, reach * cos);
    let out_foot = anchor + Vector2::new(reach * sin, reach * cos);

    let across = Vector2::new(2.0 * amplitude * sin, -2.0 * amplitude * cos);
    let along_in = Vector2::new(d_sin * cos, d_sin * sin);
    let along_out = Vector2::new(-d_sin * cos, d_sin * sin);
    let across_out = Vector2::new(-across.x, across.y);

    let wedge_in = [
        in_foot,
        in_foot + along_in,
        in_foot + along_in + across,
        in_foot + across,
    ];
    let wedge_out = [
        out_foot,
        out_foot + along_out,
        out_foot + along_out + across_out,
        out_foot + across_out,
    ];

    let arrow_start = anchor + Vector2::new(sin, cos) * (5.0 + reach);
    let arrow_end = arrow_start + along_out;
    let label_center = arrow_start + Vector2::new(5.0 * sin - d_sin * cos / 2.0, 5.0 * cos + d_sin * sin / 2.0);

    PathDifferenceRegion {
        outline: [in_foot, anchor, out_foot],
        wedges: [wedge_in, wedge_out],
        arrow_start,
        arrow_end,
        label_center,
    }
}
