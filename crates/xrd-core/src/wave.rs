use std::f64::consts::TAU;

use nalgebra::{Point2, Vector2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::constants::{DASH_LENGTH, SAMPLES_PER_WAVELENGTH};
use crate::error::{check_wavelength, Result};

/// Which wavefront markers to draw on each ray.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WavefrontMode {
    #[default]
    None,
    /// Three-level gray cycle.
    Grayscale,
    /// Six-hue colour cycle.
    Rainbow,
}

impl WavefrontMode {
    pub fn palette(self) -> Option<WavefrontPalette> {
        match self {
            WavefrontMode::None => None,
            WavefrontMode::Grayscale => Some(WavefrontPalette::Grayscale),
            WavefrontMode::Rainbow => Some(WavefrontPalette::Rainbow),
        }
    }
}

/// Colour cycle applied to successive wavefronts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WavefrontPalette {
    /// Lightness 0 %, 40 %, 80 % by `index mod 3`.
    Grayscale,
    /// Hue `60°·index`, six distinct colours.
    #[default]
    Rainbow,
}

impl WavefrontPalette {
    pub fn color(self, index: i64) -> Hsl {
        match self {
            WavefrontPalette::Grayscale => Hsl {
                hue: 0.0,
                saturation: 0.0,
                lightness: 0.4 * index.rem_euclid(3) as f64,
            },
            WavefrontPalette::Rainbow => Hsl {
                hue: (60 * index.rem_euclid(6)) as f64,
                saturation: 1.0,
                lightness: 0.5,
            },
        }
    }
}

/// HSL colour; hue in degrees, saturation and lightness in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
}

impl Hsl {
    pub fn to_rgb(self) -> [u8; 3] {
        let chroma = (1.0 - (2.0 * self.lightness - 1.0).abs()) * self.saturation;
        let sector = self.hue.rem_euclid(360.0) / 60.0;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let (r, g, b) = match sector as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = self.lightness - chroma / 2.0;
        let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        [channel(r), channel(g), channel(b)]
    }
}

/// Wavefront marker settings for one ray. A width of zero disables markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WavefrontStyle {
    pub width: f64,
    pub palette: WavefrontPalette,
}

impl WavefrontStyle {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Polyline resolution and baseline dash pattern of a sampled wave.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveSampling {
    pub samples_per_wavelength: f64,
    pub dash_length: f64,
}

impl Default for WaveSampling {
    fn default() -> Self {
        Self {
            samples_per_wavelength: SAMPLES_PER_WAVELENGTH,
            dash_length: DASH_LENGTH,
        }
    }
}

/// Straight dashed centre line of a ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub start: Point2<f64>,
    pub end: Point2<f64>,
    pub dash_length: f64,
}

impl Baseline {
    /// The visible dashes of an equal on/off pattern, clipped to `end`.
    pub fn dashes(&self) -> Vec<(Point2<f64>, Point2<f64>)> {
        let offset = self.end - self.start;
        let length = offset.norm();
        if length == 0.0 || self.dash_length <= 0.0 {
            return Vec::new();
        }
        let direction = offset / length;
        let mut dashes = Vec::new();
        let mut from = 0.0;
        while from < length {
            let to = (from + self.dash_length).min(length);
            dashes.push((self.start + direction * from, self.start + direction * to));
            from += 2.0 * self.dash_length;
        }
        dashes
    }
}

/// A short transverse tick marking a surface of constant phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavefrontMarker {
    /// Whole number of wavelengths this wavefront is behind phase zero.
    pub index: i64,
    pub from: Point2<f64>,
    pub to: Point2<f64>,
    pub color: Hsl,
}

impl WavefrontMarker {
    pub fn center(&self) -> Point2<f64> {
        nalgebra::center(&self.from, &self.to)
    }
}

/// Renderable point sequences for one ray.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waveform {
    pub baseline: Baseline,
    pub points: Vec<Point2<f64>>,
    pub wavefronts: Vec<WavefrontMarker>,
}

/// Sample a sinusoid of `wavelength` running from `start` to `end` at the
/// default resolution. See [`sample_wave_with`].
pub fn sample_wave(
    start: Point2<f64>,
    end: Point2<f64>,
    wavelength: f64,
    amplitude: f64,
    start_phase: f64,
    markers: WavefrontStyle,
) -> Result<Waveform> {
    sample_wave_with(
        start,
        end,
        wavelength,
        amplitude,
        start_phase,
        markers,
        WaveSampling::default(),
    )
}

/// Sample a sinusoid of `wavelength` running from `start` to `end`.
///
/// The wave has `round(length / λ · samples_per_wavelength)` sample points, displaced
/// transversely by `amplitude · cos(2π/λ · l + start_phase)` at distance `l`
/// along the ray. With a non-zero marker width, one marker is placed at
/// every whole wavefront crossed, starting at the first integer
/// `≥ start_phase / 2π`.
pub fn sample_wave_with(
    start: Point2<f64>,
    end: Point2<f64>,
    wavelength: f64,
    amplitude: f64,
    start_phase: f64,
    markers: WavefrontStyle,
    sampling: WaveSampling,
) -> Result<Waveform> {
    check_wavelength(wavelength)?;

    let baseline = Baseline {
        start,
        end,
        dash_length: sampling.dash_length,
    };
    let offset = end - start;
    let length = offset.norm();
    if length == 0.0 {
        return Ok(Waveform {
            baseline,
            points: Vec::new(),
            wavefronts: Vec::new(),
        });
    }

    let direction = offset / length;
    // Left-hand normal; (sin θ, −cos θ) for a ray at angle θ.
    let normal = Vector2::new(direction.y, -direction.x);
    let wave_number = TAU / wavelength;

    let segments = (length / wavelength * sampling.samples_per_wavelength)
        .round()
        .max(0.0) as usize;
    let step = if segments > 1 {
        length / (segments - 1) as f64
    } else {
        0.0
    };
    let points = (0..segments)
        .map(|k| {
            let along = k as f64 * step;
            let displacement = Complex64::from_polar(amplitude, wave_number * along + start_phase).re;
            start + direction * along + normal * displacement
        })
        .collect();

    let mut wavefronts = Vec::new();
    if markers.width > 0.0 {
        let first = start_phase / TAU;
        let half_width = normal * (markers.width / 2.0);
        let mut index = first.ceil();
        while index < first + length / wavelength {
            let center = start + direction * ((index - first) * wavelength);
            let index_i = index as i64;
            wavefronts.push(WavefrontMarker {
                index: index_i,
                from: center + half_width,
                to: center - half_width,
                color: markers.palette.color(index_i),
            });
            index += 1.0;
        }
    }

    Ok(Waveform {
        baseline,
        points,
        wavefronts,
    })
}
