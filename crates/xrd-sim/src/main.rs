use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{info, warn};
use xrd_core::bragg::{bragg_angles, BraggState};
use xrd_core::constants::MANUAL_STEP;
use xrd_core::model::DiffractionModel;
use xrd_core::rays::RayKind;
use xrd_core::wave::WavefrontMode;
use xrd_core::{SimParams, ViewConfig};

#[derive(Parser)]
#[command(name = "xrd-sim")]
#[command(about = "Headless driver for the X-ray diffraction kernel")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with simulation parameters; missing fields use defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Incident angle in degrees
    #[arg(long, global = true)]
    angle_deg: Option<f64>,

    /// Wavelength in ångström
    #[arg(long, global = true)]
    wavelength: Option<f64>,

    /// In-plane lattice constant a in ångström
    #[arg(short = 'a', global = true)]
    a: Option<f64>,

    /// Interplane spacing c in ångström
    #[arg(short = 'c', global = true)]
    c: Option<f64>,

    /// Crystal orientation in degrees
    #[arg(long, global = true)]
    orientation_deg: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the path length difference and Bragg condition
    Diagnostics,
    /// Sweep the incident angle and mark in-phase angles
    Scan {
        #[arg(long, default_value_t = 0.0)]
        from_deg: f64,
        #[arg(long, default_value_t = 90.0)]
        to_deg: f64,
        #[arg(long, default_value_t = 90)]
        steps: usize,
    },
    /// Compute one frame and write it as JSON
    Frame {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 0.0)]
        horizontal: f64,
        #[arg(long, default_value_t = 2.0)]
        vertical: f64,
        #[arg(long)]
        transmitted: bool,
        #[arg(long)]
        path_difference: bool,
        #[arg(long, value_enum, default_value_t = Wavefronts::None)]
        wavefronts: Wavefronts,
    },
    /// Advance the beam phase and report the top reflected ray
    Animate {
        #[arg(long, default_value_t = 10)]
        ticks: usize,
        #[arg(long, default_value_t = MANUAL_STEP)]
        dt: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Wavefronts {
    None,
    Grayscale,
    Rainbow,
}

impl From<Wavefronts> for WavefrontMode {
    fn from(w: Wavefronts) -> Self {
        match w {
            Wavefronts::None => WavefrontMode::None,
            Wavefronts::Grayscale => WavefrontMode::Grayscale,
            Wavefronts::Rainbow => WavefrontMode::Rainbow,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let params = load_params(&cli)?;
    let view = ViewConfig::default();

    match &cli.command {
        Commands::Diagnostics => {
            let state = BraggState::compute(
                params.lattice.c,
                params.source_angle,
                params.wavelength,
                view.in_phase_tolerance,
            )?;
            print_state(&params, &state);
        }
        Commands::Scan {
            from_deg,
            to_deg,
            steps,
        } => scan(&params, &view, *from_deg, *to_deg, *steps)?,
        Commands::Frame {
            output,
            horizontal,
            vertical,
            transmitted,
            path_difference,
            wavefronts,
        } => {
            let mut model = DiffractionModel::new(params, view)?;
            model.set_ray_counts(*horizontal, *vertical);
            model.set_show_transmitted(*transmitted);
            model.set_show_path_difference(*path_difference);
            model.set_wavefront_mode((*wavefronts).into());
            let frame = model.frame()?;
            let json = serde_json::to_string_pretty(&frame)?;
            match output {
                Some(path) => {
                    fs::write(path, json)
                        .with_context(|| format!("writing frame to {}", path.display()))?;
                    info!(
                        "wrote {} segments to {}",
                        frame.rays.segments.len(),
                        path.display()
                    );
                }
                None => println!("{json}"),
            }
        }
        Commands::Animate { ticks, dt } => {
            let mut model = DiffractionModel::new(params, view)?;
            model.set_animating(true);
            for tick in 0..*ticks {
                model.tick(*dt);
                let frame = model.frame()?;
                let reflected_phase = frame
                    .rays
                    .segments_of(RayKind::Reflected)
                    .next()
                    .map(|s| s.start_phase)
                    .unwrap_or(f64::NAN);
                info!(
                    "tick {tick}: start phase {:+.4} rad, top reflected phase {:+.4} rad",
                    frame.start_phase, reflected_phase
                );
            }
        }
    }

    Ok(())
}

fn load_params(cli: &Cli) -> anyhow::Result<SimParams> {
    let mut params = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            parse_params(&text).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SimParams::default(),
    };
    if let Some(angle) = cli.angle_deg {
        params.source_angle = angle.to_radians();
    }
    if let Some(wavelength) = cli.wavelength {
        params.wavelength = wavelength;
    }
    if let Some(a) = cli.a {
        params.lattice.a = a;
    }
    if let Some(c) = cli.c {
        params.lattice.c = c;
    }
    if let Some(orientation) = cli.orientation_deg {
        params.orientation = orientation.to_radians();
    }
    params.validate()?;
    Ok(params)
}

fn parse_params(text: &str) -> anyhow::Result<SimParams> {
    Ok(serde_json::from_str(text)?)
}

fn print_state(params: &SimParams, state: &BraggState) {
    println!(
        "θ = {:.1}°  λ = {:.2} Å  a = {:.2} Å  c = {:.2} Å",
        params.source_angle.to_degrees(),
        params.wavelength,
        params.lattice.a,
        params.lattice.c
    );
    println!("2d sin(θ)   = {:.2} Å", state.pld);
    println!("2d sin(θ)/λ = {:.3}", state.pld_in_wavelengths);
    if state.in_phase {
        println!("in phase: {} wavelengths", state.order);
    } else {
        println!("not in phase");
    }
}

fn scan(
    params: &SimParams,
    view: &ViewConfig,
    from_deg: f64,
    to_deg: f64,
    steps: usize,
) -> anyhow::Result<()> {
    if steps == 0 {
        warn!("scan with zero steps, nothing to do");
        return Ok(());
    }
    let c = params.lattice.c;
    for k in 0..=steps {
        let deg = from_deg + (to_deg - from_deg) * k as f64 / steps as f64;
        let state = BraggState::compute(c, deg.to_radians(), params.wavelength, view.in_phase_tolerance)?;
        let mark = if state.in_phase { "  <- in phase" } else { "" };
        println!("{deg:7.2}°  {:8.3}{mark}", state.pld_in_wavelengths);
    }
    for angle in bragg_angles(c, params.wavelength)? {
        println!("order {}: θ = {:.2}°", angle.order, angle.angle.to_degrees());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let params = parse_params(r#"{ "wavelength": 13.51, "wavefront_mode": "grayscale" }"#).unwrap();
        assert_eq!(params.wavelength, 13.51);
        assert_eq!(params.wavefront_mode, WavefrontMode::Grayscale);
        assert_eq!(params.lattice, SimParams::default().lattice);
        assert_eq!(params.vertical_rays, 2.0);
    }

    #[test]
    fn test_lattice_config_round_trips() {
        let params = parse_params(r#"{ "lattice": { "a": 5.0, "b": 5.0, "c": 9.0 } }"#).unwrap();
        assert_eq!(params.lattice.c, 9.0);
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(parse_params(&json).unwrap(), params);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from(["xrd-sim", "--angle-deg", "30", "-c", "10", "diagnostics"]);
        let params = load_params(&cli).unwrap();
        assert!((params.source_angle - 30f64.to_radians()).abs() < 1e-12);
        assert_eq!(params.lattice.c, 10.0);
    }

    #[test]
    fn test_cli_rejects_zero_wavelength() {
        let cli = Cli::parse_from(["xrd-sim", "--wavelength", "0", "diagnostics"]);
        assert!(load_params(&cli).is_err());
    }
}
