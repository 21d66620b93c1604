//! CLI harness for the diffraction kernel.
//!
//! Builds the default YBCO crystal, prints the Bragg diagnostics at 60°,
//! retunes the wavelength onto the first-order condition and animates a
//! few steps of the beam.
//!
//! Run with:
//!   cargo run -p xrd-core --example bragg_condition

use xrd_core::bragg::bragg_angles;
use xrd_core::constants::MANUAL_STEP;
use xrd_core::model::DiffractionModel;
use xrd_core::{SimParams, ViewConfig};

fn main() -> xrd_core::Result<()> {
    println!("=== Bragg Condition ===");

    // 1. Default crystal and source.
    let params = SimParams::default();
    let mut model = DiffractionModel::new(params.clone(), ViewConfig::default())?;
    println!(
        "a={} Å, c={} Å, θ={:.1}°, λ={} Å",
        params.lattice.a,
        params.lattice.c,
        params.source_angle.to_degrees(),
        params.wavelength
    );

    let state = model.diagnostics()?;
    println!(
        "2d sin(θ) = {:.2} Å, 2d sin(θ)/λ = {:.3}, in phase: {}",
        state.pld, state.pld_in_wavelengths, state.in_phase
    );

    // 2. Tune λ to the path length difference: first order.
    model.set_wavelength(state.pld)?;
    let state = model.diagnostics()?;
    println!(
        "λ → {:.2} Å: 2d sin(θ)/λ = {:.3}, in phase: {} (order {})",
        state.pld, state.pld_in_wavelengths, state.in_phase, state.order
    );

    // 3. Where else would this wavelength diffract?
    let wavelength = model.params().wavelength;
    for angle in bragg_angles(params.lattice.c, wavelength)? {
        println!(
            "λ = {:.2} Å, order {}: θ = {:.2}°",
            wavelength,
            angle.order,
            angle.angle.to_degrees()
        );
    }

    // 4. A few animation steps.
    model.set_ray_counts(1.0, 3.0);
    for _ in 0..3 {
        model.step(MANUAL_STEP);
        let frame = model.frame()?;
        println!(
            "phase {:+.3} rad, {} segments",
            frame.start_phase,
            frame.rays.segments.len()
        );
    }

    println!("Done.");
    Ok(())
}
