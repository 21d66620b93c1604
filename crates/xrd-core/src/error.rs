use thiserror::Error;

/// Errors surfaced by the diffraction kernel. Every variant is a
/// configuration error on the caller's side; nothing here is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XrdError {
    #[error("division by a zero wavelength is undefined")]
    DivisionUndefined,

    #[error("lattice constant {name} must be positive and finite, got {value}")]
    InvalidLatticeConstant { name: &'static str, value: f64 },

    #[error("wavelength must be positive and finite, got {0}")]
    InvalidWavelength(f64),
}

/// Common result type used throughout the crate.
pub type Result<T> = std::result::Result<T, XrdError>;

/// Reject wavelengths the kernel cannot divide by.
pub fn check_wavelength(wavelength: f64) -> Result<()> {
    if wavelength == 0.0 {
        Err(XrdError::DivisionUndefined)
    } else if !wavelength.is_finite() || wavelength < 0.0 {
        Err(XrdError::InvalidWavelength(wavelength))
    } else {
        Ok(())
    }
}
