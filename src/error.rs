//! Error taxonomy.
//!
//! Only configuration mistakes are errors: invalid construction or setter
//! parameters fail fast here. Everything transient (zero scaled radius,
//! empty bounds, offset past the surface edge) degrades to "paint nothing"
//! and never surfaces as an error.

use std::fmt::{self, Display};

/// A configuration error raised at construction or setter time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlurError {
    /// Blur radius must be >= 0.
    InvalidRadius(i32),
    /// Downscale factor must be >= 1.
    InvalidDownscale(i32),
    /// Outline corner radii must be finite and >= 0.
    InvalidOutline(f32),
    /// The source surface reported no scroll capability information.
    MissingScrollAxes,
}

impl Display for BlurError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlurError::InvalidRadius(r) => write!(f, "invalid blur radius: {r}"),
            BlurError::InvalidDownscale(d) => write!(f, "invalid downscale factor: {d}"),
            BlurError::InvalidOutline(r) => write!(f, "invalid outline corner radius: {r}"),
            BlurError::MissingScrollAxes => {
                write!(f, "source surface reports no scroll capability")
            }
        }
    }
}

impl std::error::Error for BlurError {}
