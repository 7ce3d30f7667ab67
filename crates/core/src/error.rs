//! Error types for the soil infiltration and routing model
//!
//! Configuration errors are detected when cells are built. Numerical
//! non-convergence is reported per cell-step and is never replaced by a stale
//! value. Reservoir overflow is not an error: the routing cascade resolves it.

use thiserror::Error;

/// Result alias used throughout the crate
pub type SoilResult<T> = Result<T, SoilError>;

/// Soil model error
#[derive(Error, Debug)]
pub enum SoilError {
    /// Missing or out-of-range configuration value
    #[error("invalid parameter '{name}' = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("unknown soil type id {0} (expected 0-12)")]
    UnknownSoilType(u8),

    #[error("unknown Ayers texture id {0} (expected 0-3)")]
    UnknownTexture(u8),

    #[error("unknown Ayers ground cover id {0} (expected 0-5)")]
    UnknownCover(u8),

    /// Green-Ampt implicit solve did not settle within the iteration bound
    #[error("Green-Ampt did not converge after {iterations} iterations (change {residual:.6} mm)")]
    NonConvergence { iterations: usize, residual: f64 },

    /// A cell-step failed; carries the cell index for domain runs
    #[error("cell {cell}: {source}")]
    Cell {
        cell: usize,
        #[source]
        source: Box<SoilError>,
    },

    #[error("forcing has {actual} entries but the domain has {expected} cells")]
    ForcingLength { expected: usize, actual: usize },

    #[error("snapshot does not match domain: {0}")]
    Snapshot(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SoilError {
    /// Shorthand for [`SoilError::InvalidParameter`]
    pub fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        SoilError::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    /// Attach a cell index to an error raised while stepping that cell
    pub fn in_cell(self, cell: usize) -> Self {
        SoilError::Cell {
            cell,
            source: Box::new(self),
        }
    }
}

/// Check a value is finite and `>= 0`
pub(crate) fn require_non_negative(name: &'static str, value: f64) -> SoilResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SoilError::invalid(name, value, "must be finite and non-negative"))
    }
}

/// Check a value is a fraction in `[0, 1]`
pub(crate) fn require_fraction(name: &'static str, value: f64) -> SoilResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SoilError::invalid(name, value, "must be within [0, 1]"))
    }
}
