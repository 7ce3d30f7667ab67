//! Green-Ampt Infiltration with Ponding-Time Detection
//!
//! Cumulative infiltration `F` obeys the implicit Green-Ampt relation
//!
//! `F₁ = F₀ + K·Δt + ψΔθ·ln((F₁ + ψΔθ) / (F₀ + ψΔθ))`
//!
//! solved by fixed-point iteration. When rainfall intensity exceeds the
//! infiltration rate partway through a step, the ponding point is found and the
//! implicit relation is applied only over the ponded remainder of the step.
//!
//! # Scientific References
//! - Green, W.H., Ampt, G.A. (1911). "Studies on soil physics: 1. The flow of
//!   air and water through soils". Journal of Agricultural Science, 4, 1-24
//! - Mein, R.G., Larson, C.L. (1973). "Modeling infiltration during a steady
//!   rain". Water Resources Research, 9(2), 384-394
//! - Chow, V.T., Maidment, D.R., Mays, L.W. (1988). "Applied Hydrology",
//!   Section 4.4, McGraw-Hill

use crate::error::{SoilError, SoilResult};
use tracing::debug;

/// Fixed-point convergence tolerance on cumulative infiltration (mm)
pub const CONVERGENCE_TOLERANCE: f64 = 0.001;

/// Iteration bound for the implicit solve
pub const MAX_ITERATIONS: usize = 1000;

/// Green-Ampt soil description for one column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreenAmptSoil {
    /// Saturated hydraulic conductivity (mm/h)
    pub saturated_conductivity: f64,
    /// Wetting-front suction head (mm)
    pub air_entry_suction: f64,
    /// Soil moisture capacity (mm)
    pub max_storage: f64,
    /// Sealed surface: everything runs off
    pub is_pavement: bool,
}

/// Working values for one step, kept on the stack
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GreenAmptStep {
    /// Rainfall intensity (mm/h)
    pub intensity: f64,
    /// Fractional storage deficit (1 − S/Smax)
    pub storage_deficit: f64,
    /// Capillary suction ψΔθ (mm)
    pub capillary_suction: f64,
    /// Cumulative infiltration at step start (mm)
    pub initial_storage: f64,
    /// Infiltration rate at step start (mm/h)
    pub initial_rate: f64,
    /// Cumulative infiltration at step end (mm)
    pub final_storage: f64,
    /// Cumulative infiltration when ponding began (mm)
    pub storage_at_ponding: Option<f64>,
    /// Hours into the step when ponding began
    pub time_to_ponding: Option<f64>,
    /// Rain that did not enter the soil (mm)
    pub pond: f64,
}

/// Split of one step's rainfall (mm)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GreenAmptOutcome {
    pub infiltration: f64,
    pub runoff: f64,
}

impl GreenAmptOutcome {
    fn all_runoff(rainfall: f64) -> Self {
        Self {
            infiltration: 0.0,
            runoff: rainfall,
        }
    }

    fn all_infiltrates(rainfall: f64) -> Self {
        Self {
            infiltration: rainfall,
            runoff: 0.0,
        }
    }
}

/// Potential infiltration rate `f = K·(ψΔθ/F + 1)`
///
/// Unbounded when nothing has infiltrated yet.
///
/// # Arguments
/// * `ksat` - Saturated hydraulic conductivity (mm/h)
/// * `suction` - Capillary suction ψΔθ (mm)
/// * `cumulative` - Cumulative infiltration F (mm)
pub fn infiltration_rate(ksat: f64, suction: f64, cumulative: f64) -> f64 {
    if cumulative <= 0.0 {
        f64::INFINITY
    } else {
        ksat * (suction / cumulative + 1.0)
    }
}

/// Solve the implicit Green-Ampt relation for cumulative infiltration after `dt_hours`
///
/// Iteration starts from `F₁ = F₀` and stops when successive estimates agree to
/// [`CONVERGENCE_TOLERANCE`].
///
/// # Errors
/// [`SoilError::NonConvergence`] if the estimates are still moving after
/// [`MAX_ITERATIONS`].
pub fn solve_cumulative_infiltration(
    initial: f64,
    ksat: f64,
    suction: f64,
    dt_hours: f64,
) -> SoilResult<f64> {
    solve_bounded(initial, ksat, suction, dt_hours, MAX_ITERATIONS).map(|(f1, _)| f1)
}

/// Fixed-point solve with an explicit iteration bound
///
/// Returns the converged estimate and the iterations used.
pub(crate) fn solve_bounded(
    initial: f64,
    ksat: f64,
    suction: f64,
    dt_hours: f64,
    max_iterations: usize,
) -> SoilResult<(f64, usize)> {
    if dt_hours <= 0.0 {
        return Ok((initial, 0));
    }
    if suction <= 0.0 {
        return Ok((initial + ksat * dt_hours, 0));
    }

    let base = initial + ksat * dt_hours;
    let mut current = initial;
    let mut change = f64::INFINITY;

    for iteration in 1..=max_iterations {
        let next = base + suction * ((current + suction) / (initial + suction)).ln();
        change = (next - current).abs();
        if change < CONVERGENCE_TOLERANCE {
            return Ok((next, iteration));
        }
        current = next;
    }

    Err(SoilError::NonConvergence {
        iterations: max_iterations,
        residual: change,
    })
}

impl GreenAmptStep {
    /// Resolve the step, recording the ponding point if one is reached
    fn resolve(
        soil: &GreenAmptSoil,
        storage: f64,
        rainfall: f64,
        dt_hours: f64,
    ) -> SoilResult<Self> {
        let ksat = soil.saturated_conductivity;
        let storage_deficit = (1.0 - storage / soil.max_storage).clamp(0.0, 1.0);
        let capillary_suction = soil.air_entry_suction * storage_deficit;
        let intensity = rainfall / dt_hours;
        let initial_rate = infiltration_rate(ksat, capillary_suction, storage);

        let mut step = Self {
            intensity,
            storage_deficit,
            capillary_suction,
            initial_storage: storage,
            initial_rate,
            ..Self::default()
        };

        if intensity > initial_rate {
            // Ponded from the start of the step
            step.storage_at_ponding = Some(storage);
            step.time_to_ponding = Some(0.0);
            step.final_storage =
                solve_cumulative_infiltration(storage, ksat, capillary_suction, dt_hours)?;
        } else {
            let unponded = storage + rainfall;
            let end_rate = infiltration_rate(ksat, capillary_suction, unponded);
            if intensity > end_rate {
                let at_ponding = (ksat * capillary_suction / (intensity - ksat)).max(storage);
                let time_to_ponding = ((at_ponding - storage) / intensity).clamp(0.0, dt_hours);
                debug!(
                    "Ponding after {:.2} h at {:.2} mm cumulative infiltration",
                    time_to_ponding, at_ponding
                );
                step.storage_at_ponding = Some(at_ponding);
                step.time_to_ponding = Some(time_to_ponding);
                step.final_storage = solve_cumulative_infiltration(
                    at_ponding,
                    ksat,
                    capillary_suction,
                    dt_hours - time_to_ponding,
                )?
                .min(unponded);
            } else {
                step.final_storage = unponded;
            }
        }

        step.pond = (rainfall - (step.final_storage - storage)).max(0.0);
        Ok(step)
    }
}

/// Partition one step of rainfall with Green-Ampt
///
/// # Arguments
/// * `soil` - Column description
/// * `storage` - Current soil moisture storage (mm), used as cumulative infiltration
/// * `rainfall` - Rain for the step (mm)
/// * `dt_hours` - Step length (h)
///
/// # Returns
/// Infiltration capped at the remaining storage capacity; the rest is runoff.
pub fn infiltrate(
    soil: &GreenAmptSoil,
    storage: f64,
    rainfall: f64,
    dt_hours: f64,
) -> SoilResult<GreenAmptOutcome> {
    if rainfall <= 0.0 {
        return Ok(GreenAmptOutcome::default());
    }
    if soil.is_pavement {
        return Ok(GreenAmptOutcome::all_runoff(rainfall));
    }

    let storage = storage.max(0.0);
    let capacity = soil.max_storage - storage;
    if capacity <= 0.0 {
        return Ok(GreenAmptOutcome::all_runoff(rainfall));
    }
    if storage <= 0.0 && capacity >= rainfall {
        return Ok(GreenAmptOutcome::all_infiltrates(rainfall));
    }

    let step = GreenAmptStep::resolve(soil, storage, rainfall, dt_hours)?;
    let infiltration = (rainfall - step.pond).clamp(0.0, capacity);

    Ok(GreenAmptOutcome {
        infiltration,
        runoff: rainfall - infiltration,
    })
}
