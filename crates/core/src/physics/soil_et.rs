//! Actual evapotranspiration from depression and soil storage
//!
//! Potential ET is first met from depression storage in proportion to its
//! share of the surface water. The remaining demand is drawn from the soil
//! layers, scaled down by each layer's moisture availability according to the
//! soil texture ET regime and limited to the layers the vegetation reaches.
//!
//! # Scientific References
//! - Leavesley, G.H., Lichty, R.W., Troutman, B.M., Saindon, L.G. (1983).
//!   "Precipitation-runoff modeling system: User's manual". USGS Water-Resources
//!   Investigations Report 83-4238
//! - Pomeroy, J.W., Gray, D.M., et al. (2007). "The cold regions hydrological
//!   model: a platform for basing process representation and model structure
//!   on physical evidence". Hydrological Processes, 21(19), 2650-2667

use super::two_layer::SoilMoistureState;
use crate::config::{EtCover, SoilColumnParameters};
use crate::core_types::soil::{EtRegime, SoilPropertyTable};

/// Scale an ET demand by layer moisture availability
///
/// # Arguments
/// * `et` - ET demand on the layer (mm)
/// * `available` - Layer storage as a fraction of its capacity (0-1)
/// * `regime` - Texture ET regime of the layer
pub fn scale_for_availability(et: f64, available: f64, regime: EtRegime) -> f64 {
    match regime {
        EtRegime::Coarse if available < 0.25 => 0.5 * available * et,
        EtRegime::Medium if available < 0.5 => available * et,
        EtRegime::Fine if available <= 0.33 => 0.5 * available * et,
        EtRegime::Fine if available < 0.67 => available * et,
        EtRegime::None => 0.0,
        _ => et,
    }
}

fn fraction_of(storage: f64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        (storage / capacity).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Remove ET from depression and soil storage
///
/// # Returns
/// Actual ET (mm); never more than the demand or the water available
pub fn evapotranspire(
    state: &mut SoilMoistureState,
    params: &SoilColumnParameters,
    table: &SoilPropertyTable,
    potential_et: f64,
) -> f64 {
    if potential_et <= 0.0 {
        return 0.0;
    }
    let surface_and_soil = state.depression_storage + state.soil_storage;
    if surface_and_soil <= 0.0 {
        return 0.0;
    }

    let from_depression = (potential_et * state.depression_storage / surface_and_soil)
        .min(state.depression_storage)
        .max(0.0);
    state.depression_storage -= from_depression;
    let mut actual = from_depression;

    let remaining = potential_et - from_depression;
    if remaining <= 0.0 || state.soil_storage <= 0.0 || params.et_cover == EtCover::Bare {
        return actual;
    }

    let lower = state.lower_storage();
    let rechr_available = fraction_of(state.soil_rechr_storage, params.rechr_max);
    let lower_available = fraction_of(lower, params.lower_max());

    let et_rechr = scale_for_availability(
        remaining,
        rechr_available,
        table.et_regime(params.soil_type_rechr),
    )
    .min(remaining);
    let et_lower = scale_for_availability(
        remaining - et_rechr,
        lower_available,
        table.et_regime(params.soil_type_lower),
    );

    let from_rechr = et_rechr.min(state.soil_rechr_storage).max(0.0);
    let from_lower = match params.et_cover {
        EtCover::GrassShrub => et_lower.min(lower).max(0.0),
        EtCover::Crops | EtCover::Bare => 0.0,
    };

    state.soil_rechr_storage -= from_rechr;
    state.soil_storage -= from_rechr + from_lower;
    actual += from_rechr + from_lower;
    actual
}

/// Actual ET for a cell; open water evaporates at the potential rate
pub fn actual_et(
    state: &mut SoilMoistureState,
    params: &SoilColumnParameters,
    table: &SoilPropertyTable,
    potential_et: f64,
) -> f64 {
    if params.is_water {
        return potential_et;
    }
    evapotranspire(state, params, table, potential_et)
}
