//! Two-layer soil moisture balance and surface/subsurface reservoir cascade
//!
//! Each step runs the same ordered cascade:
//! 1. Negative potential ET becomes condensation
//! 2. Infiltration fills the recharge layer, then the lower layer, up to their
//!    thawed capacities; the rest is soil excess
//! 3. Snow-free recharge drainage and excess percolation to groundwater
//! 4. Detention storage (snow or organic layer)
//! 5. Depression storage with exponential fill
//! 6. Groundwater overflow and recession
//! 7. Subsurface flow from depressions and the lower layer
//! 8. Evapotranspiration
//!
//! Partially frozen layers act as smaller reservoirs: capacities and drainage
//! rates are scaled by the thawed fraction of each layer.
//!
//! # Scientific References
//! - Leavesley, G.H., et al. (1983). "Precipitation-runoff modeling system:
//!   User's manual". USGS Water-Resources Investigations Report 83-4238
//! - Fang, X., Pomeroy, J.W., et al. (2013). "Multi-variable evaluation of
//!   hydrological model predictions for a headwater basin in the Canadian
//!   Rocky Mountains". Hydrology and Earth System Sciences, 17, 1635-1659

use super::soil_et;
use crate::config::{RoutingConfig, SoilColumnParameters};
use crate::core_types::soil::SoilPropertyTable;
use serde::{Deserialize, Serialize};

/// Detention storage below this is flushed to the runoff pool (mm)
const DETENTION_RESIDUE: f64 = 0.0001;

/// Cap on the exponent in the depression fill curve
const MAX_FILL_EXPONENT: f64 = 12.0;

/// Reservoir storages for one cell (mm)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SoilMoistureState {
    /// Both soil layers together
    pub soil_storage: f64,
    /// Recharge (upper) layer, part of `soil_storage`
    pub soil_rechr_storage: f64,
    pub detention_storage: f64,
    pub depression_storage: f64,
    pub groundwater_storage: f64,
}

impl SoilMoistureState {
    /// Start both soil layers at the same fraction of capacity
    pub fn at_saturation_fraction(params: &SoilColumnParameters, fraction: f64) -> Self {
        let fraction = fraction.clamp(0.0, 1.0);
        Self {
            soil_storage: params.soil_max * fraction,
            soil_rechr_storage: params.rechr_max * fraction,
            ..Self::default()
        }
    }

    /// Lower layer storage
    pub fn lower_storage(&self) -> f64 {
        (self.soil_storage - self.soil_rechr_storage).max(0.0)
    }

    /// Water held in all reservoirs
    pub fn total(&self) -> f64 {
        self.soil_storage
            + self.detention_storage
            + self.depression_storage
            + self.groundwater_storage
    }
}

/// Unfrozen fraction of each soil layer (0-1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThawFractions {
    pub recharge: f64,
    pub lower: f64,
}

impl ThawFractions {
    pub const FULLY_THAWED: ThawFractions = ThawFractions {
        recharge: 1.0,
        lower: 1.0,
    };
}

fn thawed_fraction(layer_top: f64, layer_bottom: f64, frozen_top: f64, frozen_bottom: f64) -> f64 {
    let thickness = layer_bottom - layer_top;
    if thickness <= 0.0 {
        return 1.0;
    }
    let overlap = (layer_bottom.min(frozen_bottom) - layer_top.max(frozen_top)).max(0.0);
    (1.0 - overlap / thickness).clamp(0.0, 1.0)
}

/// Thawed fraction of the recharge and lower layers from the front depths
///
/// The frozen band lies between the thaw front and the freeze front. With only
/// a thaw front the soil below it stays frozen; with only a freeze front the
/// soil above it is frozen.
///
/// # Arguments
/// * `thaw_front` - Depth of the thaw front (mm), zero if absent
/// * `freeze_front` - Depth of the freeze front (mm), zero if absent
/// * `recharge_depth` - Bottom of the recharge layer (mm)
/// * `soil_depth` - Bottom of the soil column (mm)
pub fn thaw_fractions(
    thaw_front: f64,
    freeze_front: f64,
    recharge_depth: f64,
    soil_depth: f64,
) -> ThawFractions {
    let has_thaw = thaw_front > 0.0;
    let has_freeze = freeze_front > 0.0;
    if !has_thaw && !has_freeze {
        return ThawFractions::FULLY_THAWED;
    }

    let (frozen_top, frozen_bottom) = if has_thaw && freeze_front > thaw_front {
        (thaw_front, freeze_front)
    } else if has_thaw {
        (thaw_front, soil_depth)
    } else {
        (0.0, freeze_front)
    };

    ThawFractions {
        recharge: thawed_fraction(0.0, recharge_depth, frozen_top, frozen_bottom),
        lower: thawed_fraction(recharge_depth, soil_depth, frozen_top, frozen_bottom),
    }
}

/// Inputs to one routing step (mm)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RouterInput {
    pub infiltration: f64,
    pub runoff: f64,
    /// Water handed over from the previous routing pass
    pub routing_residual: f64,
    /// Potential ET; negative values are condensation
    pub potential_et: f64,
    pub swe: f64,
    pub thaw_front_depth: f64,
    pub freeze_front_depth: f64,
}

/// Fluxes leaving the cascade in one step (mm)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoutingOutcome {
    pub condensation: f64,
    pub actual_et: f64,
    /// Surface water leaving the cell
    pub soil_excess_to_runoff: f64,
    /// Water entering groundwater
    pub soil_excess_to_gw: f64,
    pub groundwater_outflow: f64,
    pub soil_to_ssr: f64,
}

/// Per-step routing for one soil column
#[derive(Debug, Clone, Copy)]
pub struct TwoLayerSoilRouter<'a> {
    params: &'a SoilColumnParameters,
    config: &'a RoutingConfig,
    table: &'a SoilPropertyTable,
}

/// Running fluxes while the cascade is evaluated
#[derive(Debug, Default)]
struct Cascade {
    excess: f64,
    pool: f64,
    to_groundwater: f64,
    to_ssr: f64,
    groundwater_outflow: f64,
}

impl<'a> TwoLayerSoilRouter<'a> {
    pub fn new(
        params: &'a SoilColumnParameters,
        config: &'a RoutingConfig,
        table: &'a SoilPropertyTable,
    ) -> Self {
        Self {
            params,
            config,
            table,
        }
    }

    /// Layer thaw fractions for the current front depths
    pub fn thaw_fractions(&self, input: &RouterInput) -> ThawFractions {
        thaw_fractions(
            input.thaw_front_depth,
            input.freeze_front_depth,
            self.params.recharge_depth * 1000.0,
            self.params.soil_depth * 1000.0,
        )
    }

    /// Run the full cascade for one step
    pub fn route(&self, state: &mut SoilMoistureState, input: &RouterInput) -> RoutingOutcome {
        let (condensation, et_demand) = if input.potential_et < 0.0 {
            (-input.potential_et, 0.0)
        } else {
            (0.0, input.potential_et)
        };

        let snow_covered = input.swe > self.config.snow_covered_threshold;
        let thaw = self.thaw_fractions(input);
        let mut cascade = Cascade::default();

        self.organize_layers(state, &mut cascade, input.infiltration + condensation, thaw);
        self.drain_soil(state, &mut cascade, thaw, snow_covered);

        cascade.pool = cascade.excess + input.runoff.max(0.0) + input.routing_residual.max(0.0);
        self.route_detention(state, &mut cascade, snow_covered);
        self.route_depression(state, &mut cascade);
        self.route_groundwater(state, &mut cascade);
        self.subsurface_flow(state, &mut cascade, thaw);

        let actual_et = soil_et::evapotranspire(state, self.params, self.table, et_demand);

        RoutingOutcome {
            condensation,
            actual_et,
            soil_excess_to_runoff: cascade.pool,
            soil_excess_to_gw: cascade.to_groundwater,
            groundwater_outflow: cascade.groundwater_outflow,
            soil_to_ssr: cascade.to_ssr,
        }
    }

    /// Fill recharge then lower layer up to their thawed capacities
    fn organize_layers(
        &self,
        state: &mut SoilMoistureState,
        cascade: &mut Cascade,
        water: f64,
        thaw: ThawFractions,
    ) {
        let params = self.params;
        if params.soil_max <= 0.0 {
            cascade.excess = water;
            return;
        }

        let mut lower = state.lower_storage();

        let rechr_space = (params.rechr_max * thaw.recharge - state.soil_rechr_storage).max(0.0);
        let to_rechr = water.min(rechr_space);
        state.soil_rechr_storage += to_rechr;
        let rest = water - to_rechr;

        let lower_space = (params.lower_max() * thaw.lower - lower).max(0.0);
        let to_lower = rest.min(lower_space);
        lower += to_lower;

        state.soil_storage = state.soil_rechr_storage + lower;
        cascade.excess = rest - to_lower;
    }

    /// Recharge drainage to subsurface flow and excess percolation
    fn drain_soil(
        &self,
        state: &mut SoilMoistureState,
        cascade: &mut Cascade,
        thaw: ThawFractions,
        snow_covered: bool,
    ) {
        let params = self.params;
        let k = &params.coefficients;

        if !snow_covered && state.soil_rechr_storage > 0.0 && params.rechr_max > 0.0 {
            let drained = (state.soil_rechr_storage / params.rechr_max
                * k.rechr_to_ssr
                * thaw.recharge)
                .min(state.soil_rechr_storage);
            state.soil_rechr_storage -= drained;
            state.soil_storage -= drained;
            cascade.to_ssr += drained;
        }

        if cascade.excess > 0.0 {
            let to_gw = cascade.excess.min(k.soil_to_gw * thaw.lower);
            cascade.excess -= to_gw;
            cascade.to_groundwater += to_gw;
        }

        if self.config.excess_to_ssr && cascade.excess > 0.0 {
            let to_ssr = cascade.excess * (1.0 - thaw.lower);
            cascade.excess -= to_ssr;
            cascade.to_ssr += to_ssr;
        }
    }

    fn route_detention(
        &self,
        state: &mut SoilMoistureState,
        cascade: &mut Cascade,
        snow_covered: bool,
    ) {
        let params = self.params;
        let (capacity, drainage) = if snow_covered {
            (
                params.detention_snow_max,
                params.coefficients.detention_snow_to_runoff,
            )
        } else {
            (
                params.detention_organic_max,
                params.coefficients.detention_organic_to_runoff,
            )
        };

        if state.detention_storage > capacity {
            cascade.pool += state.detention_storage - capacity;
            state.detention_storage = capacity;
        }

        let fill = cascade.pool.min(capacity - state.detention_storage).max(0.0);
        state.detention_storage += fill;
        cascade.pool -= fill;

        let released = state.detention_storage * drainage;
        state.detention_storage -= released;
        cascade.pool += released;

        if state.detention_storage < DETENTION_RESIDUE {
            cascade.pool += state.detention_storage;
            state.detention_storage = 0.0;
        }
    }

    fn route_depression(&self, state: &mut SoilMoistureState, cascade: &mut Cascade) {
        let params = self.params;
        let capacity = params.depression_max;

        if state.depression_storage > capacity {
            cascade.pool += state.depression_storage - capacity;
            state.depression_storage = capacity;
        }

        if capacity > 0.0 && cascade.pool > 0.0 {
            let space = capacity - state.depression_storage;
            let fill = if params.soil_max <= 0.0 {
                cascade.pool.min(space)
            } else {
                let exponent = (cascade.pool / capacity).min(MAX_FILL_EXPONENT);
                (space * (1.0 - (-exponent).exp())).min(cascade.pool)
            }
            .max(0.0);
            state.depression_storage += fill;
            cascade.pool -= fill;
        }

        let to_gw = state.depression_storage * params.coefficients.depression_to_gw;
        state.depression_storage -= to_gw;
        cascade.to_groundwater += to_gw;
    }

    fn route_groundwater(&self, state: &mut SoilMoistureState, cascade: &mut Cascade) {
        let params = self.params;
        state.groundwater_storage += cascade.to_groundwater;

        if state.groundwater_storage > params.groundwater_max {
            cascade.groundwater_outflow += state.groundwater_storage - params.groundwater_max;
            state.groundwater_storage = params.groundwater_max;
        }

        let recession = state.groundwater_storage * params.coefficients.groundwater_out;
        state.groundwater_storage -= recession;
        cascade.groundwater_outflow += recession;
    }

    fn subsurface_flow(
        &self,
        state: &mut SoilMoistureState,
        cascade: &mut Cascade,
        thaw: ThawFractions,
    ) {
        let k = &self.params.coefficients;

        let from_depression = (state.depression_storage * k.depression_to_ssr)
            .min(state.depression_storage);
        state.depression_storage -= from_depression;
        cascade.to_ssr += from_depression;

        let from_lower = (k.lower_to_ssr * thaw.lower)
            .min(state.lower_storage())
            .max(0.0);
        state.soil_storage -= from_lower;
        cascade.to_ssr += from_lower;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferCoefficients;

    fn column() -> (SoilColumnParameters, SoilPropertyTable) {
        let table = SoilPropertyTable::standard();
        let params = SoilColumnParameters::loam(&table)
            .unwrap()
            .with_detention(5.0, 2.0)
            .with_depression_max(10.0)
            .with_groundwater_max(200.0)
            .with_coefficients(TransferCoefficients {
                rechr_to_ssr: 0.5,
                lower_to_ssr: 0.2,
                soil_to_gw: 1.0,
                detention_snow_to_runoff: 0.1,
                detention_organic_to_runoff: 0.2,
                depression_to_ssr: 0.05,
                depression_to_gw: 0.05,
                groundwater_out: 0.01,
            });
        (params, table)
    }

    fn balance(
        before: &SoilMoistureState,
        after: &SoilMoistureState,
        input: &RouterInput,
        out: &RoutingOutcome,
    ) -> f64 {
        let inputs =
            input.infiltration + input.runoff + input.routing_residual + out.condensation;
        let outputs = out.soil_excess_to_runoff
            + out.groundwater_outflow
            + out.soil_to_ssr
            + out.actual_et
            + (after.total() - before.total());
        inputs - outputs
    }

    #[test]
    fn test_thaw_fractions_no_fronts() {
        assert_eq!(
            thaw_fractions(0.0, 0.0, 250.0, 1000.0),
            ThawFractions::FULLY_THAWED
        );
    }

    #[test]
    fn test_thaw_fractions_freeze_front_only() {
        let f = thaw_fractions(0.0, 500.0, 250.0, 1000.0);
        assert_eq!(f.recharge, 0.0);
        assert!((f.lower - (1.0 - 250.0 / 750.0)).abs() < 1e-12);
    }

    #[test]
    fn test_thaw_fractions_thaw_front_only() {
        let f = thaw_fractions(100.0, 0.0, 250.0, 1000.0);
        assert!((f.recharge - 0.4).abs() < 1e-12);
        assert_eq!(f.lower, 0.0);
    }

    #[test]
    fn test_thaw_fractions_frozen_band() {
        let f = thaw_fractions(100.0, 400.0, 250.0, 1000.0);
        assert!((f.recharge - 0.4).abs() < 1e-12);
        assert!((f.lower - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_infiltration_fills_recharge_first() {
        let (params, table) = column();
        let config = RoutingConfig::default();
        let router = TwoLayerSoilRouter::new(&params, &config, &table);
        let mut state = SoilMoistureState::default();
        let input = RouterInput {
            infiltration: 20.0,
            swe: 10.0,
            ..RouterInput::default()
        };
        router.route(&mut state, &input);
        assert!((state.soil_rechr_storage - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_pet_is_condensation() {
        let (params, table) = column();
        let config = RoutingConfig::default();
        let router = TwoLayerSoilRouter::new(&params, &config, &table);
        let mut state = SoilMoistureState::default();
        let out = router.route(
            &mut state,
            &RouterInput {
                potential_et: -0.4,
                swe: 5.0,
                ..RouterInput::default()
            },
        );
        assert_eq!(out.condensation, 0.4);
        assert_eq!(out.actual_et, 0.0);
        assert!((state.soil_storage - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_full_soil_sends_excess_downstream() {
        let (params, table) = column();
        let config = RoutingConfig::default();
        let router = TwoLayerSoilRouter::new(&params, &config, &table);
        let mut state = SoilMoistureState::at_saturation_fraction(&params, 1.0);
        let before = state;
        let input = RouterInput {
            infiltration: 30.0,
            runoff: 5.0,
            potential_et: 2.0,
            ..RouterInput::default()
        };
        let out = router.route(&mut state, &input);
        assert!(out.soil_excess_to_gw > 0.0);
        assert!(out.soil_excess_to_runoff > 0.0);
        assert!(balance(&before, &state, &input, &out).abs() < 1e-9);
    }

    #[test]
    fn test_frozen_lower_layer_diverts_excess_to_ssr() {
        let (params, table) = column();
        let config = RoutingConfig::default();
        let router = TwoLayerSoilRouter::new(&params, &config, &table);
        let mut state = SoilMoistureState::default();
        let input = RouterInput {
            infiltration: 40.0,
            swe: 30.0,
            freeze_front_depth: 1000.0,
            ..RouterInput::default()
        };
        let out = router.route(&mut state, &input);
        assert_eq!(state.soil_storage, 0.0);
        assert!((out.soil_to_ssr - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_capacity_column_routes_everything_to_surface() {
        let (params, table) = column();
        let params = params.with_storage_max(0.0, 0.0);
        let config = RoutingConfig::default();
        let router = TwoLayerSoilRouter::new(&params, &config, &table);
        let mut state = SoilMoistureState::default();
        let before = state;
        let input = RouterInput {
            infiltration: 12.0,
            ..RouterInput::default()
        };
        let out = router.route(&mut state, &input);
        assert_eq!(state.soil_storage, 0.0);
        assert!(balance(&before, &state, &input, &out).abs() < 1e-9);
    }

    #[test]
    fn test_groundwater_overflow() {
        let (params, table) = column();
        let params = params.with_groundwater_max(1.0);
        let config = RoutingConfig::default();
        let router = TwoLayerSoilRouter::new(&params, &config, &table);
        let mut state = SoilMoistureState::at_saturation_fraction(&params, 1.0);
        let before = state;
        let input = RouterInput {
            infiltration: 50.0,
            ..RouterInput::default()
        };
        let out = router.route(&mut state, &input);
        assert!(state.groundwater_storage <= 1.0);
        assert!(out.groundwater_outflow > 0.0);
        assert!(balance(&before, &state, &input, &out).abs() < 1e-9);
    }

    #[test]
    fn test_reservoirs_within_bounds() {
        let (params, table) = column();
        let config = RoutingConfig::default();
        let router = TwoLayerSoilRouter::new(&params, &config, &table);
        let mut state = SoilMoistureState::at_saturation_fraction(&params, 0.5);
        for step in 0..50 {
            let input = RouterInput {
                infiltration: f64::from(step % 7) * 9.0,
                runoff: f64::from(step % 3) * 4.0,
                potential_et: 3.0,
                swe: if step < 20 { 40.0 } else { 0.0 },
                ..RouterInput::default()
            };
            router.route(&mut state, &input);
            assert!(state.soil_storage >= 0.0 && state.soil_storage <= params.soil_max + 1e-9);
            assert!(state.soil_rechr_storage <= state.soil_storage + 1e-9);
            assert!(state.detention_storage <= 5.0 + 1e-9);
            assert!(state.depression_storage <= 10.0 + 1e-9);
            assert!(state.groundwater_storage <= 200.0 + 1e-9);
        }
    }
}
