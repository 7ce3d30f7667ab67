//! Gray Areal Snowmelt Infiltration into Frozen Soils (1985, 2001)
//!
//! Once a snowpack deeper than the freeze threshold has formed, the soil is
//! treated as frozen for the rest of the freeze cycle and snowmelt infiltration
//! follows one of three regimes selected by the soil moisture at freeze-up:
//! - Unlimited: gravity flow dominates, all melt infiltrates
//! - Limited: capillary flow dominates, infiltration follows the areal
//!   depletion index `INF = 5·(1 − θ)·SWE^0.584` spread over the infiltration days
//! - Restricted: an impermeable surface layer, no melt infiltrates
//!
//! An ice lens forming after the first major melt seals the profile for the
//! rest of the freeze cycle.
//!
//! # Scientific References
//! - Gray, D.M., Landine, P.G., Granger, R.J. (1985). "Simulating infiltration
//!   into frozen prairie soils in streamflow models". Canadian Journal of Earth
//!   Sciences, 22(3), 464-472
//! - Gray, D.M., Toth, B., Zhao, L., Pomeroy, J.W., Granger, R.J. (2001).
//!   "Estimating areal snowmelt infiltration into frozen soils".
//!   Hydrological Processes, 15(16), 3095-3111

use crate::config::{FrozenSoilConfig, SECONDS_PER_DAY};
use crate::core_types::units::{Celsius, Millimeters, Percent};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gray (1985) depletion-index exponent on SWE
const SWE_EXPONENT: f64 = 0.584;

/// Gray (1985) depletion-index coefficient
const INDEX_COEFFICIENT: f64 = 5.0;

/// Un-normalised areal infiltration for a snowpack
///
/// `INF = 5·(1 − θ/100)·SWE^0.584`
///
/// # Arguments
/// * `theta` - Soil moisture at freeze-up (%)
/// * `swe` - Snow water equivalent at the major melt (mm)
///
/// # Returns
/// Total infiltration over the melt period (mm); zero for an empty pack
pub fn depletion_index_raw(theta: f64, swe: f64) -> f64 {
    if swe <= 0.0 {
        return 0.0;
    }
    INDEX_COEFFICIENT * (1.0 - theta / 100.0) * swe.powf(SWE_EXPONENT)
}

/// Cap on infiltration for one step of a major melt
///
/// Spreads the raw index evenly over `max_inf_days` days of steps.
pub fn max_infiltration_per_melt(raw_index: f64, max_inf_days: u32, timestep_seconds: f64) -> f64 {
    raw_index / (f64::from(max_inf_days) * SECONDS_PER_DAY / timestep_seconds)
}

/// Depletion-index working set carried through a freeze cycle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DepletionIndexState {
    /// Major melt events (infiltration days) since freeze onset
    pub major_melt_count: u32,
    /// Fraction of each melt that infiltrates
    pub depletion_index: f64,
    /// Per-step infiltration cap (mm)
    pub max_infiltration_per_melt: f64,
    /// SWE when the index was last computed (mm)
    pub initial_swe: f64,
}

impl DepletionIndexState {
    /// Recompute the index for the current snowpack
    fn recompute(&mut self, theta: f64, swe: f64, max_inf_days: u32, timestep_seconds: f64) {
        let raw = depletion_index_raw(theta, swe);
        self.max_infiltration_per_melt =
            max_infiltration_per_melt(raw, max_inf_days, timestep_seconds);
        self.depletion_index = if swe > 0.0 { raw / swe } else { 0.0 };
        self.initial_swe = swe;
    }

    fn indexed_infiltration(&self, melt: f64) -> f64 {
        (melt * self.depletion_index).min(self.max_infiltration_per_melt)
    }

    /// Whether an ice lens has sealed the profile
    pub fn is_sealed(&self, max_inf_days: u32) -> bool {
        self.major_melt_count > max_inf_days
    }

    /// Limited-regime snowmelt infiltration for one step (mm)
    fn limited_infiltration(
        &mut self,
        melt: f64,
        swe: f64,
        theta: f64,
        config: &FrozenSoilConfig,
        timestep_seconds: f64,
    ) -> f64 {
        if self.major_melt_count >= config.max_inf_days {
            return 0.0;
        }

        let daily_melt = melt * SECONDS_PER_DAY / timestep_seconds;
        let is_major = daily_melt >= config.major_melt_threshold;

        if is_major && (self.major_melt_count == 0 || swe > self.initial_swe) {
            self.recompute(theta, swe, config.max_inf_days, timestep_seconds);
            self.major_melt_count += 1;
            self.indexed_infiltration(melt)
        } else if self.major_melt_count > 0 {
            self.major_melt_count += 1;
            self.indexed_infiltration(melt)
        } else if config.allow_prior_inf {
            melt
        } else {
            0.0
        }
    }
}

/// Infiltration regime for one frozen step, decided from the freeze-up moisture
///
/// Only the limited regime needs the carried depletion-index state.
#[derive(Debug)]
pub enum FrozenPhase<'a> {
    Unlimited,
    Limited(&'a mut DepletionIndexState),
    Restricted,
}

impl<'a> FrozenPhase<'a> {
    /// Map the 0-100 freeze-up moisture onto a regime
    pub fn classify(soil_storage_at_freeze: Percent, index: &'a mut DepletionIndexState) -> Self {
        let theta = soil_storage_at_freeze.value();
        if theta <= 0.0 {
            FrozenPhase::Unlimited
        } else if theta >= 100.0 {
            FrozenPhase::Restricted
        } else {
            FrozenPhase::Limited(index)
        }
    }
}

/// Forcing for one frozen-soil step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrozenSoilInput {
    pub snowmelt: Millimeters,
    pub rainfall: Millimeters,
    pub swe: Millimeters,
    pub soil_storage_at_freeze: Percent,
    pub air_temperature: Celsius,
}

/// Partition of melt and rain on frozen soil (mm)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrozenOutcome {
    pub snow_infiltration: f64,
    pub melt_runoff: f64,
    /// Rain that infiltrated alongside melt
    pub rain_on_snow: f64,
    pub rain_runoff: f64,
}

/// Frozen-soil state carried across timesteps
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrozenSoilState {
    pub frozen: bool,
    pub index: DepletionIndexState,
}

impl FrozenSoilState {
    /// Start a freeze cycle when SWE first exceeds the threshold
    ///
    /// # Returns
    /// Whether the soil is frozen for this step
    pub fn update_freeze_state(&mut self, swe: Millimeters, config: &FrozenSoilConfig) -> bool {
        if !self.frozen && swe.value() > config.min_swe_to_freeze {
            debug!("Soil freeze onset at SWE {}", swe);
            self.frozen = true;
            self.index = DepletionIndexState::default();
        }
        self.frozen
    }

    /// Seal the profile if an ice lens forms after infiltration has begun
    fn check_for_ice_lens(&mut self, air_temperature: Celsius, config: &FrozenSoilConfig) {
        let index = &mut self.index;
        if index.major_melt_count > 0
            && !index.is_sealed(config.max_inf_days)
            && air_temperature.value() < config.ice_lens_temperature
        {
            debug!(
                "Ice lens formed at {} after {} infiltration days",
                air_temperature, index.major_melt_count
            );
            index.major_melt_count = config.max_inf_days + 1;
        }
    }

    /// Partition one step of melt and rain on frozen soil
    pub fn step(
        &mut self,
        input: &FrozenSoilInput,
        config: &FrozenSoilConfig,
        timestep_seconds: f64,
    ) -> FrozenOutcome {
        let melt = input.snowmelt.non_negative().value();
        let rain = input.rainfall.non_negative().value();

        self.check_for_ice_lens(input.air_temperature, config);
        let sealed = self.index.is_sealed(config.max_inf_days);

        let snow_infiltration = if melt > 0.0 && !sealed {
            let (infiltrated, reset_count) =
                match FrozenPhase::classify(input.soil_storage_at_freeze, &mut self.index) {
                    FrozenPhase::Unlimited => (melt, true),
                    FrozenPhase::Restricted => (0.0, true),
                    FrozenPhase::Limited(index) => (
                        index.limited_infiltration(
                            melt,
                            input.swe.value(),
                            input.soil_storage_at_freeze.value(),
                            config,
                            timestep_seconds,
                        ),
                        false,
                    ),
                };
            if reset_count {
                self.index.major_melt_count = 1;
            }
            infiltrated.clamp(0.0, melt)
        } else {
            0.0
        };

        let (rain_on_snow, rain_runoff) = if snow_infiltration > 0.0 {
            (rain, 0.0)
        } else {
            (0.0, rain)
        };

        if config.thaw_when_snow_free && input.swe.value() <= 0.0 {
            debug!("Snowpack gone, frozen-soil cycle ended");
            self.frozen = false;
        }

        FrozenOutcome {
            snow_infiltration,
            melt_runoff: melt - snow_infiltration,
            rain_on_snow,
            rain_runoff,
        }
    }
}
