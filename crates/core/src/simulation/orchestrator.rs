//! Per-cell selection between frozen and thawed infiltration

use super::state::{CellForcing, CellInfiltrationState, InfiltrationOutcome};
use crate::config::{ModelConfig, SoilColumnParameters};
use crate::core_types::soil::SoilPropertyTable;
use crate::error::{SoilError, SoilResult};
use crate::physics::{create_thawed_method, FrozenSoilInput, ThawedInfiltration};
use std::sync::Arc;

/// Routes each cell-step to Gray's frozen-soil method or the configured
/// thawed-soil method and keeps the cumulative totals
pub struct InfiltrationOrchestrator {
    config: ModelConfig,
    thawed: Box<dyn ThawedInfiltration>,
}

impl std::fmt::Debug for InfiltrationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfiltrationOrchestrator")
            .field("config", &self.config)
            .field("thawed", &self.thawed.method())
            .finish()
    }
}

impl InfiltrationOrchestrator {
    /// # Errors
    /// Invalid run configuration.
    pub fn new(config: ModelConfig, table: Arc<SoilPropertyTable>) -> SoilResult<Self> {
        config.validate()?;
        Ok(Self {
            thawed: create_thawed_method(config.thaw_method, table),
            config,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Partition one step of melt and rain for a cell and update its totals
    ///
    /// Open-water cells get the NaN sentinel and their totals are untouched.
    ///
    /// # Errors
    /// Non-finite freeze-up moisture, or numerical failure of the thawed-soil
    /// method. The state is not modified on error.
    pub fn infiltrate(
        &self,
        params: &SoilColumnParameters,
        state: &mut CellInfiltrationState,
        forcing: &CellForcing,
    ) -> SoilResult<InfiltrationOutcome> {
        if params.is_water {
            return Ok(InfiltrationOutcome::not_applicable());
        }

        let theta = forcing.soil_storage_at_freeze.value();
        if !theta.is_finite() {
            return Err(SoilError::invalid("soil_storage_at_freeze", theta, "must be finite"));
        }

        let melt = forcing.snowmelt.non_negative().value();
        let rain = forcing.rainfall.non_negative().value();

        let outcome = if state.frozen.update_freeze_state(forcing.swe, &self.config.frozen) {
            let input = FrozenSoilInput {
                snowmelt: forcing.snowmelt.non_negative(),
                rainfall: forcing.rainfall.non_negative(),
                swe: forcing.swe,
                soil_storage_at_freeze: forcing.soil_storage_at_freeze,
                air_temperature: forcing.air_temperature,
            };
            let frozen =
                state
                    .frozen
                    .step(&input, &self.config.frozen, self.config.timestep_seconds);
            InfiltrationOutcome {
                infiltration: frozen.snow_infiltration + frozen.rain_on_snow,
                snow_infiltration: frozen.snow_infiltration,
                runoff: frozen.melt_runoff + frozen.rain_runoff,
                melt_runoff: frozen.melt_runoff,
                rain_on_snow: frozen.rain_on_snow,
            }
        } else {
            let water = melt + rain;
            let thawed = self.thawed.infiltrate(
                params,
                state.soil.soil_storage,
                water,
                self.config.timestep_hours(),
            )?;
            let melt_share = if water > 0.0 { melt / water } else { 0.0 };
            InfiltrationOutcome {
                infiltration: thawed.infiltration,
                snow_infiltration: thawed.infiltration * melt_share,
                runoff: thawed.runoff,
                melt_runoff: thawed.runoff * melt_share,
                rain_on_snow: 0.0,
            }
        };

        state.totals.accumulate(&outcome);
        Ok(outcome)
    }
}
