//! Per-cell forcing, carried state and step reports

use crate::config::SoilColumnParameters;
use crate::core_types::units::{Celsius, Millimeters, Percent};
use crate::physics::{FrozenSoilState, SoilMoistureState};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Forcing for one cell over one timestep
///
/// Depths are per step; negative or NaN water inputs are treated as zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellForcing {
    /// Snow water equivalent on the ground
    pub swe: Millimeters,
    pub snowmelt: Millimeters,
    pub rainfall: Millimeters,
    /// Soil moisture at freeze-up; selects the frozen-soil regime
    pub soil_storage_at_freeze: Percent,
    pub air_temperature: Celsius,
    pub thaw_front_depth: Millimeters,
    pub freeze_front_depth: Millimeters,
    /// Negative values are condensation
    pub potential_et: Millimeters,
    /// Water handed back by the previous routing pass
    pub routing_residual: Millimeters,
}

impl Default for CellForcing {
    fn default() -> Self {
        Self {
            swe: Millimeters::ZERO,
            snowmelt: Millimeters::ZERO,
            rainfall: Millimeters::ZERO,
            soil_storage_at_freeze: Percent::new(0.0),
            air_temperature: Celsius::FREEZING,
            thaw_front_depth: Millimeters::ZERO,
            freeze_front_depth: Millimeters::ZERO,
            potential_et: Millimeters::ZERO,
            routing_residual: Millimeters::ZERO,
        }
    }
}

/// Running totals since the start of the run (mm)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CumulativeTotals {
    pub total_inf: f64,
    pub total_snowinf: f64,
    pub total_excess: f64,
    pub total_meltexcess: f64,
    pub total_rain_on_snow: f64,
}

/// Surface partition from the infiltration stage (mm)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InfiltrationOutcome {
    /// All water entering the soil
    pub infiltration: f64,
    /// Melt share of `infiltration`
    pub snow_infiltration: f64,
    /// All surface runoff
    pub runoff: f64,
    /// Melt share of `runoff`
    pub melt_runoff: f64,
    /// Rain that entered frozen soil with the melt
    pub rain_on_snow: f64,
}

impl InfiltrationOutcome {
    /// Sentinel for cells where infiltration does not apply
    pub fn not_applicable() -> Self {
        Self {
            infiltration: f64::NAN,
            snow_infiltration: f64::NAN,
            runoff: f64::NAN,
            melt_runoff: f64::NAN,
            rain_on_snow: f64::NAN,
        }
    }
}

impl CumulativeTotals {
    pub fn accumulate(&mut self, outcome: &InfiltrationOutcome) {
        self.total_inf += outcome.infiltration;
        self.total_snowinf += outcome.snow_infiltration;
        self.total_excess += outcome.runoff;
        self.total_meltexcess += outcome.melt_runoff;
        self.total_rain_on_snow += outcome.rain_on_snow;
    }
}

/// Everything a cell carries from one step to the next
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CellInfiltrationState {
    pub frozen: FrozenSoilState,
    pub soil: SoilMoistureState,
    pub totals: CumulativeTotals,
}

impl CellInfiltrationState {
    /// Fresh state with both soil layers at `initial_moisture` of capacity
    pub fn new(params: &SoilColumnParameters, initial_moisture: Percent) -> Self {
        if !(0.0..=100.0).contains(&initial_moisture.value()) {
            warn!("Initial soil moisture {} clamped to 0-100%", initial_moisture);
        }
        Self {
            soil: SoilMoistureState::at_saturation_fraction(params, initial_moisture.to_fraction()),
            ..Self::default()
        }
    }
}

/// Outputs of one cell-step (mm)
///
/// Open-water cells report NaN for everything except `actual_et`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestepReport {
    pub infiltration: f64,
    pub snow_infiltration: f64,
    pub runoff: f64,
    pub melt_runoff: f64,
    pub rain_on_snow: f64,
    pub condensation: f64,
    pub actual_et: f64,
    pub soil_excess_to_runoff: f64,
    pub soil_excess_to_gw: f64,
    pub groundwater_outflow: f64,
    pub soil_to_ssr: f64,
    pub soil_storage: f64,
    pub soil_rechr_storage: f64,
    pub detention_storage: f64,
    pub depression_storage: f64,
    pub groundwater_storage: f64,
    pub totals: CumulativeTotals,
    /// Change in all reservoir storage over the step
    pub storage_change: f64,
}

impl TimestepReport {
    /// Report for a cell the soil processes do not apply to
    pub fn not_applicable(potential_et: f64) -> Self {
        let nan = f64::NAN;
        Self {
            infiltration: nan,
            snow_infiltration: nan,
            runoff: nan,
            melt_runoff: nan,
            rain_on_snow: nan,
            condensation: nan,
            actual_et: potential_et,
            soil_excess_to_runoff: nan,
            soil_excess_to_gw: nan,
            groundwater_outflow: nan,
            soil_to_ssr: nan,
            soil_storage: nan,
            soil_rechr_storage: nan,
            detention_storage: nan,
            depression_storage: nan,
            groundwater_storage: nan,
            totals: CumulativeTotals {
                total_inf: nan,
                total_snowinf: nan,
                total_excess: nan,
                total_meltexcess: nan,
                total_rain_on_snow: nan,
            },
            storage_change: nan,
        }
    }

    /// Whether this report is the open-water sentinel
    pub fn is_not_applicable(&self) -> bool {
        self.infiltration.is_nan()
    }

    /// Water in minus water out minus storage change (mm); zero when mass is conserved
    ///
    /// Water in is melt + rain + routing residual + condensation. NaN for
    /// open-water cells.
    pub fn water_balance_residual(
        &self,
        snowmelt: f64,
        rainfall: f64,
        routing_residual: f64,
    ) -> f64 {
        let inputs = snowmelt.max(0.0) + rainfall.max(0.0) + routing_residual.max(0.0)
            + self.condensation;
        let outputs = self.soil_excess_to_runoff
            + self.groundwater_outflow
            + self.soil_to_ssr
            + self.actual_et
            + self.storage_change;
        inputs - outputs
    }
}
