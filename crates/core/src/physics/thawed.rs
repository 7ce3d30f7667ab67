//! Infiltration into thawed soil
//!
//! The orchestrator picks one method per run through [`create_thawed_method`];
//! both implementations share the [`ThawedInfiltration`] interface so cells do
//! not need to know which one is active.

use super::{ayers, green_ampt};
use crate::config::{SoilColumnParameters, ThawMethod};
use crate::core_types::soil::{SoilPropertyTable, SoilType};
use crate::error::SoilResult;
use std::sync::Arc;
use tracing::info;

/// Split of one step's water input on thawed soil (mm)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThawedOutcome {
    pub infiltration: f64,
    pub runoff: f64,
}

/// Thawed-soil infiltration method
///
/// Implementations hold only read-only data so one instance is shared by all
/// cells across threads.
pub trait ThawedInfiltration: Send + Sync {
    /// Partition `water` (mm) arriving at the surface during one step
    ///
    /// # Errors
    /// Numerical failure of the underlying method for this cell-step.
    fn infiltrate(
        &self,
        params: &SoilColumnParameters,
        soil_storage: f64,
        water: f64,
        dt_hours: f64,
    ) -> SoilResult<ThawedOutcome>;

    fn method(&self) -> ThawMethod;
}

/// Green-Ampt on the column's soil hydraulic properties
#[derive(Debug, Clone, Copy, Default)]
pub struct GreenAmptMethod;

impl ThawedInfiltration for GreenAmptMethod {
    fn infiltrate(
        &self,
        params: &SoilColumnParameters,
        soil_storage: f64,
        water: f64,
        dt_hours: f64,
    ) -> SoilResult<ThawedOutcome> {
        let soil = green_ampt::GreenAmptSoil {
            saturated_conductivity: params.saturated_conductivity,
            air_entry_suction: params.air_entry_suction,
            max_storage: params.soil_max,
            is_pavement: params.soil_type == SoilType::Pavement,
        };
        let out = green_ampt::infiltrate(&soil, soil_storage, water, dt_hours)?;
        Ok(ThawedOutcome {
            infiltration: out.infiltration,
            runoff: out.runoff,
        })
    }

    fn method(&self) -> ThawMethod {
        ThawMethod::GreenAmpt
    }
}

/// Ayers capacity table lookup
#[derive(Debug, Clone)]
pub struct AyersMethod {
    table: Arc<SoilPropertyTable>,
}

impl AyersMethod {
    pub fn new(table: Arc<SoilPropertyTable>) -> Self {
        Self { table }
    }
}

impl ThawedInfiltration for AyersMethod {
    fn infiltrate(
        &self,
        params: &SoilColumnParameters,
        _soil_storage: f64,
        water: f64,
        dt_hours: f64,
    ) -> SoilResult<ThawedOutcome> {
        let rate = self
            .table
            .ayers_capacity(params.texture, params.ayers_cover);
        let out = ayers::infiltrate(rate, water, dt_hours);
        Ok(ThawedOutcome {
            infiltration: out.infiltration,
            runoff: out.runoff,
        })
    }

    fn method(&self) -> ThawMethod {
        ThawMethod::Ayers
    }
}

/// Build the configured thawed-soil method
///
/// # Arguments
/// * `method` - Method selected in the run configuration
/// * `table` - Shared soil property table (Ayers capacities)
pub fn create_thawed_method(
    method: ThawMethod,
    table: Arc<SoilPropertyTable>,
) -> Box<dyn ThawedInfiltration> {
    match method {
        ThawMethod::GreenAmpt => {
            info!("Thawed-soil infiltration: Green-Ampt");
            Box::new(GreenAmptMethod)
        }
        ThawMethod::Ayers => {
            info!("Thawed-soil infiltration: Ayers capacity table");
            Box::new(AyersMethod::new(table))
        }
    }
}
