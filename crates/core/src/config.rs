//! Model configuration and per-cell soil column parameters
//!
//! [`ModelConfig`] holds the run-wide switches and thresholds and can be read
//! from JSON. [`SoilColumnParameters`] is built once per cell and never mutated
//! while the model runs.

use crate::core_types::soil::{AyersCover, SoilPropertyTable, SoilType, TextureClass};
use crate::core_types::units::{Celsius, Millimeters};
use crate::error::{require_fraction, require_non_negative, SoilError, SoilResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seconds in one day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Infiltration method used when the soil is not frozen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThawMethod {
    /// Capacity lookup by texture and ground cover
    #[default]
    Ayers,
    /// Implicit Green-Ampt with ponding-time detection
    GreenAmpt,
}

/// Gray's frozen-soil infiltration settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrozenSoilConfig {
    /// Number of major-melt days over which frozen soil accepts water
    pub max_inf_days: u32,
    /// SWE that switches the soil to frozen (mm)
    pub min_swe_to_freeze: f64,
    /// Daily melt that counts as a major melt (mm/day)
    pub major_melt_threshold: f64,
    /// Let minor melts infiltrate freely before the first major melt
    pub allow_prior_inf: bool,
    /// Air temperature below which an ice lens seals the soil (°C)
    pub ice_lens_temperature: f64,
    /// Leave the frozen state once the snowpack has gone
    pub thaw_when_snow_free: bool,
}

impl Default for FrozenSoilConfig {
    fn default() -> Self {
        Self {
            max_inf_days: 6,
            min_swe_to_freeze: 25.0,
            major_melt_threshold: 5.0,
            allow_prior_inf: true,
            ice_lens_temperature: -10.0,
            thaw_when_snow_free: true,
        }
    }
}

impl FrozenSoilConfig {
    pub fn validate(&self) -> SoilResult<()> {
        if self.max_inf_days == 0 {
            return Err(SoilError::invalid(
                "max_inf_days",
                0.0,
                "must be at least one day",
            ));
        }
        require_non_negative("min_swe_to_freeze", self.min_swe_to_freeze)?;
        require_non_negative("major_melt_threshold", self.major_melt_threshold)?;
        if !self.ice_lens_temperature.is_finite()
            || self.ice_lens_temperature < *Celsius::ABSOLUTE_ZERO
        {
            return Err(SoilError::invalid(
                "ice_lens_temperature",
                self.ice_lens_temperature,
                "must be a finite temperature above absolute zero",
            ));
        }
        Ok(())
    }
}

/// Reservoir cascade switches
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Route part of the soil excess to subsurface flow when the lower layer is partly frozen
    pub excess_to_ssr: bool,
    /// SWE above which the cell counts as snow covered (mm)
    pub snow_covered_threshold: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            excess_to_ssr: true,
            snow_covered_threshold: 0.0,
        }
    }
}

/// Run-wide model configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model timestep (s)
    pub timestep_seconds: f64,
    pub thaw_method: ThawMethod,
    pub frozen: FrozenSoilConfig,
    pub routing: RoutingConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            timestep_seconds: SECONDS_PER_DAY,
            thaw_method: ThawMethod::default(),
            frozen: FrozenSoilConfig::default(),
            routing: RoutingConfig::default(),
        }
    }
}

impl ModelConfig {
    /// Parse and validate a JSON configuration; missing keys take defaults
    pub fn from_json_str(json: &str) -> SoilResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> SoilResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> SoilResult<()> {
        if !self.timestep_seconds.is_finite() || self.timestep_seconds <= 0.0 {
            return Err(SoilError::invalid(
                "timestep_seconds",
                self.timestep_seconds,
                "must be finite and positive",
            ));
        }
        self.frozen.validate()?;
        require_non_negative(
            "snow_covered_threshold",
            self.routing.snow_covered_threshold,
        )?;
        Ok(())
    }

    /// Timestep length in hours
    pub fn timestep_hours(&self) -> f64 {
        self.timestep_seconds / 3600.0
    }

    /// Number of timesteps per day
    pub fn steps_per_day(&self) -> f64 {
        SECONDS_PER_DAY / self.timestep_seconds
    }
}

/// Which soil layers supply evapotranspiration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtCover {
    /// No transpiration
    Bare,
    /// Recharge layer only (crops)
    Crops,
    /// Both layers (grasses and shrubs)
    #[default]
    GrassShrub,
}

/// Reservoir transfer coefficients
///
/// `rechr_to_ssr`, `lower_to_ssr` and `soil_to_gw` are depths per step (mm);
/// the rest are fractions of the current storage drained per step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferCoefficients {
    pub rechr_to_ssr: f64,
    pub lower_to_ssr: f64,
    pub soil_to_gw: f64,
    pub detention_snow_to_runoff: f64,
    pub detention_organic_to_runoff: f64,
    pub depression_to_ssr: f64,
    pub depression_to_gw: f64,
    pub groundwater_out: f64,
}

impl TransferCoefficients {
    pub fn validate(&self) -> SoilResult<()> {
        require_non_negative("rechr_to_ssr", self.rechr_to_ssr)?;
        require_non_negative("lower_to_ssr", self.lower_to_ssr)?;
        require_non_negative("soil_to_gw", self.soil_to_gw)?;
        require_fraction("detention_snow_to_runoff", self.detention_snow_to_runoff)?;
        require_fraction(
            "detention_organic_to_runoff",
            self.detention_organic_to_runoff,
        )?;
        require_fraction("depression_to_ssr", self.depression_to_ssr)?;
        require_fraction("depression_to_gw", self.depression_to_gw)?;
        require_fraction("groundwater_out", self.groundwater_out)?;
        if self.depression_to_ssr + self.depression_to_gw > 1.0 {
            return Err(SoilError::invalid(
                "depression_to_ssr + depression_to_gw",
                self.depression_to_ssr + self.depression_to_gw,
                "depression drainage cannot exceed the stored water",
            ));
        }
        Ok(())
    }
}

/// Read-only soil column description for one cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilColumnParameters {
    /// Open water cell: infiltration and routing are skipped
    pub is_water: bool,
    pub soil_type: SoilType,
    /// Soil class of the recharge layer (ET regime)
    pub soil_type_rechr: SoilType,
    /// Soil class of the lower layer (ET regime)
    pub soil_type_lower: SoilType,
    pub texture: TextureClass,
    pub ayers_cover: AyersCover,
    pub et_cover: EtCover,
    /// Volume fraction
    pub porosity: f64,
    /// Saturated hydraulic conductivity (mm/h)
    pub saturated_conductivity: f64,
    /// Wetting-front suction head (mm)
    pub air_entry_suction: f64,
    pub pore_size_index: f64,
    /// Total soil depth (m)
    pub soil_depth: f64,
    /// Recharge layer depth (m)
    pub recharge_depth: f64,
    /// Recharge layer capacity (mm)
    pub rechr_max: f64,
    /// Total soil moisture capacity (mm)
    pub soil_max: f64,
    /// Detention capacity while snow covered (mm)
    pub detention_snow_max: f64,
    /// Detention capacity of the organic layer when snow free (mm)
    pub detention_organic_max: f64,
    pub depression_max: f64,
    pub groundwater_max: f64,
    pub coefficients: TransferCoefficients,
}

impl SoilColumnParameters {
    /// Default soil depth (m)
    pub const DEFAULT_SOIL_DEPTH: f64 = 1.0;
    /// Default recharge layer depth (m)
    pub const DEFAULT_RECHARGE_DEPTH: f64 = 0.25;

    /// Derive a column from the soil table; storage maxima follow from
    /// depth and porosity, reservoirs outside the soil start at zero capacity
    pub fn from_soil_type(
        table: &SoilPropertyTable,
        soil_type: SoilType,
        texture: TextureClass,
        ayers_cover: AyersCover,
        soil_depth: f64,
        recharge_depth: f64,
    ) -> SoilResult<Self> {
        let props = table.soil(soil_type);
        let is_sealed = matches!(soil_type, SoilType::Water | SoilType::Pavement);
        let porosity = if is_sealed { 0.0 } else { props.porosity };

        let params = Self {
            is_water: soil_type == SoilType::Water,
            soil_type,
            soil_type_rechr: soil_type,
            soil_type_lower: soil_type,
            texture,
            ayers_cover,
            et_cover: EtCover::default(),
            porosity,
            saturated_conductivity: props.saturated_conductivity,
            air_entry_suction: props.air_entry_suction,
            pore_size_index: props.pore_size_index,
            soil_depth,
            recharge_depth,
            rechr_max: Millimeters::from_meters(recharge_depth).value() * porosity,
            soil_max: Millimeters::from_meters(soil_depth).value() * porosity,
            detention_snow_max: 0.0,
            detention_organic_max: 0.0,
            depression_max: 0.0,
            groundwater_max: 0.0,
            coefficients: TransferCoefficients::default(),
        };
        params.validate()?;
        Ok(params)
    }

    /// A loam column with the default depths and the medium Ayers texture
    pub fn loam(table: &SoilPropertyTable) -> SoilResult<Self> {
        Self::from_soil_type(
            table,
            SoilType::Loam,
            TextureClass::MediumOverMedium,
            AyersCover::PoorPasture,
            Self::DEFAULT_SOIL_DEPTH,
            Self::DEFAULT_RECHARGE_DEPTH,
        )
    }

    pub fn with_et_cover(mut self, cover: EtCover) -> Self {
        self.et_cover = cover;
        self
    }

    pub fn with_layer_soil_types(mut self, rechr: SoilType, lower: SoilType) -> Self {
        self.soil_type_rechr = rechr;
        self.soil_type_lower = lower;
        self
    }

    pub fn with_detention(mut self, snow_max: f64, organic_max: f64) -> Self {
        self.detention_snow_max = snow_max;
        self.detention_organic_max = organic_max;
        self
    }

    pub fn with_depression_max(mut self, max: f64) -> Self {
        self.depression_max = max;
        self
    }

    pub fn with_groundwater_max(mut self, max: f64) -> Self {
        self.groundwater_max = max;
        self
    }

    pub fn with_coefficients(mut self, coefficients: TransferCoefficients) -> Self {
        self.coefficients = coefficients;
        self
    }

    pub fn with_storage_max(mut self, rechr_max: f64, soil_max: f64) -> Self {
        self.rechr_max = rechr_max;
        self.soil_max = soil_max;
        self
    }

    /// Lower layer capacity (mm)
    pub fn lower_max(&self) -> f64 {
        (self.soil_max - self.rechr_max).max(0.0)
    }

    pub fn validate(&self) -> SoilResult<()> {
        if !self.is_water {
            require_fraction("porosity", self.porosity)?;
        }
        require_non_negative("saturated_conductivity", self.saturated_conductivity)?;
        require_non_negative("air_entry_suction", self.air_entry_suction)?;
        require_non_negative("pore_size_index", self.pore_size_index)?;
        require_non_negative("soil_depth", self.soil_depth)?;
        require_non_negative("recharge_depth", self.recharge_depth)?;
        if self.recharge_depth > self.soil_depth {
            return Err(SoilError::invalid(
                "recharge_depth",
                self.recharge_depth,
                "cannot exceed soil_depth",
            ));
        }
        require_non_negative("rechr_max", self.rechr_max)?;
        require_non_negative("soil_max", self.soil_max)?;
        if self.rechr_max > self.soil_max {
            return Err(SoilError::invalid(
                "rechr_max",
                self.rechr_max,
                "cannot exceed soil_max",
            ));
        }
        require_non_negative("detention_snow_max", self.detention_snow_max)?;
        require_non_negative("detention_organic_max", self.detention_organic_max)?;
        require_non_negative("depression_max", self.depression_max)?;
        require_non_negative("groundwater_max", self.groundwater_max)?;
        self.coefficients.validate()
    }
}
