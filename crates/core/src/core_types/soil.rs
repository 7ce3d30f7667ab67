//! Static soil, texture and ground-cover property tables
//!
//! The table values are the CRHM/CHM Green-Ampt soil classes and the Ayers
//! (1959) texture/cover infiltration capacities. They are loaded once into an
//! immutable [`SoilPropertyTable`] shared by reference across all cells.
//!
//! # References
//! - Rawls, W.J., Brakensiek, D.L., Miller, N. (1983). "Green-Ampt infiltration
//!   parameters from soils data". Journal of Hydraulic Engineering, 109(1), 62-70
//! - Ayers, H.D. (1959). "Influence of soil profile and vegetation
//!   characteristics on net rainfall supply to runoff". Proceedings of
//!   Hydrology Symposium No. 1, National Research Council of Canada, 198-205

use crate::error::{SoilError, SoilResult};
use serde::{Deserialize, Serialize};

/// Soil class used by Green-Ampt and the soil ET availability regimes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilType {
    Water,
    Sand,
    LoamySand,
    SandyLoam,
    Loam,
    SiltLoam,
    SandyClayLoam,
    ClayLoam,
    SiltyClayLoam,
    SandyClay,
    SiltyClay,
    Clay,
    /// Sealed surface; all rainfall runs off
    Pavement,
}

impl SoilType {
    /// All soil classes in table order
    pub const ALL: [SoilType; 13] = [
        SoilType::Water,
        SoilType::Sand,
        SoilType::LoamySand,
        SoilType::SandyLoam,
        SoilType::Loam,
        SoilType::SiltLoam,
        SoilType::SandyClayLoam,
        SoilType::ClayLoam,
        SoilType::SiltyClayLoam,
        SoilType::SandyClay,
        SoilType::SiltyClay,
        SoilType::Clay,
        SoilType::Pavement,
    ];

    /// Look up a soil class by its numeric id (0 = water … 12 = pavement)
    pub fn from_id(id: u8) -> SoilResult<Self> {
        Self::ALL
            .get(usize::from(id))
            .copied()
            .ok_or(SoilError::UnknownSoilType(id))
    }

    /// Numeric id (row in the property table)
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Get soil class name
    pub fn name(self) -> &'static str {
        match self {
            SoilType::Water => "Water",
            SoilType::Sand => "Sand",
            SoilType::LoamySand => "Loamy sand",
            SoilType::SandyLoam => "Sandy loam",
            SoilType::Loam => "Loam",
            SoilType::SiltLoam => "Silt loam",
            SoilType::SandyClayLoam => "Sandy clay loam",
            SoilType::ClayLoam => "Clay loam",
            SoilType::SiltyClayLoam => "Silty clay loam",
            SoilType::SandyClay => "Sandy clay",
            SoilType::SiltyClay => "Silty clay",
            SoilType::Clay => "Clay",
            SoilType::Pavement => "Pavement",
        }
    }
}

/// How evapotranspiration is throttled as a layer dries out
///
/// Each soil class carries one regime in its availability column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtRegime {
    /// Coarse soils: ET halved-and-scaled below 25% availability
    Coarse,
    /// Medium soils: ET scaled linearly below 50% availability
    Medium,
    /// Fine soils: two-piece scaling with breaks at 33% and 67%
    Fine,
    /// No ET from this layer
    None,
}

/// Ayers texture class (profile description)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureClass {
    CoarseOverCoarse,
    MediumOverMedium,
    MediumFineOverFine,
    SoilOverShallowBedrock,
}

impl TextureClass {
    pub const ALL: [TextureClass; 4] = [
        TextureClass::CoarseOverCoarse,
        TextureClass::MediumOverMedium,
        TextureClass::MediumFineOverFine,
        TextureClass::SoilOverShallowBedrock,
    ];

    pub fn from_id(id: u8) -> SoilResult<Self> {
        Self::ALL
            .get(usize::from(id))
            .copied()
            .ok_or(SoilError::UnknownTexture(id))
    }
}

/// Ayers ground-cover column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AyersCover {
    BareSoil,
    RowCrops,
    PoorPasture,
    SmallGrains,
    GoodPasture,
    Forested,
}

impl AyersCover {
    pub const ALL: [AyersCover; 6] = [
        AyersCover::BareSoil,
        AyersCover::RowCrops,
        AyersCover::PoorPasture,
        AyersCover::SmallGrains,
        AyersCover::GoodPasture,
        AyersCover::Forested,
    ];

    pub fn from_id(id: u8) -> SoilResult<Self> {
        Self::ALL
            .get(usize::from(id))
            .copied()
            .ok_or(SoilError::UnknownCover(id))
    }
}

/// Hydraulic properties of one soil class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilProperties {
    /// Wetting-front (air-entry) suction head (mm)
    pub air_entry_suction: f64,
    /// Saturated hydraulic conductivity (mm/h)
    pub saturated_conductivity: f64,
    /// Wilting point (volume fraction)
    pub wilt_point: f64,
    /// Field capacity (volume fraction)
    pub field_capacity: f64,
    /// Total porosity (volume fraction)
    pub porosity: f64,
    /// Effective porosity (volume fraction)
    pub effective_porosity: f64,
    /// Bubbling pressure / air-entry tension (m)
    pub air_entry_tension: f64,
    /// Brooks-Corey pore-size distribution index
    pub pore_size_index: f64,
    /// ET availability regime
    pub et_regime: EtRegime,
}

#[allow(clippy::too_many_arguments)]
const fn props(
    suction: f64,
    ksat: f64,
    wilt: f64,
    fcap: f64,
    porosity: f64,
    effective: f64,
    tension: f64,
    pore_size: f64,
    et_regime: EtRegime,
) -> SoilProperties {
    SoilProperties {
        air_entry_suction: suction,
        saturated_conductivity: ksat,
        wilt_point: wilt,
        field_capacity: fcap,
        porosity,
        effective_porosity: effective,
        air_entry_tension: tension,
        pore_size_index: pore_size,
        et_regime,
    }
}

use EtRegime::{Coarse, Fine, Medium, None as NoEt};

/// Rows in `SoilType` order
const SOIL_PROPERTIES: [SoilProperties; 13] = [
    props(0.0, 999.9, 0.000, 0.00, 1.100, 1.000, 0.000, 0.0, NoEt),
    props(49.5, 117.8, 0.020, 0.10, 0.437, 0.395, 0.121, 4.05, Coarse),
    props(61.3, 29.9, 0.036, 0.16, 0.437, 0.41, 0.09, 4.38, NoEt),
    props(110.1, 10.9, 0.041, 0.23, 0.453, 0.435, 0.218, 4.9, Medium),
    props(88.9, 3.4, 0.029, 0.26, 0.463, 0.451, 0.478, 5.39, Medium),
    props(166.8, 6.5, 0.045, 0.38, 0.501, 0.485, 0.786, 5.3, Medium),
    props(218.5, 1.5, 0.068, 0.38, 0.398, 0.420, 0.299, 7.12, Fine),
    props(208.8, 1.0, 0.155, 0.39, 0.464, 0.476, 0.63, 8.52, Medium),
    props(273.3, 1.0, 0.039, 0.40, 0.471, 0.477, 0.356, 7.75, Medium),
    props(239.0, 0.6, 0.110, 0.41, 0.430, 0.426, 0.153, 10.4, Fine),
    props(292.2, 0.5, 0.056, 0.43, 0.479, 0.492, 0.49, 10.4, Fine),
    props(316.3, 0.3, 0.090, 0.46, 0.475, 0.482, 0.405, 11.4, Fine),
    props(0.0, 0.0, 0.000, 0.00, 0.000, 0.000, 0.0, 0.0, NoEt),
];

/// Ayers infiltration capacity (mm/h), rows in `TextureClass` order,
/// columns in `AyersCover` order
const TEXTURE_CAPACITY: [[f64; 6]; 4] = [
    [7.6, 12.7, 15.2, 17.8, 25.4, 76.2],
    [2.5, 5.1, 7.6, 10.2, 12.7, 15.2],
    [1.3, 1.8, 2.5, 3.8, 5.1, 6.4],
    [0.5, 0.5, 0.5, 0.5, 0.5, 0.5],
];

/// Immutable soil lookup table shared by all cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilPropertyTable {
    soils: [SoilProperties; 13],
    texture_capacity: [[f64; 6]; 4],
}

impl Default for SoilPropertyTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl SoilPropertyTable {
    /// The published soil and texture tables
    pub fn standard() -> Self {
        Self {
            soils: SOIL_PROPERTIES,
            texture_capacity: TEXTURE_CAPACITY,
        }
    }

    /// Build a table with a custom Ayers capacity grid (mm/h)
    pub fn with_texture_capacity(mut self, capacity: [[f64; 6]; 4]) -> SoilResult<Self> {
        for value in capacity.iter().flatten() {
            if !value.is_finite() || *value < 0.0 {
                return Err(SoilError::invalid(
                    "texture_capacity",
                    *value,
                    "must be finite and non-negative",
                ));
            }
        }
        self.texture_capacity = capacity;
        Ok(self)
    }

    /// Properties of one soil class
    pub fn soil(&self, soil_type: SoilType) -> &SoilProperties {
        &self.soils[usize::from(soil_type.id())]
    }

    pub fn porosity(&self, soil_type: SoilType) -> f64 {
        self.soil(soil_type).porosity
    }

    pub fn air_entry_suction(&self, soil_type: SoilType) -> f64 {
        self.soil(soil_type).air_entry_suction
    }

    pub fn saturated_conductivity(&self, soil_type: SoilType) -> f64 {
        self.soil(soil_type).saturated_conductivity
    }

    pub fn pore_size_index(&self, soil_type: SoilType) -> f64 {
        self.soil(soil_type).pore_size_index
    }

    pub fn et_regime(&self, soil_type: SoilType) -> EtRegime {
        self.soil(soil_type).et_regime
    }

    /// Ayers maximum infiltration rate (mm/h)
    pub fn ayers_capacity(&self, texture: TextureClass, cover: AyersCover) -> f64 {
        self.texture_capacity[texture as usize][cover as usize]
    }
}
