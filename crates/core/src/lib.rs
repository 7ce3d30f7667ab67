//! Soil Infiltration and Routing Core Library
//!
//! Per-cell, per-timestep infiltration of snowmelt and rainfall into frozen and
//! thawed soils, followed by a two-layer soil moisture balance that routes
//! excess water through detention, depression, groundwater and subsurface
//! flow, and removes evapotranspiration.
//!
//! ## Processes
//!
//! - Gray (1985) areal snowmelt infiltration into frozen soils, with ice lens
//!   sealing and a limited number of infiltration days per freeze cycle
//! - Green-Ampt infiltration with ponding-time detection, or the Ayers (1959)
//!   capacity table, for thawed soil
//! - Thaw-front aware two-layer soil water balance and reservoir cascade
//! - Texture-dependent soil evapotranspiration
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use soil_infil_core::{
//!     CellForcing, Millimeters, ModelConfig, Percent, SoilColumnParameters, SoilDomain,
//!     SoilPropertyTable,
//! };
//!
//! let table = Arc::new(SoilPropertyTable::standard());
//! let column = SoilColumnParameters::loam(&table).unwrap();
//! let columns = vec![column; 4];
//! let mut domain =
//!     SoilDomain::new(ModelConfig::default(), table, columns, Percent::new(40.0)).unwrap();
//!
//! let forcing = CellForcing {
//!     rainfall: Millimeters::new(12.0),
//!     ..CellForcing::default()
//! };
//! let reports = domain.step(&[forcing; 4]).unwrap();
//! assert_eq!(reports.len(), 4);
//! ```

pub mod config;
pub mod core_types;
pub mod error;
pub mod physics;
pub mod simulation;

// Re-export core types
pub use core_types::{
    AyersCover, Celsius, EtRegime, Millimeters, Percent, SoilProperties, SoilPropertyTable,
    SoilType, TextureClass,
};

pub use config::{
    EtCover, FrozenSoilConfig, ModelConfig, RoutingConfig, SoilColumnParameters, ThawMethod,
    TransferCoefficients,
};
pub use error::{SoilError, SoilResult};

pub use physics::{
    create_thawed_method, DepletionIndexState, FrozenPhase, FrozenSoilState, RouterInput,
    RoutingOutcome, SoilMoistureState, ThawFractions, ThawedInfiltration, TwoLayerSoilRouter,
};

pub use simulation::{
    CellForcing, CellInfiltrationState, CumulativeTotals, DomainSnapshot, DomainSummary,
    InfiltrationOrchestrator, InfiltrationOutcome, SoilCell, SoilDomain, TimestepReport,
};
