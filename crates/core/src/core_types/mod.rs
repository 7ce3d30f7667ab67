//! Core types: unit newtypes and the soil property table

pub mod soil;
pub mod units;

pub use soil::{AyersCover, EtRegime, SoilProperties, SoilPropertyTable, SoilType, TextureClass};
pub use units::{Celsius, Millimeters, Percent};
