//! Ayers Infiltration Capacity Lookup (1959)
//!
//! Infiltration capacity on thawed soil is read from a table of rates indexed
//! by soil texture and ground cover. Rain up to the capacity infiltrates and
//! the rest runs off. Storage overflow is left to the soil layer routing.
//!
//! # Scientific References
//! - Ayers, H.D. (1959). "Influence of soil profile and vegetation
//!   characteristics on net rainfall supply to runoff". Proceedings of
//!   Hydrology Symposium No. 1: Spillway Design Floods, NRCC, Ottawa, 198-205

/// Split of one step's rainfall (mm)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AyersOutcome {
    pub infiltration: f64,
    pub runoff: f64,
}

/// Partition rain against a tabulated capacity
///
/// # Arguments
/// * `capacity_rate` - Infiltration capacity for the texture and cover (mm/h)
/// * `rainfall` - Rain for the step (mm)
/// * `dt_hours` - Step length (h)
pub fn infiltrate(capacity_rate: f64, rainfall: f64, dt_hours: f64) -> AyersOutcome {
    if rainfall <= 0.0 {
        return AyersOutcome::default();
    }

    let capacity = (capacity_rate * dt_hours).max(0.0);
    if rainfall <= capacity {
        AyersOutcome {
            infiltration: rainfall,
            runoff: 0.0,
        }
    } else {
        AyersOutcome {
            infiltration: capacity,
            runoff: rainfall - capacity,
        }
    }
}
