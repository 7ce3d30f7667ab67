//! Saving and restoring carried soil state between runs
//!
//! A snapshot holds the frozen-soil state, reservoir storages and cumulative
//! totals of every cell, so a long run can be resumed from disk.

use super::state::CellInfiltrationState;
use crate::error::SoilResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Carried state of a whole domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSnapshot {
    /// Timesteps completed when the snapshot was taken
    pub steps_taken: u64,
    /// One entry per cell, in domain order
    pub cells: Vec<CellInfiltrationState>,
}

impl DomainSnapshot {
    /// Load a snapshot from a JSON file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> SoilResult<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let snapshot: Self = serde_json::from_str(&contents)?;
        info!(
            "Loaded snapshot of {} cells from {}",
            snapshot.cells.len(),
            path.as_ref().display()
        );
        Ok(snapshot)
    }

    /// Save the snapshot as pretty-printed JSON
    ///
    /// # Errors
    /// Returns error if the state cannot be serialized or the file cannot be written
    pub fn save<P: AsRef<Path>>(&self, path: P) -> SoilResult<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!(
            "Saved snapshot of {} cells to {}",
            self.cells.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}
