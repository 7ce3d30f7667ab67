//! Cell and domain stepping
//!
//! A [`SoilDomain`] owns one [`SoilCell`] per model cell and advances them all
//! one timestep at a time. Cells share nothing mutable, so the step runs in
//! parallel across cells with rayon. Each cell-step runs the infiltration stage
//! and then the soil layer routing cascade.

pub mod orchestrator;
pub mod persistence;
pub mod state;

pub use orchestrator::InfiltrationOrchestrator;
pub use persistence::DomainSnapshot;
pub use state::{
    CellForcing, CellInfiltrationState, CumulativeTotals, InfiltrationOutcome, TimestepReport,
};

use crate::config::{ModelConfig, SoilColumnParameters};
use crate::core_types::soil::SoilPropertyTable;
use crate::core_types::units::Percent;
use crate::error::{SoilError, SoilResult};
use crate::physics::{soil_et, RouterInput, TwoLayerSoilRouter};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One soil column and its carried state
#[derive(Debug, Clone, PartialEq)]
pub struct SoilCell {
    params: SoilColumnParameters,
    state: CellInfiltrationState,
}

impl SoilCell {
    /// # Errors
    /// Invalid column parameters.
    pub fn new(params: SoilColumnParameters, initial_moisture: Percent) -> SoilResult<Self> {
        params.validate()?;
        if params.is_water && params.soil_max > 0.0 {
            warn!(
                "Open-water column has {:.1} mm soil capacity configured; it will not be used",
                params.soil_max
            );
        }
        let state = CellInfiltrationState::new(&params, initial_moisture);
        Ok(Self { params, state })
    }

    pub fn params(&self) -> &SoilColumnParameters {
        &self.params
    }

    pub fn state(&self) -> &CellInfiltrationState {
        &self.state
    }

    /// Advance this cell by one timestep
    ///
    /// # Errors
    /// Numerical failure in the infiltration stage; the cell state is left as
    /// it was before the step.
    pub fn step(
        &mut self,
        orchestrator: &InfiltrationOrchestrator,
        table: &SoilPropertyTable,
        forcing: &CellForcing,
    ) -> SoilResult<TimestepReport> {
        let (next, report) = self.advance(orchestrator, table, forcing)?;
        self.state = next;
        Ok(report)
    }

    /// Compute the state after one timestep without committing it
    ///
    /// # Errors
    /// Numerical failure in the infiltration stage.
    pub fn advance(
        &self,
        orchestrator: &InfiltrationOrchestrator,
        table: &SoilPropertyTable,
        forcing: &CellForcing,
    ) -> SoilResult<(CellInfiltrationState, TimestepReport)> {
        if self.params.is_water {
            let mut soil = self.state.soil;
            let et = soil_et::actual_et(
                &mut soil,
                &self.params,
                table,
                forcing.potential_et.value(),
            );
            return Ok((self.state, TimestepReport::not_applicable(et)));
        }

        let mut next = self.state;
        let before = next.soil.total();

        let infiltration = orchestrator.infiltrate(&self.params, &mut next, forcing)?;

        let routing = &orchestrator.config().routing;
        let router = TwoLayerSoilRouter::new(&self.params, routing, table);
        let input = RouterInput {
            infiltration: infiltration.infiltration,
            runoff: infiltration.runoff,
            routing_residual: forcing.routing_residual.non_negative().value(),
            potential_et: if forcing.potential_et.is_finite() {
                forcing.potential_et.value()
            } else {
                0.0
            },
            swe: forcing.swe.value(),
            thaw_front_depth: forcing.thaw_front_depth.value(),
            freeze_front_depth: forcing.freeze_front_depth.value(),
        };
        let routed = router.route(&mut next.soil, &input);

        let soil = &next.soil;
        let report = TimestepReport {
            infiltration: infiltration.infiltration,
            snow_infiltration: infiltration.snow_infiltration,
            runoff: infiltration.runoff,
            melt_runoff: infiltration.melt_runoff,
            rain_on_snow: infiltration.rain_on_snow,
            condensation: routed.condensation,
            actual_et: routed.actual_et,
            soil_excess_to_runoff: routed.soil_excess_to_runoff,
            soil_excess_to_gw: routed.soil_excess_to_gw,
            groundwater_outflow: routed.groundwater_outflow,
            soil_to_ssr: routed.soil_to_ssr,
            soil_storage: soil.soil_storage,
            soil_rechr_storage: soil.soil_rechr_storage,
            detention_storage: soil.detention_storage,
            depression_storage: soil.depression_storage,
            groundwater_storage: soil.groundwater_storage,
            totals: next.totals,
            storage_change: soil.total() - before,
        };
        Ok((next, report))
    }
}

/// Domain-wide totals for one step (mm, summed over soil cells)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DomainSummary {
    pub soil_cells: usize,
    pub water_cells: usize,
    pub infiltration: f64,
    pub runoff: f64,
    pub soil_excess_to_runoff: f64,
    pub soil_to_ssr: f64,
    pub groundwater_outflow: f64,
    pub actual_et: f64,
    pub mean_soil_storage: f64,
}

impl DomainSummary {
    /// Sum the reports of one step; open-water cells only add ET
    pub fn from_reports(reports: &[TimestepReport]) -> Self {
        let mut summary = reports.iter().fold(Self::default(), |mut acc, r| {
            acc.actual_et += r.actual_et;
            if r.is_not_applicable() {
                acc.water_cells += 1;
            } else {
                acc.soil_cells += 1;
                acc.infiltration += r.infiltration;
                acc.runoff += r.runoff;
                acc.soil_excess_to_runoff += r.soil_excess_to_runoff;
                acc.soil_to_ssr += r.soil_to_ssr;
                acc.groundwater_outflow += r.groundwater_outflow;
                acc.mean_soil_storage += r.soil_storage;
            }
            acc
        });
        if summary.soil_cells > 0 {
            summary.mean_soil_storage /= summary.soil_cells as f64;
        }
        summary
    }
}

/// A set of independent soil cells stepped together
#[derive(Debug)]
pub struct SoilDomain {
    table: Arc<SoilPropertyTable>,
    orchestrator: InfiltrationOrchestrator,
    cells: Vec<SoilCell>,
    steps_taken: u64,
}

impl SoilDomain {
    /// Build a domain with every cell at the same initial moisture
    ///
    /// # Errors
    /// Invalid run configuration or column parameters; the failing cell index
    /// is attached.
    pub fn new(
        config: ModelConfig,
        table: Arc<SoilPropertyTable>,
        columns: Vec<SoilColumnParameters>,
        initial_moisture: Percent,
    ) -> SoilResult<Self> {
        let orchestrator = InfiltrationOrchestrator::new(config, Arc::clone(&table))?;
        let cells = columns
            .into_iter()
            .enumerate()
            .map(|(i, params)| SoilCell::new(params, initial_moisture).map_err(|e| e.in_cell(i)))
            .collect::<SoilResult<Vec<_>>>()?;

        info!(
            "Soil domain ready: {} cells, {:?} thawed infiltration, {} s timestep",
            cells.len(),
            config.thaw_method,
            config.timestep_seconds
        );

        Ok(Self {
            table,
            orchestrator,
            cells,
            steps_taken: 0,
        })
    }

    pub fn cells(&self) -> &[SoilCell] {
        &self.cells
    }

    pub fn config(&self) -> &ModelConfig {
        self.orchestrator.config()
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Advance every cell by one timestep
    ///
    /// Either every cell advances or none does.
    ///
    /// # Errors
    /// Forcing length mismatch, or the first cell error encountered. On error
    /// the domain is left exactly as it was before the call.
    pub fn step(&mut self, forcing: &[CellForcing]) -> SoilResult<Vec<TimestepReport>> {
        if forcing.len() != self.cells.len() {
            return Err(SoilError::ForcingLength {
                expected: self.cells.len(),
                actual: forcing.len(),
            });
        }

        let orchestrator = &self.orchestrator;
        let table = self.table.as_ref();
        let advanced = self
            .cells
            .par_iter()
            .zip(forcing.par_iter())
            .enumerate()
            .map(|(i, (cell, f))| cell.advance(orchestrator, table, f).map_err(|e| e.in_cell(i)))
            .collect::<SoilResult<Vec<_>>>()?;

        let reports = self
            .cells
            .iter_mut()
            .zip(advanced)
            .map(|(cell, (next, report))| {
                cell.state = next;
                report
            })
            .collect::<Vec<_>>();

        self.steps_taken += 1;
        let summary = DomainSummary::from_reports(&reports);
        debug!(
            "Step {}: infiltration {:.3} mm, runoff {:.3} mm, ET {:.3} mm",
            self.steps_taken,
            summary.infiltration,
            summary.soil_excess_to_runoff,
            summary.actual_et
        );

        Ok(reports)
    }

    /// Capture the carried state of every cell
    pub fn snapshot(&self) -> DomainSnapshot {
        DomainSnapshot {
            steps_taken: self.steps_taken,
            cells: self.cells.iter().map(|c| c.state).collect(),
        }
    }

    /// Replace the carried state of every cell
    ///
    /// # Errors
    /// [`SoilError::Snapshot`] if the snapshot was taken from a different
    /// number of cells.
    pub fn restore(&mut self, snapshot: &DomainSnapshot) -> SoilResult<()> {
        if snapshot.cells.len() != self.cells.len() {
            return Err(SoilError::Snapshot(format!(
                "{} cells in snapshot, {} in domain",
                snapshot.cells.len(),
                self.cells.len()
            )));
        }
        for (cell, state) in self.cells.iter_mut().zip(&snapshot.cells) {
            cell.state = *state;
        }
        self.steps_taken = snapshot.steps_taken;
        info!("Restored soil state at step {}", snapshot.steps_taken);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThawMethod;
    use crate::core_types::soil::SoilType;
    use crate::core_types::units::Millimeters;

    fn domain(n: usize) -> SoilDomain {
        let table = Arc::new(SoilPropertyTable::standard());
        let column = SoilColumnParameters::loam(&table).unwrap();
        SoilDomain::new(
            ModelConfig::default(),
            table,
            vec![column; n],
            Percent::new(30.0),
        )
        .unwrap()
    }

    #[test]
    fn test_forcing_length_checked() {
        let mut domain = domain(3);
        let result = domain.step(&[CellForcing::default(); 2]);
        assert!(matches!(
            result,
            Err(SoilError::ForcingLength {
                expected: 3,
                actual: 2
            })
        ));
        assert_eq!(domain.steps_taken(), 0);
    }

    #[test]
    fn test_cells_step_independently() {
        let mut domain = domain(2);
        let wet = CellForcing {
            rainfall: Millimeters::new(20.0),
            ..CellForcing::default()
        };
        let reports = domain.step(&[wet, CellForcing::default()]).unwrap();
        assert!(reports[0].infiltration > 0.0);
        assert_eq!(reports[1].infiltration, 0.0);
        let storage = |i: usize| domain.cells()[i].state().soil.soil_storage;
        assert!(storage(0) > storage(1));
    }

    #[test]
    fn test_water_cell_sentinel() {
        let table = Arc::new(SoilPropertyTable::standard());
        let lake = SoilColumnParameters::from_soil_type(
            &table,
            SoilType::Water,
            crate::core_types::soil::TextureClass::CoarseOverCoarse,
            crate::core_types::soil::AyersCover::BareSoil,
            1.0,
            0.25,
        )
        .unwrap();
        let mut cell = SoilCell::new(lake, Percent::new(0.0)).unwrap();
        let orchestrator =
            InfiltrationOrchestrator::new(ModelConfig::default(), table.clone()).unwrap();
        let forcing = CellForcing {
            rainfall: Millimeters::new(10.0),
            potential_et: Millimeters::new(4.0),
            ..CellForcing::default()
        };
        let report = cell.step(&orchestrator, &table, &forcing).unwrap();
        assert!(report.is_not_applicable());
        assert_eq!(report.actual_et, 4.0);
        assert_eq!(cell.state().totals, CumulativeTotals::default());
    }

    #[test]
    fn test_summary_skips_water_cells() {
        let reports = [
            TimestepReport::not_applicable(2.0),
            TimestepReport {
                infiltration: 4.0,
                soil_storage: 100.0,
                actual_et: 1.0,
                ..TimestepReport::not_applicable(0.0)
            },
        ];
        let summary = DomainSummary::from_reports(&reports);
        assert_eq!(summary.water_cells, 1);
        assert_eq!(summary.soil_cells, 1);
        assert_eq!(summary.actual_et, 3.0);
        assert_eq!(summary.mean_soil_storage, 100.0);
    }

    fn domain_with_stiff_cell(n: usize) -> SoilDomain {
        let table = Arc::new(SoilPropertyTable::standard());
        let loam = SoilColumnParameters::loam(&table).unwrap();
        let mut stiff = loam;
        stiff.air_entry_suction = 1.0e6;
        stiff.saturated_conductivity = 0.1;
        let mut columns = vec![loam; n - 1];
        columns.push(stiff);
        let config = ModelConfig {
            timestep_seconds: 60.0,
            thaw_method: ThawMethod::GreenAmpt,
            ..ModelConfig::default()
        };
        SoilDomain::new(config, table, columns, Percent::new(30.0)).unwrap()
    }

    #[test]
    fn test_failed_step_leaves_domain_untouched() {
        let mut domain = domain_with_stiff_cell(64);
        let before = domain.snapshot();
        let rain = CellForcing {
            rainfall: Millimeters::new(10.0),
            ..CellForcing::default()
        };

        let result = domain.step(&[rain; 64]);
        match result {
            Err(SoilError::Cell { cell, source }) => {
                assert_eq!(cell, 63);
                assert!(matches!(*source, SoilError::NonConvergence { .. }));
            }
            other => panic!("expected a cell error, got {other:?}"),
        }
        assert_eq!(domain.snapshot(), before);

        // Retrying fails the same way and still advances nothing
        assert!(domain.step(&[rain; 64]).is_err());
        assert_eq!(domain.snapshot(), before);
    }

    #[test]
    fn test_cell_advance_does_not_commit() {
        let table = Arc::new(SoilPropertyTable::standard());
        let column = SoilColumnParameters::loam(&table).unwrap();
        let cell = SoilCell::new(column, Percent::new(30.0)).unwrap();
        let orchestrator =
            InfiltrationOrchestrator::new(ModelConfig::default(), table.clone()).unwrap();
        let rain = CellForcing {
            rainfall: Millimeters::new(12.0),
            ..CellForcing::default()
        };

        let (next, report) = cell.advance(&orchestrator, &table, &rain).unwrap();
        assert!(report.infiltration > 0.0);
        assert!(next.soil.soil_storage > cell.state().soil.soil_storage);
        assert_eq!(next.totals.total_inf, report.infiltration);
        assert_eq!(cell.state().totals, CumulativeTotals::default());
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut domain = domain(2);
        let wet = CellForcing {
            rainfall: Millimeters::new(15.0),
            ..CellForcing::default()
        };
        domain.step(&[wet; 2]).unwrap();
        let snapshot = domain.snapshot();
        domain.step(&[wet; 2]).unwrap();
        domain.restore(&snapshot).unwrap();
        assert_eq!(domain.steps_taken(), 1);
        assert_eq!(domain.cells()[0].state(), &snapshot.cells[0]);
    }
}
