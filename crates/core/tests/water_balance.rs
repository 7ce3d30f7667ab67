//! Whole-season water balance and reservoir invariants over randomized forcing
use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use soil_infil_core::{
    AyersCover, CellForcing, Celsius, DomainSnapshot, DomainSummary, EtCover, Millimeters,
    ModelConfig, Percent, SoilColumnParameters, SoilDomain, SoilPropertyTable, SoilType,
    TextureClass, ThawMethod, TimestepReport, TransferCoefficients,
};
use std::sync::Arc;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const MASS_TOLERANCE: f64 = 1e-9;

fn coefficients() -> TransferCoefficients {
    TransferCoefficients {
        rechr_to_ssr: 0.4,
        lower_to_ssr: 0.3,
        soil_to_gw: 2.0,
        detention_snow_to_runoff: 0.1,
        detention_organic_to_runoff: 0.25,
        depression_to_ssr: 0.02,
        depression_to_gw: 0.05,
        groundwater_out: 0.02,
    }
}

fn mixed_columns(table: &SoilPropertyTable) -> Vec<SoilColumnParameters> {
    let soils = [
        (SoilType::Sand, TextureClass::CoarseOverCoarse, EtCover::GrassShrub),
        (SoilType::Loam, TextureClass::MediumOverMedium, EtCover::Crops),
        (SoilType::Clay, TextureClass::MediumFineOverFine, EtCover::GrassShrub),
        (SoilType::SiltLoam, TextureClass::MediumOverMedium, EtCover::Bare),
        (SoilType::Pavement, TextureClass::SoilOverShallowBedrock, EtCover::Bare),
        (SoilType::Water, TextureClass::CoarseOverCoarse, EtCover::Bare),
    ];
    soils
        .iter()
        .map(|&(soil, texture, cover)| {
            SoilColumnParameters::from_soil_type(
                table,
                soil,
                texture,
                AyersCover::GoodPasture,
                1.0,
                0.3,
            )
            .unwrap()
            .with_et_cover(cover)
            .with_detention(4.0, 2.0)
            .with_depression_max(15.0)
            .with_groundwater_max(150.0)
            .with_coefficients(coefficients())
        })
        .collect()
}

/// A depth in `[0, max)` with probability `p`, otherwise zero
fn sometimes(rng: &mut StdRng, p: f64, max: f64) -> f64 {
    if rng.random_bool(p) {
        rng.random_range(0.0..max)
    } else {
        0.0
    }
}

fn random_forcing(rng: &mut StdRng, day: usize, n: usize) -> Vec<CellForcing> {
    let winter = day < 60;
    (0..n)
        .map(|_| {
            let swe = if winter {
                rng.random_range(30.0..150.0)
            } else {
                rng.random_range(0.0..5.0)
            };
            let thaw = if winter { rng.random_range(0.0..400.0) } else { 0.0 };
            let freeze = if winter { rng.random_range(0.0..1200.0) } else { 0.0 };
            CellForcing {
                swe: Millimeters::new(swe),
                snowmelt: Millimeters::new(sometimes(rng, 0.4, 20.0)),
                rainfall: Millimeters::new(sometimes(rng, 0.3, 60.0)),
                soil_storage_at_freeze: Percent::new(rng.random_range(0.0..=100.0)),
                air_temperature: Celsius::new(rng.random_range(-25.0..25.0)),
                thaw_front_depth: Millimeters::new(thaw),
                freeze_front_depth: Millimeters::new(freeze),
                potential_et: Millimeters::new(rng.random_range(-0.5..6.0)),
                routing_residual: Millimeters::new(sometimes(rng, 0.1, 3.0)),
            }
        })
        .collect()
}

fn check_report(report: &TimestepReport, forcing: &CellForcing, params: &SoilColumnParameters) {
    if params.is_water {
        assert!(report.is_not_applicable());
        assert_eq!(report.actual_et, forcing.potential_et.value());
        return;
    }

    let residual = report.water_balance_residual(
        forcing.snowmelt.value(),
        forcing.rainfall.value(),
        forcing.routing_residual.value(),
    );
    assert_abs_diff_eq!(residual, 0.0, epsilon = MASS_TOLERANCE);

    let melt = forcing.snowmelt.value().max(0.0);
    let rain = forcing.rainfall.value().max(0.0);
    assert_abs_diff_eq!(report.infiltration + report.runoff, melt + rain, epsilon = MASS_TOLERANCE);
    assert!(report.snow_infiltration <= melt + MASS_TOLERANCE);
    assert!(report.melt_runoff <= report.runoff + MASS_TOLERANCE);

    assert!(report.soil_storage >= -MASS_TOLERANCE);
    assert!(report.soil_storage <= params.soil_max + MASS_TOLERANCE);
    assert!(report.soil_rechr_storage >= -MASS_TOLERANCE);
    assert!(report.soil_rechr_storage <= params.rechr_max + MASS_TOLERANCE);
    assert!(report.soil_rechr_storage <= report.soil_storage + MASS_TOLERANCE);
    assert!(report.detention_storage >= 0.0);
    let detention_max = params.detention_snow_max.max(params.detention_organic_max);
    assert!(report.detention_storage <= detention_max + MASS_TOLERANCE);
    assert!(report.depression_storage >= 0.0);
    assert!(report.depression_storage <= params.depression_max + MASS_TOLERANCE);
    assert!(report.groundwater_storage >= 0.0);
    assert!(report.groundwater_storage <= params.groundwater_max + MASS_TOLERANCE);
    assert!(report.actual_et <= forcing.potential_et.value().max(0.0) + MASS_TOLERANCE);
}

fn run_season(method: ThawMethod, seed: u64) {
    let table = Arc::new(SoilPropertyTable::standard());
    let columns = mixed_columns(&table);
    let config = ModelConfig {
        thaw_method: method,
        ..ModelConfig::default()
    };
    let mut domain =
        SoilDomain::new(config, table, columns.clone(), Percent::new(35.0)).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut previous_totals = vec![0.0; columns.len()];
    for day in 0..150 {
        let forcing = random_forcing(&mut rng, day, columns.len());
        let reports = domain.step(&forcing).unwrap();
        for (i, ((report, f), params)) in reports.iter().zip(&forcing).zip(&columns).enumerate() {
            check_report(report, f, params);
            if !params.is_water {
                assert!(report.totals.total_inf >= previous_totals[i]);
                previous_totals[i] = report.totals.total_inf;
            }
        }
    }
}

#[test]
fn test_season_water_balance_ayers() {
    run_season(ThawMethod::Ayers, 7);
}

#[test]
fn test_season_water_balance_green_ampt() {
    run_season(ThawMethod::GreenAmpt, 42);
}

#[test]
fn test_totals_match_sum_of_steps() {
    let table = Arc::new(SoilPropertyTable::standard());
    let column = SoilColumnParameters::loam(&table).unwrap();
    let mut domain =
        SoilDomain::new(ModelConfig::default(), table, vec![column], Percent::new(30.0)).unwrap();
    let mut rng = StdRng::seed_from_u64(3);

    let (mut inf, mut excess, mut snowinf) = (0.0, 0.0, 0.0);
    let mut last = None;
    for day in 0..90 {
        let forcing = random_forcing(&mut rng, day, 1);
        let report = domain.step(&forcing).unwrap()[0];
        inf += report.infiltration;
        excess += report.runoff;
        snowinf += report.snow_infiltration;
        last = Some(report);
    }
    let totals = last.unwrap().totals;
    assert_abs_diff_eq!(totals.total_inf, inf, epsilon = 1e-9);
    assert_abs_diff_eq!(totals.total_excess, excess, epsilon = 1e-9);
    assert_abs_diff_eq!(totals.total_snowinf, snowinf, epsilon = 1e-9);
}

#[test]
fn test_domain_summary_over_season() {
    let table = Arc::new(SoilPropertyTable::standard());
    let columns = mixed_columns(&table);
    let config = ModelConfig::default();
    let mut domain = SoilDomain::new(config, table, columns.clone(), Percent::new(35.0)).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let forcing = random_forcing(&mut rng, 100, columns.len());
    let reports = domain.step(&forcing).unwrap();
    let summary = DomainSummary::from_reports(&reports);
    assert_eq!(summary.water_cells, 1);
    assert_eq!(summary.soil_cells, columns.len() - 1);
}

#[test]
fn test_snapshot_resume_matches_continuous_run() {
    let table = Arc::new(SoilPropertyTable::standard());
    let columns = mixed_columns(&table);
    let config = ModelConfig::default();
    let mut rng = StdRng::seed_from_u64(99);
    let season: Vec<Vec<CellForcing>> =
        (0..40).map(|day| random_forcing(&mut rng, day, columns.len())).collect();

    let mut continuous =
        SoilDomain::new(config, Arc::clone(&table), columns.clone(), Percent::new(35.0)).unwrap();
    for forcing in &season {
        continuous.step(forcing).unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("halfway.json");
    let mut first_half =
        SoilDomain::new(config, Arc::clone(&table), columns.clone(), Percent::new(35.0)).unwrap();
    for forcing in &season[..20] {
        first_half.step(forcing).unwrap();
    }
    first_half.snapshot().save(&path).unwrap();

    let mut resumed = SoilDomain::new(config, table, columns, Percent::new(35.0)).unwrap();
    resumed.restore(&DomainSnapshot::load(&path).unwrap()).unwrap();
    for forcing in &season[20..] {
        resumed.step(forcing).unwrap();
    }

    assert_eq!(resumed.steps_taken(), continuous.steps_taken());
    for (a, b) in resumed.cells().iter().zip(continuous.cells()) {
        assert_eq!(a.state(), b.state());
    }
}
