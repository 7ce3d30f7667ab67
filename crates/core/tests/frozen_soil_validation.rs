//! Frozen-soil infiltration checks against Gray et al. (1985, 2001)
use approx::assert_relative_eq;
use soil_infil_core::physics::frozen_soil_validation::{
    depletion_index_raw, max_infiltration_per_melt,
};
use soil_infil_core::{
    CellForcing, Celsius, FrozenSoilConfig, Millimeters, ModelConfig, Percent,
    SoilColumnParameters, SoilDomain, SoilPropertyTable,
};
use std::sync::Arc;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEPLETION INDEX
// ═══════════════════════════════════════════════════════════════════════════════

/// Gray (1985): INF = 5(1 − θ)·SWE^0.584
#[test]
fn test_depletion_index_published_form() {
    let cases = [(50.0, 100.0), (20.0, 60.0), (80.0, 150.0)];
    for (theta, swe) in cases {
        let expected = 5.0 * (1.0 - theta / 100.0) * f64::powf(swe, 0.584);
        assert_relative_eq!(depletion_index_raw(theta, swe), expected, max_relative = 1e-12);
    }
}

/// Wetter soil at freeze-up infiltrates less
#[test]
fn test_depletion_index_decreases_with_moisture() {
    let mut previous = f64::INFINITY;
    for theta in [5.0, 25.0, 50.0, 75.0, 95.0] {
        let index = depletion_index_raw(theta, 100.0);
        assert!(index < previous, "index rose at θ = {theta}%");
        previous = index;
    }
}

#[test]
fn test_per_melt_cap_halves_when_days_double() {
    let raw = depletion_index_raw(50.0, 100.0);
    let three = max_infiltration_per_melt(raw, 3, 86_400.0);
    let six = max_infiltration_per_melt(raw, 6, 86_400.0);
    assert_relative_eq!(three, 2.0 * six, max_relative = 1e-12);
}

#[test]
fn test_per_melt_cap_scales_with_timestep() {
    let raw = depletion_index_raw(50.0, 100.0);
    let daily = max_infiltration_per_melt(raw, 6, 86_400.0);
    let hourly = max_infiltration_per_melt(raw, 6, 3_600.0);
    assert_relative_eq!(daily, 24.0 * hourly, max_relative = 1e-12);
}

// ═══════════════════════════════════════════════════════════════════════════════
// FREEZE CYCLE THROUGH THE DOMAIN
// ═══════════════════════════════════════════════════════════════════════════════

fn single_cell(config: ModelConfig) -> SoilDomain {
    let table = Arc::new(SoilPropertyTable::standard());
    let column = SoilColumnParameters::loam(&table).unwrap();
    SoilDomain::new(config, table, vec![column], Percent::new(30.0)).unwrap()
}

fn melt_day(melt: f64, swe: f64, theta: f64, temperature: f64) -> CellForcing {
    CellForcing {
        swe: Millimeters::new(swe),
        snowmelt: Millimeters::new(melt),
        soil_storage_at_freeze: Percent::new(theta),
        air_temperature: Celsius::new(temperature),
        ..CellForcing::default()
    }
}

#[test]
fn test_limited_cycle_infiltrates_for_max_days_only() {
    let config = ModelConfig::default();
    let mut domain = single_cell(config);

    let mut infiltrating_days = 0;
    let mut swe = 120.0;
    for _ in 0..10 {
        let report = domain.step(&[melt_day(8.0, swe, 50.0, 2.0)]).unwrap();
        if report[0].snow_infiltration > 0.0 {
            infiltrating_days += 1;
        }
        assert_relative_eq!(
            report[0].snow_infiltration + report[0].melt_runoff,
            8.0,
            epsilon = 1e-12
        );
        swe -= 8.0;
    }
    assert_eq!(infiltrating_days, config.frozen.max_inf_days);
}

#[test]
fn test_ice_lens_stops_infiltration() {
    let mut domain = single_cell(ModelConfig::default());

    let first = domain.step(&[melt_day(8.0, 120.0, 50.0, 2.0)]).unwrap();
    assert!(first[0].snow_infiltration > 0.0);

    // Cold snap after infiltration began
    domain.step(&[melt_day(0.0, 112.0, 50.0, -18.0)]).unwrap();

    for day in 0..4 {
        let swe = 104.0 - 8.0 * f64::from(day);
        let report = domain.step(&[melt_day(8.0, swe, 50.0, 3.0)]).unwrap();
        assert_eq!(report[0].snow_infiltration, 0.0);
        assert_eq!(report[0].melt_runoff, 8.0);
    }
}

#[test]
fn test_cold_snap_before_first_major_melt_has_no_effect() {
    let mut domain = single_cell(ModelConfig::default());
    domain.step(&[melt_day(0.0, 120.0, 50.0, -25.0)]).unwrap();
    let report = domain.step(&[melt_day(8.0, 120.0, 50.0, 2.0)]).unwrap();
    assert!(report[0].snow_infiltration > 0.0);
}

#[test]
fn test_restricted_soil_sheds_melt_and_rain() {
    let mut domain = single_cell(ModelConfig::default());
    let forcing = CellForcing {
        rainfall: Millimeters::new(4.0),
        ..melt_day(6.0, 80.0, 100.0, 1.0)
    };
    let report = domain.step(&[forcing]).unwrap();
    assert_eq!(report[0].infiltration, 0.0);
    assert_eq!(report[0].runoff, 10.0);
    assert_eq!(report[0].rain_on_snow, 0.0);
}

#[test]
fn test_unlimited_soil_takes_rain_on_snow() {
    let mut domain = single_cell(ModelConfig::default());
    let forcing = CellForcing {
        rainfall: Millimeters::new(4.0),
        ..melt_day(6.0, 80.0, 0.0, 1.0)
    };
    let report = domain.step(&[forcing]).unwrap();
    assert_eq!(report[0].snow_infiltration, 6.0);
    assert_eq!(report[0].rain_on_snow, 4.0);
    assert_eq!(report[0].infiltration, 10.0);
    assert_eq!(report[0].totals.total_rain_on_snow, 4.0);
}

#[test]
fn test_shallow_snow_stays_thawed() {
    let config = ModelConfig {
        frozen: FrozenSoilConfig {
            min_swe_to_freeze: 25.0,
            ..FrozenSoilConfig::default()
        },
        ..ModelConfig::default()
    };
    let mut domain = single_cell(config);
    domain.step(&[melt_day(3.0, 20.0, 100.0, 1.0)]).unwrap();
    assert!(!domain.cells()[0].state().frozen.frozen);
}
