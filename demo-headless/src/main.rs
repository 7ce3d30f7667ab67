use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use soil_infil_core::{
    AyersCover, CellForcing, Celsius, DomainSnapshot, DomainSummary, Millimeters, ModelConfig,
    Percent, SoilColumnParameters, SoilDomain, SoilPropertyTable, SoilType, TextureClass,
    ThawMethod, TransferCoefficients,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Method {
    Ayers,
    GreenAmpt,
}

impl From<Method> for ThawMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Ayers => ThawMethod::Ayers,
            Method::GreenAmpt => ThawMethod::GreenAmpt,
        }
    }
}

/// Soil infiltration demo over a synthetic snowmelt season
#[derive(Parser, Debug)]
#[command(name = "soil-infil-demo")]
#[command(about = "Frozen and thawed soil infiltration over a synthetic season", long_about = None)]
struct Args {
    /// Number of cells
    #[arg(short, long, default_value_t = 64)]
    cells: usize,

    /// Season length in days
    #[arg(short, long, default_value_t = 120)]
    days: usize,

    /// Day on which the snowpack starts melting
    #[arg(long, default_value_t = 40)]
    melt_start: usize,

    /// Peak snow water equivalent (mm)
    #[arg(long, default_value_t = 120.0)]
    peak_swe: f64,

    /// Thawed-soil infiltration method (ignored when --config is given)
    #[arg(short, long, value_enum, default_value_t = Method::Ayers)]
    method: Method,

    /// JSON model configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resume from a saved snapshot
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Write a snapshot at the end of the run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Random seed for forcing
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Report interval in days
    #[arg(short, long, default_value_t = 10)]
    report_interval: usize,
}

/// Columns cycle through a few soil classes; every sixteenth cell is a pond
fn build_columns(
    table: &SoilPropertyTable,
    count: usize,
) -> Result<Vec<SoilColumnParameters>, soil_infil_core::SoilError> {
    let classes = [
        (SoilType::SandyLoam, TextureClass::CoarseOverCoarse),
        (SoilType::Loam, TextureClass::MediumOverMedium),
        (SoilType::SiltLoam, TextureClass::MediumOverMedium),
        (SoilType::ClayLoam, TextureClass::MediumFineOverFine),
    ];
    let coefficients = TransferCoefficients {
        rechr_to_ssr: 0.2,
        lower_to_ssr: 0.5,
        soil_to_gw: 1.5,
        detention_snow_to_runoff: 0.1,
        detention_organic_to_runoff: 0.3,
        depression_to_ssr: 0.02,
        depression_to_gw: 0.05,
        groundwater_out: 0.01,
    };

    (0..count)
        .map(|i| {
            let (soil_type, texture) = if i % 16 == 15 {
                (SoilType::Water, TextureClass::CoarseOverCoarse)
            } else {
                classes[i % classes.len()]
            };
            Ok(SoilColumnParameters::from_soil_type(
                table,
                soil_type,
                texture,
                AyersCover::PoorPasture,
                SoilColumnParameters::DEFAULT_SOIL_DEPTH,
                SoilColumnParameters::DEFAULT_RECHARGE_DEPTH,
            )?
            .with_detention(5.0, 2.0)
            .with_depression_max(20.0)
            .with_groundwater_max(300.0)
            .with_coefficients(coefficients))
        })
        .collect()
}

/// Synthetic daily forcing: cold accumulation, a melt period, then rain
fn season_forcing(args: &Args, day: usize, rng: &mut StdRng) -> Vec<CellForcing> {
    let melt_days = 20.0;
    let since_melt = day.saturating_sub(args.melt_start) as f64;
    let melting = day >= args.melt_start && since_melt < melt_days;
    let swe_left = if day < args.melt_start {
        args.peak_swe
    } else {
        (args.peak_swe * (1.0 - since_melt / melt_days)).max(0.0)
    };

    (0..args.cells)
        .map(|_| {
            let air = if melting {
                rng.random_range(-15.0..8.0)
            } else if day < args.melt_start {
                rng.random_range(-30.0..-2.0)
            } else {
                rng.random_range(5.0..25.0)
            };
            let melt = if melting {
                args.peak_swe / melt_days * rng.random_range(0.5..1.5)
            } else {
                0.0
            };
            let rain = if day >= args.melt_start && rng.random_bool(0.25) {
                rng.random_range(1.0..30.0)
            } else {
                0.0
            };
            CellForcing {
                swe: Millimeters::new(swe_left),
                snowmelt: Millimeters::new(melt),
                rainfall: Millimeters::new(rain),
                soil_storage_at_freeze: Percent::new(rng.random_range(20.0..80.0)),
                air_temperature: Celsius::new(air),
                thaw_front_depth: Millimeters::new(if melting { since_melt * 40.0 } else { 0.0 }),
                freeze_front_depth: Millimeters::new(if swe_left > 0.0 { 900.0 } else { 0.0 }),
                potential_et: Millimeters::new(if day < args.melt_start {
                    rng.random_range(-0.3..0.5)
                } else {
                    rng.random_range(0.5..5.0)
                }),
                routing_residual: Millimeters::ZERO,
            }
        })
        .collect()
}

/// Spread one day of forcing evenly over `steps` model timesteps
fn per_step(daily: &CellForcing, steps: usize) -> CellForcing {
    let share = |depth: Millimeters| Millimeters::new(depth.value() / steps as f64);
    CellForcing {
        snowmelt: share(daily.snowmelt),
        rainfall: share(daily.rainfall),
        potential_et: share(daily.potential_et),
        ..*daily
    }
}

fn print_summary(day: usize, summary: &DomainSummary) {
    println!(
        "Day {:>4}: inf {:>8.2} mm | runoff {:>8.2} mm | ssr {:>7.2} mm | \
         gw out {:>6.2} mm | ET {:>7.2} mm | mean soil {:>6.1} mm",
        day,
        summary.infiltration,
        summary.soil_excess_to_runoff,
        summary.soil_to_ssr,
        summary.groundwater_outflow,
        summary.actual_et,
        summary.mean_soil_storage
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    println!("=== Soil Infiltration Demo ===\n");

    let config = match &args.config {
        Some(path) => ModelConfig::load(path)?,
        None => ModelConfig {
            thaw_method: args.method.into(),
            ..ModelConfig::default()
        },
    };
    println!(
        "Timestep {} s, thawed method {:?}, {} infiltration days per freeze cycle",
        config.timestep_seconds, config.thaw_method, config.frozen.max_inf_days
    );

    let steps_per_day = config.steps_per_day().round().max(1.0) as usize;

    let table = Arc::new(SoilPropertyTable::standard());
    let columns = build_columns(&table, args.cells)?;
    let mut classes: Vec<&str> = columns.iter().map(|c| c.soil_type.name()).collect();
    classes.sort_unstable();
    classes.dedup();
    println!("Soil classes: {}", classes.join(", "));
    let mut domain = SoilDomain::new(config, table, columns, Percent::new(40.0))?;

    if let Some(path) = &args.resume {
        domain.restore(&DomainSnapshot::load(path)?)?;
        println!("Resumed at step {}", domain.steps_taken());
    }

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut season_infiltration = 0.0;
    let mut season_runoff = 0.0;
    let mut worst_residual: f64 = 0.0;

    for day in 0..args.days {
        let daily = season_forcing(&args, day, &mut rng);
        let forcing: Vec<_> = daily.iter().map(|f| per_step(f, steps_per_day)).collect();

        for step in 0..steps_per_day {
            let reports = domain.step(&forcing)?;

            for (report, f) in reports.iter().zip(&forcing) {
                if report.is_not_applicable() {
                    continue;
                }
                let residual = report.water_balance_residual(
                    f.snowmelt.value(),
                    f.rainfall.value(),
                    f.routing_residual.value(),
                );
                worst_residual = worst_residual.max(residual.abs());
            }

            let summary = DomainSummary::from_reports(&reports);
            season_infiltration += summary.infiltration;
            season_runoff += summary.soil_excess_to_runoff;

            let last_step = step + 1 == steps_per_day;
            if last_step && args.report_interval > 0 && (day + 1) % args.report_interval == 0 {
                print_summary(day + 1, &summary);
            }
        }
    }

    let frozen_cells = domain
        .cells()
        .iter()
        .filter(|c| c.state().frozen.frozen)
        .count();

    println!("\n=== Season Summary ===");
    println!("Cells: {} ({} still frozen)", domain.cells().len(), frozen_cells);
    println!("Total infiltration: {season_infiltration:.1} mm");
    println!("Total surface runoff: {season_runoff:.1} mm");
    println!("Largest water balance residual: {worst_residual:.2e} mm");

    if let Some(path) = &args.snapshot {
        domain.snapshot().save(path)?;
        println!("Snapshot written to {}", path.display());
    }

    Ok(())
}
