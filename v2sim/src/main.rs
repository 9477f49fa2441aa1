use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use v2sim_core::{Simulation, SpendingCategory};

mod loader;

#[cfg(feature = "tracy")]
#[global_allocator]
static GLOBAL: tracy_client::ProfiledAllocator<std::alloc::System> =
    tracy_client::ProfiledAllocator::new(std::alloc::System, 100);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON scenario
    #[arg(short, long)]
    scenario: PathBuf,

    /// Number of daily ticks to run
    #[arg(short, long, default_value_t = 10)]
    ticks: u32,

    /// Worker threads for province ticks (overrides the scenario, 0 = one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Compute a checksum every N ticks (overrides the scenario, 0 = never)
    #[arg(long)]
    checksum_frequency: Option<u32>,

    /// Write a JSON summary of the final state to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Stream tracing spans to Tracy (requires the `tracy` feature)
    #[arg(long)]
    tracy: bool,
}

#[derive(Serialize)]
struct CountryReport {
    tag: String,
    cash: f64,
    balance_yesterday: f64,
    gold_income: f64,
    tariff_income: f64,
    spending: BTreeMap<&'static str, f64>,
    budget_cut: Vec<&'static str>,
    violations: usize,
}

#[derive(Serialize)]
struct RunReport {
    date: String,
    ticks: u64,
    checksum: Option<u64>,
    countries: Vec<CountryReport>,
    prices: BTreeMap<String, f64>,
}

impl RunReport {
    fn from_simulation(sim: &Simulation) -> Self {
        let state = sim.state();
        let countries = state
            .countries
            .iter()
            .map(|country| {
                let economy = &country.economy;
                CountryReport {
                    tag: country.tag.clone(),
                    cash: economy.cash_stockpile().to_f64(),
                    balance_yesterday: economy
                        .balance_history()
                        .latest()
                        .map(|b| b.to_f64())
                        .unwrap_or_default(),
                    gold_income: economy.gold_income().to_f64(),
                    tariff_income: economy.actual_tariff_income().to_f64(),
                    spending: SpendingCategory::PRIORITY
                        .iter()
                        .map(|&c| (c.name(), economy.actual_spending(c).to_f64()))
                        .collect(),
                    budget_cut: SpendingCategory::PRIORITY
                        .iter()
                        .filter(|&&c| economy.was_budget_cut(c))
                        .map(|c| c.name())
                        .collect(),
                    violations: economy.violations_yesterday().len(),
                }
            })
            .collect();
        let prices = state
            .market
            .goods()
            .iter()
            .filter_map(|good_market| {
                state
                    .definitions
                    .good(good_market.good())
                    .map(|definition| (definition.identifier.clone(), good_market.price().to_f64()))
            })
            .collect();

        Self {
            date: state.date.to_string(),
            ticks: sim.metrics().total_ticks,
            checksum: sim.last_checksum(),
            countries,
            prices,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = std::str::FromStr::from_str(&args.log_level).unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    if args.tracy {
        v2sim_core::profiling::init_tracy(v2sim_core::profiling::span_level(level));
    }

    log::info!("Starting v2sim...");

    let (state, mut config) = loader::load_scenario(&args.scenario)?;
    if let Some(threads) = args.threads {
        config.worker_threads = threads;
    }
    if let Some(frequency) = args.checksum_frequency {
        config.checksum_frequency = frequency;
    }

    log::info!("Initial State Date: {}", state.date);
    let mut sim = Simulation::new(state, config)?;

    for _ in 0..args.ticks {
        sim.run_daily_tick();

        let state = sim.state();
        // Date has already advanced, so day 2 follows a month start.
        if state.date.day == 2 {
            for country in &state.countries {
                log::info!(
                    "Tick: {} | {} Cash: {} | Balance: {}",
                    state.date,
                    country.tag,
                    country.economy.cash_stockpile(),
                    country.economy.balance_history().latest().unwrap_or_default()
                );
            }
        }
    }

    let state = sim.state();
    for country in &state.countries {
        log::info!(
            "{}: cash {} | balance {} | tariffs {} | violations {}",
            country.tag,
            country.economy.cash_stockpile(),
            country.economy.balance_history().latest().unwrap_or_default(),
            country.economy.actual_tariff_income(),
            country.economy.violations_yesterday().len()
        );
    }
    let metrics = sim.metrics();
    log::info!(
        "Simulation finished at {} ({} ticks, {:.3} ms/tick, {:.1} days/s)",
        state.date,
        metrics.total_ticks,
        metrics.tick_avg_ms(),
        metrics.days_per_second()
    );
    if let Some(checksum) = sim.last_checksum() {
        log::info!("Checksum: {:016x}", checksum);
    }

    if let Some(path) = &args.report {
        let report = RunReport::from_simulation(&sim);
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write report {}", path.display()))?;
        log::info!("Report written to {}", path.display());
    }

    Ok(())
}
