//! The daily economic tick.
//!
//! ```text
//! UpdateGamestate ─▶ BeforeMap ─▶ Parallel ─▶ Settle ─▶ AfterMap
//!  (costs, budgets)  (waterfall,   (provinces   (market    (debits,
//!                     stockpile)    on pool)     clears)    balance)
//! ```
//!
//! Each phase finishes before the next starts. Only Parallel runs on the
//! worker pool; the rest are single-threaded and mutate the world directly.

use crate::config::SimConfig;
use crate::country::Country;
use crate::error::SimError;
use crate::fixed::Fixed;
use crate::market::{Market, WorldSettlement};
use crate::metrics::SimMetrics;
use crate::population::PopTypeCosts;
use crate::profiling::{frame_mark, TickFrame};
use crate::province::ProvinceTickContext;
use crate::state::WorldState;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickPhase {
    UpdateGamestate,
    BeforeMap,
    Parallel,
    Settle,
    AfterMap,
}

impl TickPhase {
    pub const ORDER: [TickPhase; 5] = [
        Self::UpdateGamestate,
        Self::BeforeMap,
        Self::Parallel,
        Self::Settle,
        Self::AfterMap,
    ];
}

/// Owns the world and the worker pool that ticks it.
pub struct Simulation {
    state: WorldState,
    config: SimConfig,
    metrics: SimMetrics,
    pool: rayon::ThreadPool,
    phase_log: Vec<TickPhase>,
    scratch: Vec<Fixed>,
    last_checksum: Option<u64>,
}

impl Simulation {
    pub fn new(state: WorldState, config: SimConfig) -> Result<Self, SimError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|index| format!("v2sim-worker-{}", index))
            .build()?;
        log::info!(
            "Simulation ready: {} countries, {} provinces, {} worker threads",
            state.countries.len(),
            state.provinces.len(),
            pool.current_num_threads()
        );

        Ok(Self {
            state,
            config,
            metrics: SimMetrics::default(),
            pool,
            phase_log: Vec::with_capacity(TickPhase::ORDER.len()),
            scratch: Vec::new(),
            last_checksum: None,
        })
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Mutable world access between ticks (slider changes, stockpile settings).
    pub fn state_mut(&mut self) -> &mut WorldState {
        &mut self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Phases of the most recent tick, in the order they ran.
    pub fn last_tick_phases(&self) -> &[TickPhase] {
        &self.phase_log
    }

    pub fn last_checksum(&self) -> Option<u64> {
        self.last_checksum
    }

    pub fn run(&mut self, days: u32) {
        for _ in 0..days {
            self.run_daily_tick();
        }
    }

    pub fn run_daily_tick(&mut self) {
        let _span = tracing::info_span!("daily_tick", date = %self.state.date).entered();
        let tick_start = Instant::now();
        self.phase_log.clear();

        self.run_phase(TickPhase::UpdateGamestate, Self::update_gamestate);
        self.run_phase(TickPhase::BeforeMap, Self::before_map);
        self.run_phase(TickPhase::Parallel, Self::parallel);
        self.run_phase(TickPhase::Settle, Self::settle);
        self.run_phase(TickPhase::AfterMap, Self::after_map);

        self.metrics.total_ticks += 1;
        let frequency = self.config.checksum_frequency as u64;
        if frequency > 0 && self.metrics.total_ticks % frequency == 0 {
            let checksum_start = Instant::now();
            let checksum = self.state.checksum();
            self.metrics.checksum_time += checksum_start.elapsed();
            log::debug!("Checksum on {}: {:016x}", self.state.date, checksum);
            self.last_checksum = Some(checksum);
        }

        frame_mark(TickFrame::Daily);
        self.metrics.total_time += tick_start.elapsed();
    }

    fn run_phase(&mut self, phase: TickPhase, run: fn(&mut Self)) {
        let start = Instant::now();
        run(self);
        self.metrics.record_phase(phase, start.elapsed());
        self.phase_log.push(phase);
    }

    /// Refreshes need costs, slider bounds, efficiencies and projections.
    fn update_gamestate(&mut self) {
        let _span = tracing::info_span!("update_gamestate").entered();
        let state = &mut self.state;
        state.pop_type_costs = PopTypeCosts::compute_all(&state.definitions, &state.market, &self.config);

        let censuses = state.census_by_country();
        for (country, census) in state.countries.iter_mut().zip(&censuses) {
            country.economy.roll_over_imports();
            country.economy.update_country_budget(
                &country.modifiers,
                census,
                &state.definitions,
                &state.pop_type_costs,
                &self.config,
            );
        }
    }

    /// Waterfall and national stockpile orders, country by country.
    fn before_map(&mut self) {
        let _span = tracing::info_span!("before_map").entered();
        let state = &mut self.state;
        for country in &mut state.countries {
            country
                .economy
                .country_budget_tick_before_map(country.id, &state.market);
        }
    }

    /// Ticks every province on the worker pool.
    fn parallel(&mut self) {
        let state = &mut self.state;
        let definitions = &state.definitions;
        let market: &Market = &state.market;
        let countries: &[Country] = &state.countries;
        let provinces = &mut state.provinces;
        let base_goods_demand = self.config.pops.base_goods_demand;

        let _span = tracing::info_span!("provinces_parallel", count = provinces.len()).entered();
        self.pool.install(|| {
            provinces.par_iter_mut().for_each(|province| {
                let country = province
                    .owner
                    .and_then(|owner| countries.get(owner.index()))
                    .map(|c| &c.economy);
                province.province_tick(&ProvinceTickContext {
                    definitions,
                    market,
                    country,
                    base_goods_demand,
                });
            });
        });
    }

    /// Clears every good's market and delivers the results.
    fn settle(&mut self) {
        let _span = tracing::info_span!("settle").entered();
        let state = &mut self.state;
        let mut settlement = WorldSettlement::new(&mut state.countries, &mut state.provinces);
        state.market.execute_orders(&mut settlement, &mut self.scratch);
    }

    /// Closes the books and advances the date.
    fn after_map(&mut self) {
        let _span = tracing::info_span!("after_map").entered();
        let state = &mut self.state;
        for country in &mut state.countries {
            country
                .economy
                .country_budget_tick_after_map(&country.tag, &state.definitions);
        }

        if state.date.is_month_start() {
            state.market.record_price_history();
            frame_mark(TickFrame::Monthly);
        }
        state.date = state.date.add_days(1);
    }
}
