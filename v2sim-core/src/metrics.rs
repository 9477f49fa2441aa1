use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::tick::TickPhase;

/// Accumulated timing per tick phase.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct SimMetrics {
    pub total_ticks: u64,
    pub total_time: Duration,
    pub update_gamestate_time: Duration,
    pub before_map_time: Duration,
    /// Province workers, including pool scheduling.
    pub parallel_time: Duration,
    pub settle_time: Duration,
    pub after_map_time: Duration,
    pub checksum_time: Duration,
}

impl SimMetrics {
    pub fn record_phase(&mut self, phase: TickPhase, elapsed: Duration) {
        let slot = match phase {
            TickPhase::UpdateGamestate => &mut self.update_gamestate_time,
            TickPhase::BeforeMap => &mut self.before_map_time,
            TickPhase::Parallel => &mut self.parallel_time,
            TickPhase::Settle => &mut self.settle_time,
            TickPhase::AfterMap => &mut self.after_map_time,
        };
        *slot += elapsed;
    }

    pub fn phase_time(&self, phase: TickPhase) -> Duration {
        match phase {
            TickPhase::UpdateGamestate => self.update_gamestate_time,
            TickPhase::BeforeMap => self.before_map_time,
            TickPhase::Parallel => self.parallel_time,
            TickPhase::Settle => self.settle_time,
            TickPhase::AfterMap => self.after_map_time,
        }
    }

    pub fn tick_avg_ms(&self) -> f64 {
        if self.total_ticks == 0 {
            0.0
        } else {
            self.total_time.as_secs_f64() * 1000.0 / self.total_ticks as f64
        }
    }

    pub fn days_per_second(&self) -> f64 {
        if self.total_time.as_secs_f64() == 0.0 {
            0.0
        } else {
            self.total_ticks as f64 / self.total_time.as_secs_f64()
        }
    }
}
