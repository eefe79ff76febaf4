//! Running statistics for a controlled intersection

/// Totals accumulated over every cycle a controller has run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationStats {
    pub cycles_run: u64,
    /// Simulated time units spent serving directions, switch-overs included
    pub elapsed_time: f64,
    pub vehicles_released: u64,
    pub vehicles_arrived: u64,
}

impl SimulationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one finished cycle into the totals
    pub fn record_cycle(&mut self, released: usize, arrived: usize, elapsed: f64) {
        self.cycles_run += 1;
        self.elapsed_time += elapsed;
        self.vehicles_released += released as u64;
        self.vehicles_arrived += arrived as u64;
    }

    /// Mean vehicles released per cycle, 0 before the first cycle
    pub fn release_rate(&self) -> f64 {
        if self.cycles_run == 0 {
            0.0
        } else {
            self.vehicles_released as f64 / self.cycles_run as f64
        }
    }

    /// Get a summary string for display
    pub fn summary(&self) -> String {
        format!(
            "Cycles: {} | Time: {:.1} | Released: {} | Arrived: {} | Released/cycle: {:.2}",
            self.cycles_run,
            self.elapsed_time,
            self.vehicles_released,
            self.vehicles_arrived,
            self.release_rate()
        )
    }
}
