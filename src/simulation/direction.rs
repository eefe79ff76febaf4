//! A single approach to the intersection
//!
//! Each direction keeps the accumulated waiting time of every queued vehicle,
//! oldest vehicle first, and decides how many of them to release when served.

use log::warn;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use super::error::{ensure_non_negative, SimError, SimResult};
use super::types::{DirectionId, DEFAULT_CYCLE_SIZE, SWITCH_OVER_COST};

/// One approach to the intersection and its queue of waiting vehicles
#[derive(Debug, Clone)]
pub struct Direction {
    name: String,
    /// Accumulated waiting time per queued vehicle, front of the queue first
    waiting_times: VecDeque<f64>,
    /// Mean number of vehicles arriving per cycle
    avg_flow: f64,
    /// Share of the total waiting time drained when this direction is served
    cycle_size: f64,
    /// Following direction in the ring. Only the arena may rewrite this.
    next: Option<DirectionId>,
}

impl Direction {
    pub fn new(name: impl Into<String>, waiting_times: Vec<f64>, avg_flow: f64) -> SimResult<Self> {
        ensure_non_negative(avg_flow, "average flow")?;
        for &time in &waiting_times {
            ensure_non_negative(time, "waiting time")?;
        }

        Ok(Self {
            name: name.into(),
            waiting_times: waiting_times.into(),
            avg_flow,
            cycle_size: DEFAULT_CYCLE_SIZE,
            next: None,
        })
    }

    /// Builder-style variant of [`Direction::set_cycle_size`]
    pub fn with_cycle_size(mut self, cycle_size: f64) -> SimResult<Self> {
        self.set_cycle_size(cycle_size)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn avg_flow(&self) -> f64 {
        self.avg_flow
    }

    pub fn set_avg_flow(&mut self, avg_flow: f64) -> SimResult<()> {
        ensure_non_negative(avg_flow, "average flow")?;
        self.avg_flow = avg_flow;
        Ok(())
    }

    pub fn cycle_size(&self) -> f64 {
        self.cycle_size
    }

    /// Set the drained share, which must lie strictly between 0 and 1
    pub fn set_cycle_size(&mut self, cycle_size: f64) -> SimResult<()> {
        if !(cycle_size > 0.0 && cycle_size < 1.0) {
            return Err(SimError::InvalidArgument(format!(
                "cycle size must lie strictly between 0 and 1, got {cycle_size}"
            )));
        }
        self.cycle_size = cycle_size;
        Ok(())
    }

    pub fn waiting_times(&self) -> &VecDeque<f64> {
        &self.waiting_times
    }

    /// Number of queued vehicles
    pub fn len(&self) -> usize {
        self.waiting_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiting_times.is_empty()
    }

    pub fn total_waiting_time(&self) -> f64 {
        self.waiting_times.iter().sum()
    }

    pub fn next(&self) -> Option<DirectionId> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<DirectionId>) {
        self.next = next;
    }

    /// Number of vehicles to release from the front of the queue this cycle
    ///
    /// Vehicles leave front to back until the remaining total waiting time is
    /// at most `floor(total * cycle_size)`. A non-empty queue always releases
    /// at least one vehicle, even when nobody has accrued any wait yet.
    pub fn cycle_volume(&self) -> usize {
        if self.waiting_times.is_empty() {
            return 0;
        }

        let total = self.total_waiting_time();
        let target = (total * self.cycle_size).floor();
        let mut remaining = total;
        let mut volume = 0;

        // Bounded by the queue length in case float rounding leaves a residue above target
        while remaining > target && volume < self.waiting_times.len() {
            remaining -= self.waiting_times[volume];
            volume += 1;
        }

        volume.max(1)
    }

    /// Serve this direction for one cycle
    ///
    /// Returns the cycle duration: the time for the released vehicles to clear
    /// plus the switch-over cost. An empty queue only costs the switch-over.
    pub fn cycle(&mut self, pass_duration: f64, sleep: bool) -> SimResult<f64> {
        self.release(pass_duration, sleep).map(|(_, duration)| duration)
    }

    /// Like [`Direction::cycle`] but also reports how many vehicles left
    pub(crate) fn release(&mut self, pass_duration: f64, sleep: bool) -> SimResult<(usize, f64)> {
        let release = self.plan_release(pass_duration, sleep)?;
        self.apply_release(release, sleep);
        Ok((release.volume, release.elapsed))
    }

    /// Work out a release without touching the queue
    pub(crate) fn plan_release(&self, pass_duration: f64, sleep: bool) -> SimResult<Release> {
        ensure_non_negative(pass_duration, "pass duration")?;

        let volume = self.cycle_volume();
        let clear_time = volume as f64 * pass_duration;
        let elapsed = clear_time + SWITCH_OVER_COST;
        if !elapsed.is_finite() {
            return Err(SimError::InvalidArgument(format!(
                "releasing {volume} vehicles from {} at pass duration {pass_duration} overflows the cycle duration",
                self.name
            )));
        }
        if sleep && Duration::try_from_secs_f64(clear_time).is_err() {
            return Err(SimError::InvalidArgument(format!(
                "cannot sleep for {clear_time} time units while serving {}",
                self.name
            )));
        }

        Ok(Release {
            volume,
            clear_time,
            elapsed,
        })
    }

    /// Drop the released vehicles and optionally wait for them to clear
    pub(crate) fn apply_release(&mut self, release: Release, sleep: bool) {
        self.waiting_times.drain(..release.volume.min(self.waiting_times.len()));
        if sleep {
            if let Ok(duration) = Duration::try_from_secs_f64(release.clear_time) {
                thread::sleep(duration);
            }
        }
    }

    /// Check that every queued vehicle can accrue `delta` without overflowing
    pub(crate) fn check_waiting_time(&self, delta: f64) -> SimResult<()> {
        ensure_non_negative(delta, "waiting time delta")?;
        if self.waiting_times.iter().any(|time| !(time + delta).is_finite()) {
            return Err(SimError::InvalidArgument(format!(
                "adding {delta} overflows a waiting time at {}",
                self.name
            )));
        }
        Ok(())
    }

    /// Every queued vehicle accrues `delta` more waiting time
    pub fn add_waiting_time(&mut self, delta: f64) -> SimResult<()> {
        self.check_waiting_time(delta)?;
        for time in &mut self.waiting_times {
            *time += delta;
        }
        Ok(())
    }

    /// Make room for `count` more vehicles, failing instead of aborting on overflow
    pub(crate) fn reserve_vehicles(&mut self, count: usize) -> SimResult<()> {
        self.waiting_times.try_reserve(count).map_err(|e| {
            warn!("Cannot queue {} vehicles at {}: {}", count, self.name, e);
            SimError::InvalidArgument(format!("cannot queue {count} vehicles at {}: {e}", self.name))
        })
    }

    /// Queue `count` newly arrived vehicles with no accumulated wait
    pub fn add_vehicles(&mut self, count: usize) -> SimResult<()> {
        self.reserve_vehicles(count)?;
        self.waiting_times.extend(std::iter::repeat_n(0.0, count));
        Ok(())
    }

    /// Size of the next pod of arrivals, drawn around the average flow
    ///
    /// The count is `|floor(x)|` with `x ~ Normal(avg_flow, 1)`.
    pub(crate) fn draw_arrivals<R: Rng + ?Sized>(&self, rng: &mut R) -> SimResult<usize> {
        let distribution = Normal::new(self.avg_flow, 1.0).map_err(|e| {
            warn!("Cannot draw arrivals for {}: {}", self.name, e);
            SimError::InvalidArgument(format!("arrival distribution for {}: {e}", self.name))
        })?;

        let draw: f64 = distribution.sample(rng);
        Ok(draw.floor().abs() as usize)
    }

    /// Queue a pod of vehicles whose size is drawn around the average flow
    ///
    /// Returns the number of vehicles that arrived.
    pub fn add_random_vehicles<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SimResult<usize> {
        let count = self.draw_arrivals(rng)?;
        self.add_vehicles(count)?;
        Ok(count)
    }
}

/// A release worked out before any vehicle leaves the queue
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Release {
    pub volume: usize,
    /// Time for the released vehicles to clear
    pub clear_time: f64,
    /// Clear time plus the switch-over cost
    pub elapsed: f64,
}
