//! Round-robin light controller
//!
//! Each call to [`Controller::cycle`] serves exactly one direction, charges the
//! time it took to every queued vehicle, lets new vehicles arrive and moves the
//! green light on to the next direction in the ring.

use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::direction::Direction;
use super::error::{ensure_non_negative, SimError, SimResult};
use super::intersection::Intersection;
use super::stats::SimulationStats;
use super::types::DirectionId;

/// Whether a direction is being served right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Cycling(DirectionId),
}

/// Outcome of one served cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub served: DirectionId,
    pub served_name: String,
    /// Vehicles that cleared the intersection
    pub released: usize,
    /// Vehicles that arrived across all directions at the end of the cycle
    pub arrived: usize,
    /// Cycle duration including the switch-over cost
    pub elapsed: f64,
}

/// Drives one intersection through its directions in ring order
#[derive(Debug)]
pub struct Controller {
    intersection: Intersection,
    /// Time for one released vehicle to clear the intersection
    pass_duration: f64,
    target: DirectionId,
    /// Also spend each cycle's duration as wall-clock seconds
    real_time_mode: bool,
    state: ControllerState,
    stats: SimulationStats,
}

impl Controller {
    /// Control `intersection`, starting with its head direction
    pub fn new(intersection: Intersection, pass_duration: f64) -> SimResult<Self> {
        ensure_non_negative(pass_duration, "pass duration")?;
        let target = intersection.head_direction();
        Ok(Self {
            intersection,
            pass_duration,
            target,
            real_time_mode: false,
            state: ControllerState::Idle,
            stats: SimulationStats::new(),
        })
    }

    pub fn intersection(&self) -> &Intersection {
        &self.intersection
    }

    pub fn pass_duration(&self) -> f64 {
        self.pass_duration
    }

    /// The direction that will be served by the next cycle
    pub fn target_direction(&self) -> DirectionId {
        self.target
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn real_time_mode(&self) -> bool {
        self.real_time_mode
    }

    pub fn set_real_time_mode(&mut self, real_time_mode: bool) {
        self.real_time_mode = real_time_mode;
    }

    /// Run one round-robin step
    pub fn cycle(&mut self) -> SimResult<CycleReport> {
        let served = self.target;
        self.state = ControllerState::Cycling(served);
        debug!("Controller cycling, serving {:?}", served);

        let result = self.serve(served);

        self.state = ControllerState::Idle;
        result
    }

    fn serve(&mut self, served: DirectionId) -> SimResult<CycleReport> {
        let direction = self
            .intersection
            .direction(served)
            .ok_or(SimError::UnknownDirection(served))?;
        let served_name = direction.name().to_string();
        let release = direction.plan_release(self.pass_duration, self.real_time_mode)?;
        let next = self
            .intersection
            .next_of(served)
            .ok_or(SimError::UnknownDirection(served))?;

        // Checks and reservations first: nothing past this point can fail
        self.intersection.check_waiting_time(release.elapsed)?;
        let arrivals = self.intersection.draw_arrivals()?;

        if let Some(direction) = self.intersection.direction_mut(served) {
            direction.apply_release(release, self.real_time_mode);
        }
        // The served direction accrues the elapsed time too
        self.intersection.add_waiting_time(release.elapsed)?;
        let arrived = self.intersection.apply_arrivals(arrivals)?;

        self.target = next;
        let (released, elapsed) = (release.volume, release.elapsed);
        self.stats.record_cycle(released, arrived, elapsed);

        info!(
            "Served {}: released {} vehicles in {:.1} time units, {} arrived",
            served_name, released, elapsed, arrived
        );

        Ok(CycleReport {
            served,
            served_name,
            released,
            arrived,
            elapsed,
        })
    }

    /// Add a direction to the controlled intersection, behind the current tail
    pub fn add_direction(&mut self, direction: Direction) -> SimResult<DirectionId> {
        self.intersection.add_direction(direction)
    }

    /// Remove a direction from the controlled intersection
    ///
    /// Removing the current target hands the next cycle to its successor.
    pub fn remove_direction(&mut self, id: DirectionId) -> SimResult<bool> {
        let successor = self.intersection.next_of(id);
        let removed = self.intersection.remove_direction(id)?;
        if removed && id == self.target {
            if let Some(successor) = successor {
                self.target = successor;
            }
        }
        Ok(removed)
    }

    /// Print a summary of the controlled intersection
    pub fn print_summary(&self) {
        println!("=== Traffic Controller Summary ===");
        println!("{}", self.stats.summary());
        println!(
            "Vehicles waiting: {}, average wait: {:.2}",
            self.intersection.num_vehicles(),
            self.intersection.avg_waiting_time()
        );
        println!("--- Directions ---");
        for (id, direction) in self.intersection.iter() {
            println!(
                "  {}{}: queued={}, total wait={:.1}, avg flow={:.1}",
                direction.name(),
                if id == self.target { " (next)" } else { "" },
                direction.len(),
                direction.total_waiting_time(),
                direction.avg_flow()
            );
        }
    }
}

/// A controller that can be driven from several threads
///
/// The lock is held for a whole cycle, so steps never interleave.
#[derive(Debug, Clone)]
pub struct SharedController {
    inner: Arc<Mutex<Controller>>,
}

impl SharedController {
    pub fn new(controller: Controller) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    pub fn cycle(&self) -> SimResult<CycleReport> {
        self.lock().cycle()
    }

    /// Run `f` with exclusive access to the controller
    pub fn with<T>(&self, f: impl FnOnce(&mut Controller) -> T) -> T {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Controller> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
