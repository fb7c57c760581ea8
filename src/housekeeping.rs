//! Periodic sweep bounding memory
//!
//! Runs on its own timer, independent of the frame rate. Old particles go
//! back to the pool (not just dropped) and the dedup ledger is trimmed.

use crate::ingest::IngestionAdapter;
use crate::sim::state::{Census, SimulationState};

/// What one sweep did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted_particles: usize,
    pub trimmed_keys: usize,
    pub census: Census,
}

/// Sweep scheduler
#[derive(Debug, Clone)]
pub struct Housekeeper {
    interval_ms: f64,
    last_run: Option<f64>,
}

impl Housekeeper {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms: interval_ms.max(1.0),
            last_run: None,
        }
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// First call schedules; a sweep is due once a full interval has passed
    pub fn due(&self, now: f64) -> bool {
        self.last_run
            .is_some_and(|last| now - last >= self.interval_ms)
    }

    /// Sweep if an interval elapsed since the last sweep
    pub fn run_if_due(
        &mut self,
        state: &mut SimulationState,
        adapter: &mut IngestionAdapter,
        now: f64,
    ) -> Option<SweepReport> {
        if self.last_run.is_none() {
            self.last_run = Some(now);
            return None;
        }
        if !self.due(now) {
            return None;
        }
        self.last_run = Some(now);
        Some(sweep(state, adapter, now))
    }
}

/// Evict particles older than the age limit and trim the ledger.
/// `now` is on the frame clock (`SimulationState::clock_ms`).
pub fn sweep(state: &mut SimulationState, adapter: &mut IngestionAdapter, now: f64) -> SweepReport {
    let max_age = state.settings.particle_max_age_ms;
    let SimulationState {
        particles, pool, ..
    } = state;

    let before = particles.len();
    let mut kept = Vec::with_capacity(before);
    for particle in particles.drain(..) {
        if now - particle.created_at > max_age {
            pool.release(particle);
        } else {
            kept.push(particle);
        }
    }
    *particles = kept;
    let evicted_particles = before - particles.len();

    let trimmed_keys = adapter.trim_ledger();
    let census = state.census();
    log::debug!(
        "Housekeeping: evicted {} particles, trimmed {} keys; {:?}, ledger {}",
        evicted_particles,
        trimmed_keys,
        census,
        adapter.ledger().len()
    );

    SweepReport {
        evicted_particles,
        trimmed_keys,
        census,
    }
}
