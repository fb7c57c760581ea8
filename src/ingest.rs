//! Admission of live liquidations into the simulation
//!
//! The feed can replay history on connect and resend events after a
//! reconnect. Every event is filtered here before it becomes a block.

use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::feed::LiquidationEvent;
use crate::settings::Settings;
use crate::sim::factory::{SpawnError, make_falling_block};
use crate::sim::state::{BlockId, SimulationState};

/// Why an event was not admitted
#[derive(Debug, Error)]
pub enum RejectReason {
    #[error("missing symbol or non-positive value")]
    Malformed,
    #[error("timestamp {timestamp} predates adapter start {started_at}")]
    Historical { timestamp: f64, started_at: f64 },
    #[error("event is {age_ms:.0}ms old")]
    Stale { age_ms: f64 },
    #[error("already admitted")]
    Duplicate,
    #[error("block {0} is still falling")]
    AlreadyLive(BlockId),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

/// Bounded set of admitted event keys, oldest first
#[derive(Debug, Clone, Default)]
pub struct DedupLedger {
    keys: HashSet<String>,
    order: VecDeque<String>,
    max: usize,
}

impl DedupLedger {
    pub fn new(max: usize) -> Self {
        Self {
            keys: HashSet::new(),
            order: VecDeque::new(),
            max: max.max(2),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn record(&mut self, key: String) {
        if self.keys.insert(key.clone()) {
            self.order.push_back(key);
        }
    }

    /// When over the bound, keep only the most recent half.
    /// Returns the number of keys dropped.
    pub fn trim(&mut self) -> usize {
        if self.order.len() <= self.max {
            return 0;
        }
        let keep = self.max / 2;
        let drop = self.order.len() - keep;
        for key in self.order.drain(..drop) {
            self.keys.remove(&key);
        }
        drop
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

/// Outcome of one admission batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdmitReport {
    pub admitted: Vec<BlockId>,
    pub rejected: usize,
}

/// Single entry point between the feed and the live scene
#[derive(Debug, Clone)]
pub struct IngestionAdapter {
    started_at_ms: f64,
    freshness_ms: f64,
    ledger: DedupLedger,
}

impl IngestionAdapter {
    /// `started_at_ms` is the wall clock (Unix ms) when the view came up;
    /// anything older is history
    pub fn new(started_at_ms: f64, settings: &Settings) -> Self {
        Self {
            started_at_ms,
            freshness_ms: settings.freshness_ms,
            ledger: DedupLedger::new(settings.ledger_max),
        }
    }

    pub fn started_at(&self) -> f64 {
        self.started_at_ms
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Filter one event and, if it passes, spawn its block.
    /// `now_ms` is the wall clock (Unix ms), comparable to event timestamps.
    pub fn admit_one(
        &mut self,
        event: LiquidationEvent,
        state: &mut SimulationState,
        now_ms: f64,
    ) -> Result<BlockId, RejectReason> {
        let event = event.normalized();
        if !event.is_well_formed() {
            return Err(RejectReason::Malformed);
        }
        if event.timestamp < self.started_at_ms {
            return Err(RejectReason::Historical {
                timestamp: event.timestamp,
                started_at: self.started_at_ms,
            });
        }
        let age_ms = now_ms - event.timestamp;
        if age_ms > self.freshness_ms {
            return Err(RejectReason::Stale { age_ms });
        }
        let key = event.dedup_key();
        if self.ledger.contains(&key) {
            return Err(RejectReason::Duplicate);
        }
        if state.has_live_block(&event.id) {
            return Err(RejectReason::AlreadyLive(event.id));
        }

        // Spawn before recording so a failed spawn can be retried
        let block = make_falling_block(&event, &state.viewport, &mut state.rng)?;
        let id = block.id.clone();
        state.blocks.push(block);
        state.stats.record(&event);

        self.ledger.record(key);
        let dropped = self.ledger.trim();
        if dropped > 0 {
            log::debug!("Dedup ledger trimmed by {}", dropped);
        }
        Ok(id)
    }

    /// Admit a batch in delivery order
    pub fn admit(
        &mut self,
        events: impl IntoIterator<Item = LiquidationEvent>,
        state: &mut SimulationState,
        now_ms: f64,
    ) -> AdmitReport {
        let mut report = AdmitReport::default();
        for event in events {
            let id = event.id.clone();
            match self.admit_one(event, state, now_ms) {
                Ok(block) => report.admitted.push(block),
                Err(reason) => {
                    log::debug!("Dropped liquidation {}: {}", id, reason);
                    report.rejected += 1;
                }
            }
        }
        if !report.admitted.is_empty() {
            log::debug!(
                "Admitted {} liquidation(s), {} live",
                report.admitted.len(),
                state.blocks.len()
            );
        }
        report
    }

    /// Housekeeping hook; returns the number of keys dropped
    pub fn trim_ledger(&mut self) -> usize {
        self.ledger.trim()
    }
}
