//! Concurrency gate for unit loads.
//!
//! Issues manifest indices in ascending order, never more than `limit` at a
//! time, and exactly one replacement per completion. It says nothing about
//! which index completes first.

use crate::error::{LoaderError, LoaderResult};

/// What the driver should do after a load completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStep {
    /// Start loading this index.
    Issue(usize),
    /// Nothing left to issue; other loads are still outstanding.
    Waiting,
    /// Every index has been issued and completed.
    Drained,
}

#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    limit: usize,
    total: usize,
    in_flight: usize,
    next_to_fetch: usize,
    peak: usize,
}

impl ConcurrencyGate {
    pub fn new(total: usize, limit: usize) -> LoaderResult<Self> {
        if limit == 0 {
            return Err(LoaderError::config("concurrency limit must be at least 1"));
        }
        Ok(Self {
            limit,
            total,
            in_flight: 0,
            next_to_fetch: 0,
            peak: 0,
        })
    }

    /// Initial batch: `min(limit, total)` indices.
    pub fn start(&mut self) -> Vec<usize> {
        let mut issued = Vec::with_capacity(self.limit.min(self.total));
        while self.in_flight < self.limit {
            match self.issue() {
                Some(index) => issued.push(index),
                None => break,
            }
        }
        issued
    }

    /// Record one completion and decide what happens next.
    pub fn on_completed(&mut self) -> GateStep {
        debug_assert!(self.in_flight > 0, "completion without an outstanding load");
        self.in_flight = self.in_flight.saturating_sub(1);

        if let Some(index) = self.issue() {
            GateStep::Issue(index)
        } else if self.in_flight == 0 {
            GateStep::Drained
        } else {
            GateStep::Waiting
        }
    }

    fn issue(&mut self) -> Option<usize> {
        if self.next_to_fetch >= self.total {
            return None;
        }
        let index = self.next_to_fetch;
        self.next_to_fetch += 1;
        self.in_flight += 1;
        self.peak = self.peak.max(self.in_flight);
        Some(index)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Highest number of loads outstanding at once so far.
    pub fn peak(&self) -> usize {
        self.peak
    }

    pub fn is_drained(&self) -> bool {
        self.next_to_fetch >= self.total && self.in_flight == 0
    }
}
