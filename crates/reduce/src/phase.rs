//! Warmup / live phase tracking.

#![forbid(unsafe_code)]

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Warmup,
    Live,
}

#[derive(Debug, Clone)]
pub struct PhaseTracker {
    in_warmup: bool,
    match_started: bool,
}

impl Default for PhaseTracker {
    fn default() -> Self { Self { in_warmup: true, match_started: false } }
}

impl PhaseTracker {
    pub fn new() -> Self { Self::default() }

    pub fn phase(&self) -> Phase { if self.is_live() { Phase::Live } else { Phase::Warmup } }
    pub fn in_warmup(&self) -> bool { self.in_warmup }
    pub fn match_started(&self) -> bool { self.match_started }
    pub fn is_live(&self) -> bool { self.match_started && !self.in_warmup }

    /// "Match officially starts". Returns the phase left behind.
    pub fn enter_live(&mut self) -> Phase {
        let prev = self.phase();
        self.in_warmup = false;
        self.match_started = true;
        debug!(from = ?prev, "entered live play");
        prev
    }

    /// Warmup announced again (restart or re-knife). `match_started` stays set.
    pub fn enter_warmup(&mut self) -> Phase {
        let prev = self.phase();
        self.in_warmup = true;
        debug!(from = ?prev, "entered warmup");
        prev
    }
}
