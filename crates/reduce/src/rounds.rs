//! Round lifecycle bookkeeping.

#![forbid(unsafe_code)]

use demosum_core::DomainEvent;
use metrics::counter;
use tracing::warn;

#[derive(Debug, Default)]
pub struct RoundTracker {
    last: Option<i32>,
    started: u64,
}

impl RoundTracker {
    pub fn new() -> Self { Self::default() }

    pub fn last_round(&self) -> Option<i32> { self.last }
    pub fn rounds_started(&self) -> u64 { self.started }

    /// Numbering restarts at 1 with each live period.
    pub fn reset_numbering(&mut self) { self.last = None; }

    /// Stamp a round start from the decoder's rounds-played count.
    /// Gaps are logged and recorded as observed.
    pub fn start(&mut self, rounds_played: i32) -> DomainEvent {
        let round = match rounds_played.checked_add(1) {
            Some(r) => r,
            None => {
                warn!(rounds_played, "rounds played out of range in source stream");
                counter!("reduce_round_gaps_total", 1u64);
                i32::MAX
            }
        };
        let expected = self.last.map(|r| r.saturating_add(1)).unwrap_or(1);
        // a repeated round 1 is a restart, not a gap
        if round != expected && round != 1 {
            warn!(round, expected, "round numbering gap in source stream");
            counter!("reduce_round_gaps_total", 1u64);
        }
        self.last = Some(round);
        self.started += 1;
        DomainEvent::RoundStart { round }
    }

    pub fn end(&self) -> DomainEvent { DomainEvent::RoundEnd }

    pub fn officially_ended(&self) -> DomainEvent { DomainEvent::RoundOfficiallyEnded }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_from_rounds_played() {
        let mut r = RoundTracker::new();
        assert_eq!(r.start(0), DomainEvent::RoundStart { round: 1 });
        assert_eq!(r.start(1), DomainEvent::RoundStart { round: 2 });
        assert_eq!(r.last_round(), Some(2));
        assert_eq!(r.rounds_started(), 2);
    }

    #[test]
    fn gaps_are_recorded_as_observed() {
        let mut r = RoundTracker::new();
        r.start(0);
        assert_eq!(r.start(4), DomainEvent::RoundStart { round: 5 });
        assert_eq!(r.last_round(), Some(5));
        r.reset_numbering();
        assert_eq!(r.start(0), DomainEvent::RoundStart { round: 1 });
    }

    #[test]
    fn out_of_range_rounds_played_saturates() {
        let mut r = RoundTracker::new();
        assert_eq!(r.start(i32::MAX), DomainEvent::RoundStart { round: i32::MAX });
        assert_eq!(r.start(i32::MAX), DomainEvent::RoundStart { round: i32::MAX });
        assert_eq!(r.last_round(), Some(i32::MAX));
    }
}
