//! Team assignment tracker.
//!
//! Deduplicates team announcements per epoch. The dedup key is the player's
//! stable identity, while emitted events carry the transient `userid` that
//! consumers index by. Epoch boundaries:
//! - live transition: seen-set cleared immediately, a deferred clear survives
//! - last round of a half: clear deferred until the round officially ends

#![forbid(unsafe_code)]

use demosum_core::{DemoQuery, DomainEvent, StableId, TeamNumber, UserId, COMPETITIVE_TEAMS};
use metrics::counter;
use rustc_hash::FxHashSet;
use tracing::debug;

/// Where an assignment came from. Explicit team changes carry extra noise flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOrigin {
    TeamChange { disconnect: bool, isbot: bool },
    Spawn,
    Roster,
}

#[derive(Debug, Default)]
pub struct TeamAssignments {
    seen: FxHashSet<StableId>,
    pending_clear: bool,
}

impl TeamAssignments {
    pub fn new() -> Self { Self::default() }

    pub fn seen_len(&self) -> usize { self.seen.len() }
    pub fn pending_clear(&self) -> bool { self.pending_clear }

    pub fn assign(
        &mut self,
        query: &dyn DemoQuery,
        userid: UserId,
        team: TeamNumber,
        origin: AssignOrigin,
    ) -> Option<DomainEvent> {
        let player = query.player_by_user_id(userid)?;
        if player.fakeplayer {
            return None;
        }
        if let AssignOrigin::TeamChange { disconnect, isbot } = origin {
            if disconnect || isbot {
                return None;
            }
        }
        if !self.seen.insert(player.stable_id()) {
            return None;
        }
        debug!(userid, team, ?origin, "team assignment recorded");
        counter!("reduce_team_assign_total", 1u64);
        Some(DomainEvent::TeamAssign { userid, team })
    }

    /// Re-announce every member of the two competitive teams not yet seen this epoch.
    pub fn reannounce_roster(&mut self, query: &dyn DemoQuery) -> Vec<DomainEvent> {
        let mut out = Vec::new();
        for number in COMPETITIVE_TEAMS {
            let Some(team) = query.team(number) else { continue };
            for &userid in team.members.iter() {
                if let Some(ev) = self.assign(query, userid, team.number, AssignOrigin::Roster) {
                    out.push(ev);
                }
            }
        }
        out
    }

    /// Live transition: empties the seen-set only. A deferred half-time
    /// clear stays armed until the round officially ends.
    pub fn clear_seen(&mut self) { self.seen.clear(); }

    pub fn clear(&mut self) {
        self.seen.clear();
        self.pending_clear = false;
    }

    pub fn defer_clear(&mut self) { self.pending_clear = true; }

    /// Applies a deferred clear. Returns true when the epoch was reset.
    pub fn round_officially_ended(&mut self) -> bool {
        if !self.pending_clear {
            return false;
        }
        debug!(cleared = self.seen.len(), "half over; team assignments reset");
        self.clear();
        true
    }
}
