//! Kill event filter.

#![forbid(unsafe_code)]

use demosum_core::{DemoQuery, DomainEvent, PlayerDeath, NO_ATTACKER};
use metrics::counter;
use tracing::{debug, warn};

use crate::phase::PhaseTracker;

#[derive(Debug, Default)]
pub struct KillFilter {
    dropped_unresolved: u64,
}

impl KillFilter {
    pub fn new() -> Self { Self::default() }

    /// Kills dropped because the attacker entity could not be resolved.
    pub fn dropped_unresolved(&self) -> u64 { self.dropped_unresolved }

    pub fn consider(&mut self, phase: &PhaseTracker, death: &PlayerDeath, query: &dyn DemoQuery) -> Option<DomainEvent> {
        if !phase.match_started() || phase.in_warmup() {
            return None;
        }
        if death.attacker == death.userid || death.attacker == NO_ATTACKER {
            return None;
        }
        let tick = query.current_tick();
        let Some(attacker) = query.player_by_user_id(death.attacker) else {
            warn!(attacker = death.attacker, victim = death.userid, tick, "attacker not resolvable; kill dropped");
            counter!("reduce_kills_dropped_total", 1u64);
            self.dropped_unresolved += 1;
            return None;
        };
        debug!(attacker = death.attacker, victim = death.userid, weapon = %death.weapon, tick, "kill");
        Some(DomainEvent::Kill {
            tick,
            attacker: death.attacker,
            victim: death.userid,
            weapon: death.weapon.clone(),
            pos: truncate(attacker.position),
        })
    }
}

/// Toward-zero truncation per axis. `as` saturates and maps NaN to 0.
pub fn truncate(pos: [f32; 3]) -> [i32; 3] { [pos[0] as i32, pos[1] as i32, pos[2] as i32] }
