//! Demosum reducer: folds an ordered decoded match stream into a single `MatchRecord`.
//!
//! All state lives in a `ReductionContext` that is mutated synchronously per event.
//! `reduce` drives any `EventSource` and enforces the stream ordering contract.

#![forbid(unsafe_code)]

use demosum_core::{
    Announcement, DemoQuery, DomainEvent, EventSource, GameEvent, MatchRecord, SourceError, SourceEvent,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod aggregate;
pub mod identity;
pub mod kills;
pub mod phase;
pub mod rounds;
pub mod script;
pub mod teams;

use aggregate::{ConvarFilter, RecordBuilder};
use identity::IdentityRegistry;
use kills::KillFilter;
use phase::PhaseTracker;
use rounds::RoundTracker;
use teams::{AssignOrigin, TeamAssignments};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceConfig {
    /// Convar names recorded into the output; `*` records all.
    pub tracked_convars: Vec<String>,
    /// Re-announce both competitive rosters on every `round_start`.
    pub roster_on_round_start: bool,
}

impl Default for ReduceConfig {
    fn default() -> Self { Self { tracked_convars: vec!["mp_maxrounds".to_string()], roster_on_round_start: true } }
}

#[derive(Debug, thiserror::Error)]
pub enum ReduceError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("recording truncated: stream ended without an end marker")]
    Truncated,
    #[error("{0} delivered before stream start")]
    EventBeforeStart(&'static str),
    #[error("stream started twice")]
    DuplicateStart,
    #[error("event delivered after stream end")]
    EventAfterEnd,
    #[error("tick went backwards: {previous} -> {current}")]
    TickRegression { previous: i32, current: i32 },
    #[error("stream produced no header")]
    MissingHeader,
}

/// Mutable reduction state for one match.
#[derive(Debug)]
pub struct ReductionContext {
    config: ReduceConfig,
    identities: IdentityRegistry,
    phase: PhaseTracker,
    teams: TeamAssignments,
    rounds: RoundTracker,
    kills: KillFilter,
    record: RecordBuilder,
}

impl ReductionContext {
    pub fn new(config: ReduceConfig) -> Self {
        let filter = ConvarFilter::new(&config.tracked_convars);
        Self {
            config,
            identities: IdentityRegistry::new(),
            phase: PhaseTracker::new(),
            teams: TeamAssignments::new(),
            rounds: RoundTracker::new(),
            kills: KillFilter::new(),
            record: RecordBuilder::new(filter),
        }
    }

    pub fn phase(&self) -> &PhaseTracker { &self.phase }
    pub fn teams(&self) -> &TeamAssignments { &self.teams }
    pub fn identities(&self) -> &IdentityRegistry { &self.identities }
    pub fn events(&self) -> &[DomainEvent] { self.record.events() }

    /// Apply one stream event. `End` is a no-op here; call `finish` to freeze.
    pub fn apply(&mut self, event: &SourceEvent, query: &dyn DemoQuery) {
        match event {
            SourceEvent::Start(header) => self.record.set_header(header.clone()),
            SourceEvent::ConVarChange { name, value } => {
                if self.record.record_convar(name, value) {
                    debug!(name = %name, value = %value, "convar recorded");
                }
            }
            SourceEvent::StringTableUpdate { table, user_data } => {
                self.identities.observe(table, user_data.as_ref());
            }
            SourceEvent::Game(ev) => self.on_game_event(ev, query),
            SourceEvent::End => {}
        }
    }

    fn on_game_event(&mut self, ev: &GameEvent, query: &dyn DemoQuery) {
        match ev {
            GameEvent::PlayerTeam(e) => {
                let origin = AssignOrigin::TeamChange { disconnect: e.disconnect, isbot: e.isbot };
                if let Some(out) = self.teams.assign(query, e.userid, e.team, origin) {
                    self.record.push(out);
                }
            }
            GameEvent::PlayerSpawn(e) => {
                if let Some(out) = self.teams.assign(query, e.userid, e.teamnum, AssignOrigin::Spawn) {
                    self.record.push(out);
                }
            }
            GameEvent::RoundAnnounceWarmup => {
                self.record.push(DomainEvent::PhaseAnnounce(Announcement::Warmup));
                self.phase.enter_warmup();
            }
            GameEvent::RoundAnnounceMatchStart => {
                self.record.push(DomainEvent::PhaseAnnounce(Announcement::MatchStart));
                self.phase.enter_live();
                // warmup assignments do not count against the live epoch
                self.teams.clear_seen();
                self.rounds.reset_numbering();
            }
            GameEvent::RoundAnnounceLastRoundHalf => {
                self.record.push(DomainEvent::PhaseAnnounce(Announcement::LastRoundHalf));
                self.teams.defer_clear();
            }
            GameEvent::RoundAnnounceMatchPoint => {
                self.record.push(DomainEvent::PhaseAnnounce(Announcement::MatchPoint));
            }
            GameEvent::RoundStart => {
                let start = self.rounds.start(query.rounds_played());
                self.record.push(start);
                if self.config.roster_on_round_start {
                    let roster = self.teams.reannounce_roster(query);
                    self.record.extend(roster);
                }
            }
            GameEvent::RoundEnd => {
                let end = self.rounds.end();
                self.record.push(end);
            }
            GameEvent::RoundOfficiallyEnded => {
                let ended = self.rounds.officially_ended();
                self.record.push(ended);
                self.teams.round_officially_ended();
            }
            GameEvent::PlayerDeath(d) => {
                if let Some(kill) = self.kills.consider(&self.phase, d, query) {
                    self.record.push(kill);
                }
            }
        }
    }

    /// Freeze into the output record, reading final scores from `query`.
    pub fn finish(self, query: &dyn DemoQuery) -> Result<MatchRecord, ReduceError> {
        if self.kills.dropped_unresolved() > 0 {
            info!(dropped = self.kills.dropped_unresolved(), "kills dropped for unresolvable attackers");
        }
        self.record.finish(self.identities.into_records(), query)
    }
}

fn event_label(ev: &SourceEvent) -> &'static str {
    match ev {
        SourceEvent::Start(_) => "start",
        SourceEvent::ConVarChange { .. } => "convar change",
        SourceEvent::StringTableUpdate { .. } => "string table update",
        SourceEvent::Game(g) => g.name(),
        SourceEvent::End => "end",
    }
}

/// Drive `source` to its end marker and return the finalized record.
///
/// Fails without partial output on any source error or ordering violation:
/// events before `start`, a second `start`, ticks going backwards, data after
/// `end`, or input exhausted before `end`.
pub fn reduce<S: EventSource>(source: &mut S, config: ReduceConfig) -> Result<MatchRecord, ReduceError> {
    let mut ctx = ReductionContext::new(config);
    let mut started = false;
    let mut last_tick = i32::MIN;
    let mut applied: u64 = 0;

    loop {
        let Some(ev) = source.next_event()? else {
            return Err(ReduceError::Truncated);
        };
        let tick = source.current_tick();
        if tick < last_tick {
            return Err(ReduceError::TickRegression { previous: last_tick, current: tick });
        }
        last_tick = tick;

        match &ev {
            SourceEvent::Start(_) if started => return Err(ReduceError::DuplicateStart),
            SourceEvent::Start(_) => started = true,
            other if !started => return Err(ReduceError::EventBeforeStart(event_label(other))),
            _ => {}
        }
        if matches!(ev, SourceEvent::End) {
            break;
        }
        ctx.apply(&ev, &*source);
        applied += 1;
    }

    if source.next_event()?.is_some() {
        return Err(ReduceError::EventAfterEnd);
    }
    info!(applied, last_tick, "stream consumed");
    ctx.finish(&*source)
}
