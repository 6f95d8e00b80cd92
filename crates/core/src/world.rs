//! Decoder-side world state that answers `DemoQuery` at the current point of the stream.

#![forbid(unsafe_code)]

use rustc_hash::FxHashMap;

use crate::{DemoQuery, PlayerEntity, TeamNumber, TeamState, UserId};

#[derive(Debug, Clone, Default)]
pub struct World {
    tick: i32,
    players: FxHashMap<UserId, PlayerEntity>,
    teams: FxHashMap<TeamNumber, TeamState>,
    rounds_played: i32,
}

impl World {
    pub fn new() -> Self { Self::default() }

    pub fn set_tick(&mut self, tick: i32) { self.tick = tick; }
    pub fn set_rounds_played(&mut self, n: i32) { self.rounds_played = n; }

    /// Insert or replace the entity for `p.userid`.
    pub fn upsert_player(&mut self, p: PlayerEntity) { self.players.insert(p.userid, p); }

    pub fn remove_player(&mut self, userid: UserId) -> Option<PlayerEntity> { self.players.remove(&userid) }

    pub fn set_team(&mut self, t: TeamState) { self.teams.insert(t.number, t); }

    pub fn player_count(&self) -> usize { self.players.len() }
}

impl DemoQuery for World {
    fn current_tick(&self) -> i32 { self.tick }
    fn player_by_user_id(&self, userid: UserId) -> Option<&PlayerEntity> { self.players.get(&userid) }
    fn rounds_played(&self) -> i32 { self.rounds_played }
    fn team(&self, number: TeamNumber) -> Option<&TeamState> { self.teams.get(&number) }
}
