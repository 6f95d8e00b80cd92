//! In-memory `EventSource` built from a script of world updates and events.
//! Lets the reducer run without a decoder (tests, replays of captured streams).

#![forbid(unsafe_code)]

use std::collections::VecDeque;

use demosum_core::{
    DemoHeader, DemoQuery, EventSource, GameEvent, PlayerEntity, SourceError, SourceEvent, TeamNumber, TeamState,
    UserId, UserInfo, World, USERINFO_TABLE,
};

#[derive(Debug, Clone)]
pub enum Step {
    Tick(i32),
    Player(PlayerEntity),
    RemovePlayer(UserId),
    Team(TeamState),
    RoundsPlayed(i32),
    Event(SourceEvent),
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    world: World,
    steps: VecDeque<Step>,
}

impl ScriptedSource {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, step: Step) { self.steps.push_back(step); }

    pub fn step(mut self, step: Step) -> Self {
        self.push(step);
        self
    }

    pub fn tick(self, tick: i32) -> Self { self.step(Step::Tick(tick)) }
    pub fn player(self, p: PlayerEntity) -> Self { self.step(Step::Player(p)) }
    pub fn remove_player(self, userid: UserId) -> Self { self.step(Step::RemovePlayer(userid)) }
    pub fn rounds_played(self, n: i32) -> Self { self.step(Step::RoundsPlayed(n)) }

    pub fn team(self, number: TeamNumber, score: i32, members: &[UserId]) -> Self {
        self.step(Step::Team(TeamState { number, score, members: members.iter().copied().collect() }))
    }

    pub fn event(self, ev: SourceEvent) -> Self { self.step(Step::Event(ev)) }
    pub fn start(self, header: DemoHeader) -> Self { self.event(SourceEvent::Start(header)) }
    pub fn game(self, ev: GameEvent) -> Self { self.event(SourceEvent::Game(ev)) }
    pub fn end(self) -> Self { self.event(SourceEvent::End) }

    pub fn convar(self, name: &str, value: &str) -> Self {
        self.event(SourceEvent::ConVarChange { name: name.to_string(), value: value.to_string() })
    }

    pub fn userinfo(self, info: UserInfo) -> Self {
        self.event(SourceEvent::StringTableUpdate { table: USERINFO_TABLE.to_string(), user_data: Some(info) })
    }
}

impl DemoQuery for ScriptedSource {
    fn current_tick(&self) -> i32 { self.world.current_tick() }
    fn player_by_user_id(&self, userid: UserId) -> Option<&PlayerEntity> { self.world.player_by_user_id(userid) }
    fn rounds_played(&self) -> i32 { self.world.rounds_played() }
    fn team(&self, number: TeamNumber) -> Option<&TeamState> { self.world.team(number) }
}

impl EventSource for ScriptedSource {
    fn next_event(&mut self) -> Result<Option<SourceEvent>, SourceError> {
        while let Some(step) = self.steps.pop_front() {
            match step {
                Step::Tick(t) => self.world.set_tick(t),
                Step::Player(p) => self.world.upsert_player(p),
                Step::RemovePlayer(id) => {
                    self.world.remove_player(id);
                }
                Step::Team(t) => self.world.set_team(t),
                Step::RoundsPlayed(n) => self.world.set_rounds_played(n),
                Step::Event(ev) => return Ok(Some(ev)),
            }
        }
        Ok(None)
    }
}
