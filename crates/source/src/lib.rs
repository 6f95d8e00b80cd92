//! Demosum source: reads a decoded event log (JSON Lines) produced by the external demo decoder.
//!
//! Each line is one object tagged by `kind`, optionally stamped with `tick`.
//! World-state lines (`entity`, `entity_remove`, `team`, `gamerules`) update what
//! the `DemoQuery` side answers; the rest surface as `SourceEvent`s.

#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use demosum_core::{
    DemoHeader, DemoQuery, EventSource, GameEvent, PlayerEntity, SourceError, SourceEvent, TeamNumber, TeamState,
    UserId, UserInfo, World,
};
use serde::de::Error as _;
use serde::Deserialize;
use tracing::{debug, trace};

/// Decoded log format revision this reader understands.
pub const LOG_FORMAT: u32 = 1;

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Line {
    Start {
        mapname: String,
        tickrate: f64,
        protocol: i32,
        #[serde(default)]
        format: Option<u32>,
    },
    Convar {
        name: String,
        value: serde_json::Value,
    },
    Stringtable {
        table: String,
        #[serde(default)]
        userdata: Option<UserInfo>,
    },
    GameEvent {
        name: String,
        #[serde(default)]
        fields: serde_json::Value,
    },
    Entity(PlayerEntity),
    EntityRemove {
        userid: UserId,
    },
    Team(TeamState),
    Gamerules {
        rounds_played: i32,
    },
    End,
}

/// Convars arrive as strings from the decoder; tolerate bare numbers/bools.
fn convar_text(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

pub struct JsonlSource<R> {
    reader: R,
    buf: String,
    line_no: usize,
    world: World,
}

impl JsonlSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let file = File::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "decoded log opened");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonlSource<R> {
    pub fn new(reader: R) -> Self { Self { reader, buf: String::new(), line_no: 0, world: World::new() } }

    pub fn lines_read(&self) -> usize { self.line_no }
    pub fn world(&self) -> &World { &self.world }

    fn parse(&self, text: &str) -> Result<(Option<i32>, Line), SourceError> {
        let malformed = |source: serde_json::Error| SourceError::Malformed { line: self.line_no, source };
        let value: serde_json::Value = serde_json::from_str(text).map_err(malformed)?;
        let tick = match value.get("tick") {
            None | Some(serde_json::Value::Null) => None,
            Some(t) => match t.as_i64().and_then(|n| i32::try_from(n).ok()) {
                Some(n) => Some(n),
                None => return Err(malformed(serde_json::Error::custom(format!("tick out of range: {t}")))),
            },
        };
        let line = Line::deserialize(value).map_err(malformed)?;
        Ok((tick, line))
    }
}

impl<R: BufRead> DemoQuery for JsonlSource<R> {
    fn current_tick(&self) -> i32 { self.world.current_tick() }
    fn player_by_user_id(&self, userid: UserId) -> Option<&PlayerEntity> { self.world.player_by_user_id(userid) }
    fn rounds_played(&self) -> i32 { self.world.rounds_played() }
    fn team(&self, number: TeamNumber) -> Option<&TeamState> { self.world.team(number) }
}

impl<R: BufRead> EventSource for JsonlSource<R> {
    fn next_event(&mut self) -> Result<Option<SourceEvent>, SourceError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            let (tick, line) = self.parse(text)?;
            if let Some(t) = tick {
                self.world.set_tick(t);
            }
            let ev = match line {
                Line::Start { mapname, tickrate, protocol, format } => {
                    if let Some(f) = format.filter(|f| *f != LOG_FORMAT) {
                        return Err(SourceError::UnsupportedFormat(f, LOG_FORMAT));
                    }
                    SourceEvent::Start(DemoHeader { mapname, tickrate, protocol })
                }
                Line::Convar { name, value } => SourceEvent::ConVarChange { name, value: convar_text(value) },
                Line::Stringtable { table, userdata } => SourceEvent::StringTableUpdate { table, user_data: userdata },
                Line::GameEvent { name, fields } => {
                    let line = self.line_no;
                    match GameEvent::from_parts(&name, fields) {
                        Ok(Some(ev)) => SourceEvent::Game(ev),
                        Ok(None) => {
                            trace!(name = %name, line, "game event not consumed");
                            continue;
                        }
                        Err(source) => return Err(SourceError::Malformed { line, source }),
                    }
                }
                Line::Entity(p) => {
                    self.world.upsert_player(p);
                    continue;
                }
                Line::EntityRemove { userid } => {
                    self.world.remove_player(userid);
                    continue;
                }
                Line::Team(t) => {
                    self.world.set_team(t);
                    continue;
                }
                Line::Gamerules { rounds_played } => {
                    self.world.set_rounds_played(rounds_played);
                    continue;
                }
                Line::End => SourceEvent::End,
            };
            return Ok(Some(ev));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(text: &str) -> JsonlSource<&[u8]> { JsonlSource::new(text.as_bytes()) }

    #[test]
    fn world_lines_feed_queries() {
        let mut s = source(concat!(
            r#"{"kind":"entity","tick":5,"userid":3,"xuid":[7,1],"name":"a","team":2,"position":[1.5,2.5,3.5]}"#,
            "\n\n",
            r#"{"kind":"team","number":2,"score":4,"members":[3]}"#,
            "\n",
            r#"{"kind":"gamerules","rounds_played":7}"#,
            "\n",
            r#"{"kind":"game_event","tick":9,"name":"round_start","fields":{}}"#,
            "\n",
        ));
        assert_eq!(s.next_event().unwrap(), Some(SourceEvent::Game(GameEvent::RoundStart)));
        assert_eq!(s.current_tick(), 9);
        assert_eq!(s.rounds_played(), 7);
        assert_eq!(s.team(2).map(|t| t.score), Some(4));
        assert_eq!(s.player_by_user_id(3).map(|p| p.position), Some([1.5, 2.5, 3.5]));
        assert_eq!(s.next_event().unwrap(), None);
        assert_eq!(s.lines_read(), 5);
    }

    #[test]
    fn skips_unconsumed_game_events() {
        let mut s = source(concat!(
            r#"{"kind":"game_event","name":"weapon_fire","fields":{"userid":3}}"#,
            "\n",
            r#"{"kind":"end"}"#,
            "\n",
        ));
        assert_eq!(s.next_event().unwrap(), Some(SourceEvent::End));
    }

    #[test]
    fn numeric_convar_values_become_text() {
        let mut s = source(r#"{"kind":"convar","name":"mp_maxrounds","value":30}"#);
        assert_eq!(
            s.next_event().unwrap(),
            Some(SourceEvent::ConVarChange { name: "mp_maxrounds".into(), value: "30".into() })
        );
    }

    #[test]
    fn malformed_lines_report_position() {
        let mut s = source("{\"kind\":\"end\"}\n{not json\n");
        assert_eq!(s.next_event().unwrap(), Some(SourceEvent::End));
        match s.next_event() {
            Err(SourceError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_game_event_fields_are_malformed() {
        let mut s = source(r#"{"kind":"game_event","name":"player_death","fields":{"userid":"x"}}"#);
        assert!(matches!(s.next_event(), Err(SourceError::Malformed { line: 1, .. })));
    }

    #[test]
    fn out_of_range_tick_is_malformed() {
        // would wrap to tick 5 if narrowed blindly
        let mut s = source(r#"{"kind":"game_event","tick":4294967301,"name":"round_start","fields":{}}"#);
        assert!(matches!(s.next_event(), Err(SourceError::Malformed { line: 1, .. })));
        assert_eq!(s.current_tick(), 0);

        let mut s = source(r#"{"kind":"game_event","tick":-1.5,"name":"round_start","fields":{}}"#);
        assert!(matches!(s.next_event(), Err(SourceError::Malformed { line: 1, .. })));
    }

    #[test]
    fn null_tick_leaves_clock_alone() {
        let mut s = source(concat!(
            r#"{"kind":"gamerules","tick":12,"rounds_played":0}"#,
            "\n",
            r#"{"kind":"game_event","tick":null,"name":"round_start","fields":{}}"#,
            "\n",
        ));
        assert_eq!(s.next_event().unwrap(), Some(SourceEvent::Game(GameEvent::RoundStart)));
        assert_eq!(s.current_tick(), 12);
    }

    #[test]
    fn rejects_unknown_format() {
        let mut s = source(r#"{"kind":"start","mapname":"de_dust2","tickrate":64,"protocol":4,"format":2}"#);
        assert!(matches!(s.next_event(), Err(SourceError::UnsupportedFormat(2, 1))));
    }
}
