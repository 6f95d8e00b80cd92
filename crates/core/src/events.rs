//! Typed events delivered by the decoded stream.

#![forbid(unsafe_code)]

use serde::Deserialize;

use crate::{DemoHeader, TeamNumber, UserId, UserInfo};

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Start(DemoHeader),
    ConVarChange { name: String, value: String },
    StringTableUpdate { table: String, user_data: Option<UserInfo> },
    Game(GameEvent),
    End,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerTeam {
    pub userid: UserId,
    pub team: TeamNumber,
    #[serde(default)]
    pub oldteam: TeamNumber,
    #[serde(default)]
    pub disconnect: bool,
    #[serde(default)]
    pub isbot: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerSpawn {
    pub userid: UserId,
    pub teamnum: TeamNumber,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerDeath {
    /// Victim.
    pub userid: UserId,
    pub attacker: UserId,
    #[serde(default)]
    pub weapon: String,
}

/// Game events the reducer consumes. Anything else the decoder emits is skipped at the source.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PlayerTeam(PlayerTeam),
    PlayerSpawn(PlayerSpawn),
    RoundAnnounceWarmup,
    RoundAnnounceLastRoundHalf,
    RoundAnnounceMatchPoint,
    RoundAnnounceMatchStart,
    RoundStart,
    RoundEnd,
    RoundOfficiallyEnded,
    PlayerDeath(PlayerDeath),
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::PlayerTeam(_) => "player_team",
            GameEvent::PlayerSpawn(_) => "player_spawn",
            GameEvent::RoundAnnounceWarmup => "round_announce_warmup",
            GameEvent::RoundAnnounceLastRoundHalf => "round_announce_last_round_half",
            GameEvent::RoundAnnounceMatchPoint => "round_announce_match_point",
            GameEvent::RoundAnnounceMatchStart => "round_announce_match_start",
            GameEvent::RoundStart => "round_start",
            GameEvent::RoundEnd => "round_end",
            GameEvent::RoundOfficiallyEnded => "round_officially_ended",
            GameEvent::PlayerDeath(_) => "player_death",
        }
    }

    /// Build a typed event from a decoder `(name, fields)` pair.
    /// Returns `Ok(None)` for event names the reducer does not consume.
    pub fn from_parts(name: &str, fields: serde_json::Value) -> Result<Option<Self>, serde_json::Error> {
        let ev = match name {
            "player_team" => GameEvent::PlayerTeam(serde_json::from_value(fields)?),
            "player_spawn" => GameEvent::PlayerSpawn(serde_json::from_value(fields)?),
            "round_announce_warmup" => GameEvent::RoundAnnounceWarmup,
            "round_announce_last_round_half" => GameEvent::RoundAnnounceLastRoundHalf,
            "round_announce_match_point" => GameEvent::RoundAnnounceMatchPoint,
            "round_announce_match_start" => GameEvent::RoundAnnounceMatchStart,
            "round_start" => GameEvent::RoundStart,
            "round_end" => GameEvent::RoundEnd,
            "round_officially_ended" => GameEvent::RoundOfficiallyEnded,
            "player_death" => GameEvent::PlayerDeath(serde_json::from_value(fields)?),
            _ => return Ok(None),
        };
        Ok(Some(ev))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_consumed_events_and_skips_others() {
        let ev = GameEvent::from_parts("player_team", serde_json::json!({"userid": 5, "team": 2, "disconnect": false}))
            .unwrap()
            .unwrap();
        match &ev {
            GameEvent::PlayerTeam(t) => {
                assert_eq!((t.userid, t.team), (5, 2));
                assert!(!t.isbot);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ev.name(), "player_team");

        let none = GameEvent::from_parts("weapon_fire", serde_json::json!({"userid": 1})).unwrap();
        assert!(none.is_none());

        // unit events ignore whatever fields the decoder attached
        let start = GameEvent::from_parts("round_start", serde_json::json!({"timelimit": 115})).unwrap();
        assert_eq!(start, Some(GameEvent::RoundStart));
    }

    #[test]
    fn rejects_missing_required_fields() {
        assert!(GameEvent::from_parts("player_death", serde_json::json!({"userid": 7})).is_err());
    }
}
