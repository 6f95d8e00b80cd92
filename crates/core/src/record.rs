//! Output record produced by a reduction.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::{DemoHeader, TeamNumber, UserId, Xuid};

/// One distinct, non-fake player identity; first announcement wins.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IdentityRecord {
    pub table: String,
    pub xuid: Xuid,
    pub name: String,
    pub userid: UserId,
}

/// Phase announcements recorded unconditionally so consumers can segment periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    Warmup,
    MatchStart,
    LastRoundHalf,
    MatchPoint,
}

impl Announcement {
    pub fn event_name(&self) -> &'static str {
        match self {
            Announcement::Warmup => "round_announce_warmup",
            Announcement::MatchStart => "round_announce_match_start",
            Announcement::LastRoundHalf => "round_announce_last_round_half",
            Announcement::MatchPoint => "round_announce_match_point",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    PhaseAnnounce(Announcement),
    /// `userid` is the transient id; consumers index by it.
    TeamAssign { userid: UserId, team: TeamNumber },
    RoundStart { round: i32 },
    RoundEnd,
    RoundOfficiallyEnded,
    Kill { tick: i32, attacker: UserId, victim: UserId, weapon: String, pos: [i32; 3] },
}

impl DomainEvent {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DomainEvent::PhaseAnnounce(a) => a.event_name(),
            DomainEvent::TeamAssign { .. } => "player_team",
            DomainEvent::RoundStart { .. } => "round_start",
            DomainEvent::RoundEnd => "round_end",
            DomainEvent::RoundOfficiallyEnded => "round_officially_ended",
            DomainEvent::Kill { .. } => "player_death",
        }
    }
}

// Flat `{"event": kind, ...fields}` objects.
impl Serialize for DomainEvent {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            DomainEvent::PhaseAnnounce(_) | DomainEvent::RoundEnd | DomainEvent::RoundOfficiallyEnded => {
                let mut m = s.serialize_map(Some(1))?;
                m.serialize_entry("event", self.kind_name())?;
                m.end()
            }
            DomainEvent::TeamAssign { userid, team } => {
                let mut m = s.serialize_map(Some(3))?;
                m.serialize_entry("event", self.kind_name())?;
                m.serialize_entry("userid", userid)?;
                m.serialize_entry("team", team)?;
                m.end()
            }
            DomainEvent::RoundStart { round } => {
                let mut m = s.serialize_map(Some(2))?;
                m.serialize_entry("event", self.kind_name())?;
                m.serialize_entry("round", round)?;
                m.end()
            }
            DomainEvent::Kill { tick, attacker, victim, weapon, pos } => {
                let mut m = s.serialize_map(Some(6))?;
                m.serialize_entry("event", self.kind_name())?;
                m.serialize_entry("tick", tick)?;
                m.serialize_entry("attacker", attacker)?;
                m.serialize_entry("victim", victim)?;
                m.serialize_entry("weapon", weapon)?;
                m.serialize_entry("pos", pos)?;
                m.end()
            }
        }
    }
}

/// Finalized match summary. Only produced once the stream has ended.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchRecord {
    #[serde(rename = "demoheader")]
    pub header: DemoHeader,
    pub convars: BTreeMap<String, String>,
    #[serde(rename = "stringtables")]
    pub identities: Vec<IdentityRecord>,
    pub events: Vec<DomainEvent>,
    /// `(TEAM_A score, TEAM_B score)`.
    pub score: [i32; 2],
}

impl MatchRecord {
    pub fn to_json(&self) -> serde_json::Result<String> { serde_json::to_string(self) }
}
