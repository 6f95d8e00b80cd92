//! Demosum core types: decoded stream vocabulary, point-in-time queries and the match record.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod events;
pub mod record;
pub mod world;

pub use events::{GameEvent, PlayerDeath, PlayerSpawn, PlayerTeam, SourceEvent};
pub use record::{Announcement, DomainEvent, IdentityRecord, MatchRecord};
pub use world::World;

/// Transient per-connection player id (`userid` in game events). Recycled across reconnects.
pub type UserId = i32;
pub type TeamNumber = u8;

pub const TEAM_UNASSIGNED: TeamNumber = 0;
pub const TEAM_SPECTATOR: TeamNumber = 1;
/// The two competitive team slots, in score order.
pub const TEAM_A: TeamNumber = 2;
pub const TEAM_B: TeamNumber = 3;
pub const COMPETITIVE_TEAMS: [TeamNumber; 2] = [TEAM_A, TEAM_B];

/// String table carrying player identity announcements.
pub const USERINFO_TABLE: &str = "userinfo";

/// Attacker id the engine uses for world/self damage.
pub const NO_ATTACKER: UserId = 0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemoHeader {
    pub mapname: String,
    pub tickrate: f64,
    pub protocol: i32,
}

/// Platform account id split the way the decoder reports it; serialized as `[low, high]`.
///
/// The decoder emits each half as a signed 32-bit integer, so a low half with
/// the top bit set arrives negative. Unsigned spellings of the same bits are
/// accepted on input; output keeps the signed form.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "[i64; 2]", into = "[i32; 2]")]
pub struct Xuid {
    pub low: i32,
    pub high: i32,
}

impl Xuid {
    pub fn new(low: i32, high: i32) -> Self { Self { low, high } }
    pub fn as_u64(&self) -> u64 { ((self.high as u32 as u64) << 32) | self.low as u32 as u64 }
    pub fn is_zero(&self) -> bool { self.low == 0 && self.high == 0 }
}

fn xuid_half(v: i64) -> Result<i32, String> {
    if let Ok(n) = i32::try_from(v) {
        return Ok(n);
    }
    u32::try_from(v).map(|n| n as i32).map_err(|_| format!("xuid half out of 32-bit range: {v}"))
}

impl TryFrom<[i64; 2]> for Xuid {
    type Error = String;

    fn try_from(parts: [i64; 2]) -> Result<Self, Self::Error> {
        Ok(Self { low: xuid_half(parts[0])?, high: xuid_half(parts[1])? })
    }
}

impl From<Xuid> for [i32; 2] {
    fn from(x: Xuid) -> Self { [x.low, x.high] }
}

/// User data attached to a `userinfo` string-table entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub xuid: Xuid,
    pub name: String,
    pub userid: UserId,
    #[serde(default)]
    pub fakeplayer: bool,
}

/// Persistent player identity used for deduplication. Falls back to the
/// session id only when the decoder reports no account id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StableId {
    Account(u64),
    Session(UserId),
}

/// Player entity as resolved by the decoder at the current tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerEntity {
    pub userid: UserId,
    #[serde(default)]
    pub xuid: Xuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fakeplayer: bool,
    #[serde(default)]
    pub team: TeamNumber,
    #[serde(default)]
    pub position: [f32; 3],
}

impl PlayerEntity {
    pub fn stable_id(&self) -> StableId {
        if self.xuid.is_zero() { StableId::Session(self.userid) } else { StableId::Account(self.xuid.as_u64()) }
    }
}

/// Team roster and score snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TeamState {
    pub number: TeamNumber,
    #[serde(default)]
    pub score: i32,
    /// Transient ids of current members.
    #[serde(default)]
    pub members: SmallVec<[UserId; 8]>,
}

/// Point-in-time queries answered by the decoder while it delivers events.
pub trait DemoQuery {
    fn current_tick(&self) -> i32;
    fn player_by_user_id(&self, userid: UserId) -> Option<&PlayerEntity>;
    fn rounds_played(&self) -> i32;
    fn team(&self, number: TeamNumber) -> Option<&TeamState>;
}

/// Pull side of the decoded stream. `Ok(None)` means the input is exhausted.
pub trait EventSource: DemoQuery {
    fn next_event(&mut self) -> Result<Option<SourceEvent>, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("reading recording: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed record at line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported decoded log format {0} (expected {1})")]
    UnsupportedFormat(u32, u32),
}

pub mod prelude {
    pub use super::{
        DemoHeader, DemoQuery, EventSource, PlayerEntity, SourceError, StableId, TeamNumber, TeamState, UserId,
        UserInfo, World, Xuid,
    };
    pub use super::{Announcement, DomainEvent, GameEvent, IdentityRecord, MatchRecord, SourceEvent};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xuid_round_trips_as_pair() {
        let x = Xuid::new(12345, 17825793);
        assert_eq!(serde_json::to_string(&x).unwrap(), "[12345,17825793]");
        let back: Xuid = serde_json::from_str("[12345,17825793]").unwrap();
        assert_eq!(back, x);
        assert_eq!(x.as_u64(), (17825793u64 << 32) + 12345);
    }

    #[test]
    fn xuid_accepts_signed_low_half() {
        let x: Xuid = serde_json::from_str("[-1234,17825793]").unwrap();
        assert_eq!(x, Xuid::new(-1234, 17825793));
        assert_eq!(serde_json::to_string(&x).unwrap(), "[-1234,17825793]");
        assert_eq!(x.as_u64(), (17825793u64 << 32) | (-1234i32 as u32 as u64));

        // same bits spelled unsigned
        let unsigned: Xuid = serde_json::from_str("[4294966062,17825793]").unwrap();
        assert_eq!(unsigned, x);

        assert!(serde_json::from_str::<Xuid>("[4294967296,1]").is_err());
        assert!(serde_json::from_str::<Xuid>("[-2147483649,1]").is_err());
    }

    #[test]
    fn stable_id_prefers_account() {
        let mut p = PlayerEntity {
            userid: 5,
            xuid: Xuid::new(1, 1),
            name: "a".into(),
            fakeplayer: false,
            team: TEAM_A,
            position: [0.0; 3],
        };
        assert_eq!(p.stable_id(), StableId::Account((1u64 << 32) | 1));
        p.xuid = Xuid::default();
        assert_eq!(p.stable_id(), StableId::Session(5));
    }
}
