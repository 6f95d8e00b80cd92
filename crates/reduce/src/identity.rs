//! Identity registry: first-writer-wins roster built from `userinfo` string-table updates.

#![forbid(unsafe_code)]

use demosum_core::{IdentityRecord, UserId, UserInfo, USERINFO_TABLE};
use rustc_hash::FxHashSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct IdentityRegistry {
    seen: FxHashSet<UserId>,
    records: Vec<IdentityRecord>,
}

impl IdentityRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.records.len() }
    pub fn is_empty(&self) -> bool { self.records.is_empty() }
    pub fn records(&self) -> &[IdentityRecord] { &self.records }
    pub fn into_records(self) -> Vec<IdentityRecord> { self.records }

    /// Returns true when the update created a new record.
    pub fn observe(&mut self, table: &str, user_data: Option<&UserInfo>) -> bool {
        if table != USERINFO_TABLE {
            return false;
        }
        let Some(info) = user_data else { return false };
        if info.fakeplayer {
            return false;
        }
        if !self.seen.insert(info.userid) {
            return false;
        }
        debug!(userid = info.userid, name = %info.name, "identity registered");
        self.records.push(IdentityRecord {
            table: table.to_string(),
            xuid: info.xuid,
            name: info.name.clone(),
            userid: info.userid,
        });
        true
    }
}
