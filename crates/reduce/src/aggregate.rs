//! Output aggregation: accumulates header, convars and events, then freezes a `MatchRecord`.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use demosum_core::{DemoHeader, DemoQuery, DomainEvent, IdentityRecord, MatchRecord, COMPETITIVE_TEAMS};
use tracing::info;

use crate::ReduceError;

/// Which convar names get recorded. `*` records everything.
#[derive(Debug, Clone)]
pub struct ConvarFilter {
    all: bool,
    names: Vec<String>,
}

impl ConvarFilter {
    pub fn new(names: &[String]) -> Self {
        Self { all: names.iter().any(|n| n == "*"), names: names.to_vec() }
    }

    pub fn tracks(&self, name: &str) -> bool { self.all || self.names.iter().any(|n| n == name) }
}

#[derive(Debug)]
pub struct RecordBuilder {
    header: Option<DemoHeader>,
    convars: BTreeMap<String, String>,
    filter: ConvarFilter,
    events: Vec<DomainEvent>,
}

impl RecordBuilder {
    pub fn new(filter: ConvarFilter) -> Self {
        Self { header: None, convars: BTreeMap::new(), filter, events: Vec::new() }
    }

    pub fn set_header(&mut self, header: DemoHeader) { self.header = Some(header); }
    pub fn has_header(&self) -> bool { self.header.is_some() }

    /// Last value wins.
    pub fn record_convar(&mut self, name: &str, value: &str) -> bool {
        if !self.filter.tracks(name) {
            return false;
        }
        self.convars.insert(name.to_string(), value.to_string());
        true
    }

    pub fn push(&mut self, ev: DomainEvent) { self.events.push(ev); }

    pub fn extend(&mut self, evs: impl IntoIterator<Item = DomainEvent>) { self.events.extend(evs); }

    pub fn events(&self) -> &[DomainEvent] { &self.events }

    /// Read final scores and freeze. Missing team slots score 0.
    pub fn finish(self, identities: Vec<IdentityRecord>, query: &dyn DemoQuery) -> Result<MatchRecord, ReduceError> {
        let header = self.header.ok_or(ReduceError::MissingHeader)?;
        let score = COMPETITIVE_TEAMS.map(|n| query.team(n).map(|t| t.score).unwrap_or(0));
        info!(
            map = %header.mapname,
            identities = identities.len(),
            events = self.events.len(),
            score = ?score,
            "match record finalized"
        );
        Ok(MatchRecord { header, convars: self.convars, identities, events: self.events, score })
    }
}
