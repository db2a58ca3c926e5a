use std::collections::BTreeMap;

use crate::key::Key;
use crate::types::{KeyEvent, ModeLabel, ModeSet};

/// Raw per-mode and per-key counts.
///
/// Every event counts toward its mode. Only events outside the excluded
/// modes count toward their key, except the always-count key which is
/// tallied wherever it is typed.
#[derive(Debug, Clone)]
pub struct FrequencyTally {
    excluded: ModeSet,
    always_count: Option<Key>,
    modes: BTreeMap<ModeLabel, u64>,
    keys: BTreeMap<Key, u64>,
    total: u64,
    counted: u64,
}

impl FrequencyTally {
    pub fn new(excluded: ModeSet, always_count: Option<Key>) -> Self {
        Self {
            excluded,
            always_count,
            modes: BTreeMap::new(),
            keys: BTreeMap::new(),
            total: 0,
            counted: 0,
        }
    }

    pub fn record(&mut self, event: &KeyEvent) {
        *self.modes.entry(event.mode.clone()).or_default() += 1;
        self.total += 1;

        if !self.excluded.has_label(&event.mode) || self.always_count == Some(event.key) {
            *self.keys.entry(event.key).or_default() += 1;
            self.counted += 1;
        }
    }

    pub fn modes(&self) -> &BTreeMap<ModeLabel, u64> {
        &self.modes
    }

    pub fn keys(&self) -> &BTreeMap<Key, u64> {
        &self.keys
    }

    /// Events seen.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Events that reached the key tally.
    pub fn counted(&self) -> u64 {
        self.counted
    }

    pub fn into_parts(self) -> (BTreeMap<ModeLabel, u64>, BTreeMap<Key, u64>, u64, u64) {
        (self.modes, self.keys, self.total, self.counted)
    }
}
