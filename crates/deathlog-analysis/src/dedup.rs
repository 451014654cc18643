//! Deduplication of death records reported by several players.
//!
//! The same death is usually seen by every nearby player running the addon,
//! so a raw record stream repeats events. [`CanonicalDeathSet`] keeps one
//! record per [`DeathKey`].

use std::collections::HashMap;

use crate::record::{DeathKey, DeathRecord};

/// Whether [`CanonicalDeathSet::merge`] added a new event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Replaced,
}

/// Deduplicated death events keyed by [`DeathKey`].
///
/// A record whose key is already present replaces the stored record (last
/// write wins) but keeps the position of the first report, so iteration
/// follows first-seen order.
#[derive(Debug, Clone, Default)]
pub struct CanonicalDeathSet {
    records: Vec<DeathRecord>,
    index: HashMap<DeathKey, usize>,
}

impl CanonicalDeathSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, record: DeathRecord) -> MergeOutcome {
        let key = record.key();
        match self.index.get(&key).copied() {
            Some(slot) => {
                self.records[slot] = record;
                MergeOutcome::Replaced
            }
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
                MergeOutcome::Inserted
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &DeathKey) -> Option<&DeathRecord> {
        self.index.get(key).map(|&slot| &self.records[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeathRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Extend<DeathRecord> for CanonicalDeathSet {
    fn extend<T: IntoIterator<Item = DeathRecord>>(&mut self, iter: T) {
        for record in iter {
            self.merge(record);
        }
    }
}

impl FromIterator<DeathRecord> for CanonicalDeathSet {
    fn from_iter<T: IntoIterator<Item = DeathRecord>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a CanonicalDeathSet {
    type Item = &'a DeathRecord;
    type IntoIter = std::slice::Iter<'a, DeathRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
