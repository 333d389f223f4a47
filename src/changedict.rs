//! Revision-stamped key/value store.
//!
//! Every write bumps a global counter and stamps the written entry with it,
//! so readers can ask for "everything written after revision R" without
//! copying the whole map. A secondary index ordered by revision keeps that
//! query proportional to the number of changed entries.

use crate::types::{Revision, SimValue};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone)]
struct Entry<V> {
    value: V,
    revision: Revision,
}

/// Insertion-ordered map whose entries remember the revision of their last write.
#[derive(Clone)]
pub struct ChangeDict<V> {
    /// Keys in first-insertion order.
    order: Vec<String>,
    /// Key to position in `order`.
    slots: HashMap<String, usize>,
    entries: Vec<Entry<V>>,
    /// Revision of last write to position in `order`.
    by_revision: BTreeMap<Revision, usize>,
    /// Current global revision counter.
    latest: Revision,
}

/// Values decoded for one data definition.
pub type SimData = ChangeDict<SimValue>;

impl<V> ChangeDict<V> {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            slots: HashMap::new(),
            entries: Vec::new(),
            by_revision: BTreeMap::new(),
            latest: Revision::default(),
        }
    }

    /// Store a value, stamping it with the next revision.
    pub fn set(&mut self, key: impl Into<String>, value: V) -> Revision {
        let revision = self.latest.next();
        self.latest = revision;

        let key = key.into();
        match self.slots.get(&key) {
            Some(&slot) => {
                let entry = &mut self.entries[slot];
                self.by_revision.remove(&entry.revision);
                entry.value = value;
                entry.revision = revision;
                self.by_revision.insert(revision, slot);
            }
            None => {
                let slot = self.order.len();
                self.order.push(key.clone());
                self.slots.insert(key, slot);
                self.entries.push(Entry { value, revision });
                self.by_revision.insert(revision, slot);
            }
        }

        revision
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.slots.get(key).map(|&slot| &self.entries[slot].value)
    }

    /// Revision at which `key` was last written.
    pub fn revision_of(&self, key: &str) -> Option<Revision> {
        self.slots.get(key).map(|&slot| self.entries[slot].revision)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.slots.contains_key(key)
    }

    /// Current value of the global revision counter.
    pub fn latest(&self) -> Revision {
        self.latest
    }

    /// Entries written after `revision`, oldest write first.
    pub fn changed_since(&self, revision: Revision) -> Vec<(&str, &V)> {
        self.by_revision
            .range(revision.next()..)
            .map(|(_, &slot)| (self.order[slot].as_str(), &self.entries[slot].value))
            .collect()
    }

    /// Keys in first-insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Entries in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.order
            .iter()
            .zip(self.entries.iter())
            .map(|(key, entry)| (key.as_str(), &entry.value))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<V: Clone> ChangeDict<V> {
    /// Owned copy of the entries written after `revision`.
    pub fn changed_since_owned(&self, revision: Revision) -> Vec<(String, V)> {
        self.changed_since(revision)
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

impl<V> Default for ChangeDict<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for ChangeDict<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
