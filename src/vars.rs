use std::collections::{BTreeMap, HashMap};

use crate::model::Entry;

/// Insertion-ordered `KEY -> VALUE` map produced by a parse.
///
/// A key that is set again keeps its original position and takes the new
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    entries: Vec<Entry>,
    by_key: HashMap<String, usize>,
}

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_entry(key).map(|entry| entry.value.as_str())
    }

    pub fn get_entry(&self, key: &str) -> Option<&Entry> {
        self.by_key.get(key).map(|&idx| &self.entries[idx])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Insert an entry, returning the value it replaced.
    pub fn insert(&mut self, entry: Entry) -> Option<String> {
        if let Some(existing_idx) = self.by_key.get(&entry.key).copied() {
            let existing = std::mem::replace(&mut self.entries[existing_idx], entry);
            return Some(existing.value);
        }

        self.by_key.insert(entry.key.clone(), self.entries.len());
        self.entries.push(entry);
        None
    }

    /// Pairs in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|entry| (entry.key.as_str(), entry.value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

impl IntoIterator for Vars {
    type Item = (String, String);
    type IntoIter = std::iter::Map<std::vec::IntoIter<Entry>, fn(Entry) -> (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .into_iter()
            .map((|entry: Entry| (entry.key, entry.value)) as fn(Entry) -> (String, String))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Vars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (key, value) in iter {
            vars.insert(Entry {
                key: key.into(),
                value: value.into(),
                line: 0,
            });
        }
        vars
    }
}

impl From<Vars> for BTreeMap<String, String> {
    fn from(vars: Vars) -> Self {
        vars.into_iter().collect()
    }
}

impl From<Vars> for HashMap<String, String> {
    fn from(vars: Vars) -> Self {
        vars.into_iter().collect()
    }
}
